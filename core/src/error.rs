use crate::types::Minute;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {}", .violations.join("; "))]
    Configuration { violations: Vec<String> },

    #[error("Invariant violated at minute {minute}: {detail}")]
    InvariantViolation { minute: Minute, detail: String },

    #[error("Run already complete at minute {minute}")]
    RunComplete { minute: Minute },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn invariant(minute: Minute, detail: impl Into<String>) -> Self {
        Self::InvariantViolation { minute, detail: detail.into() }
    }

    /// Configuration problems are the caller's fault; everything else is ours.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

pub type SimResult<T> = Result<T, SimError>;
