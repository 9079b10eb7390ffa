//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the single master seed of the run. An unseeded run draws
//! its master seed from OS entropy once, at engine construction.
//!
//! Each subsystem gets a fresh RNG stream per minute, seeded from
//! (master_seed, slot, minute). This means:
//!   - Adding a new subsystem never changes existing subsystems' streams.
//!   - A subsystem drawing more this minute never shifts next minute's draws.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crate::types::Minute;

/// Knuth's sampler loses precision once exp(-lambda) gets tiny,
/// so large means are drawn as a sum of smaller Poisson variates.
const POISSON_CHUNK: f64 = 30.0;

/// A named, deterministic RNG for a single subsystem.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create a subsystem RNG from the master seed and a stable
    /// subsystem index. The index must never change once assigned.
    pub fn new(master_seed: u64, subsystem_index: u64) -> Self {
        let derived_seed = master_seed ^ (subsystem_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Uniform float in [low, high).
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// Poisson-distributed count with mean `lambda`.
    pub fn poisson(&mut self, lambda: f64) -> u64 {
        if !(lambda > 0.0) {
            return 0;
        }
        let mut remaining = lambda;
        let mut total = 0;
        while remaining > 0.0 {
            let chunk = remaining.min(POISSON_CHUNK);
            remaining -= chunk;
            let limit = (-chunk).exp();
            let mut product = self.next_f64();
            while product > limit {
                total += 1;
                product *= self.next_f64();
            }
        }
        total
    }
}

/// All subsystem RNGs for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream a subsystem uses while processing `minute`.
    pub fn for_subsystem_at_tick(&self, slot: SubsystemSlot, minute: Minute) -> SubsystemRng {
        let minute_salt = (minute + 1).wrapping_mul(0xd1b5_4a32_d192_ed03);
        SubsystemRng::new(self.master_seed ^ minute_salt, slot as u64).with_name(slot.name())
    }
}

/// Stable subsystem slot assignments.
/// NEVER reorder or remove entries: only append.
/// Reordering changes every subsystem's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Runway = 0,
    InboundTraffic = 1,
    OutboundTraffic = 2,
    Queue = 3,
    Assignment = 4,
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Runway => "runway",
            Self::InboundTraffic => "inbound_traffic",
            Self::OutboundTraffic => "outbound_traffic",
            Self::Queue => "queue",
            Self::Assignment => "assignment",
        }
    }
}
