//! Streaming runs: snapshots pushed to a consumer while the run steps.
//!
//! The worker thread owns the engine. Snapshots cross a bounded
//! channel: intermediate ticks are dropped when the consumer lags,
//! the final snapshot is always delivered. A consumer that hangs up
//! cancels the run at the next step boundary.

use crate::{
    config::SimConfig,
    engine::SimEngine,
    error::SimResult,
    metrics::SimReport,
    snapshot::StreamMessage,
    types::Minute,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, SyncSender, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Close code for a session ended by a server-side failure.
pub const ABNORMAL_CLOSURE_CODE: u16 = 1011;
/// Close code for a rejected configuration.
pub const INVALID_CONFIG_CODE: u16 = 1007;

/// Shared cancellation flag, checked by the engine between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Delivered,
    Dropped,
    /// The consumer is gone.
    Closed,
}

/// Where a streaming run sends its snapshots.
pub trait SnapshotSink {
    /// Intermediate snapshot. May be dropped if the consumer lags.
    fn offer(&mut self, message: StreamMessage) -> SinkStatus;

    /// Final snapshot. Never dropped; waits for the consumer if needed.
    fn deliver(&mut self, message: StreamMessage) -> SinkStatus;
}

/// Collects everything. Used by tests and the stdout streamer.
impl SnapshotSink for Vec<StreamMessage> {
    fn offer(&mut self, message: StreamMessage) -> SinkStatus {
        self.push(message);
        SinkStatus::Delivered
    }

    fn deliver(&mut self, message: StreamMessage) -> SinkStatus {
        self.push(message);
        SinkStatus::Delivered
    }
}

/// Bounded-channel sink with optional playback pacing.
pub struct ChannelSink {
    sender:     SyncSender<StreamMessage>,
    tick_delay: Duration,
    dropped:    u64,
}

impl ChannelSink {
    pub fn new(sender: SyncSender<StreamMessage>, tick_delay: Duration) -> Self {
        Self { sender, tick_delay, dropped: 0 }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SnapshotSink for ChannelSink {
    fn offer(&mut self, message: StreamMessage) -> SinkStatus {
        if !self.tick_delay.is_zero() {
            thread::sleep(self.tick_delay);
        }
        match self.sender.try_send(message) {
            Ok(()) => SinkStatus::Delivered,
            Err(TrySendError::Full(message)) => {
                self.dropped += 1;
                log::warn!(
                    "minute={} stream: consumer lagging, snapshot dropped ({} so far)",
                    message.sim_time,
                    self.dropped
                );
                SinkStatus::Dropped
            }
            Err(TrySendError::Disconnected(_)) => SinkStatus::Closed,
        }
    }

    fn deliver(&mut self, message: StreamMessage) -> SinkStatus {
        match self.sender.send(message) {
            Ok(()) => SinkStatus::Delivered,
            Err(_) => SinkStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(SimReport),
    /// Stopped before the step covering `minute`.
    Cancelled { minute: Minute },
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Snapshots the channel holds before ticks start being dropped.
    pub buffer:     usize,
    /// Wall-clock pause before each tick is offered.
    pub tick_delay: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer:     16,
            tick_delay: Duration::ZERO,
        }
    }
}

/// A run executing on its own thread.
pub struct StreamHandle {
    pub run_id:   String,
    pub messages: Receiver<StreamMessage>,
    pub cancel:   CancelToken,
    worker:       JoinHandle<SimResult<RunOutcome>>,
}

impl StreamHandle {
    /// Wait for the worker and return how the run ended.
    /// Drain `messages` first: the final snapshot blocks until read.
    pub fn join(self) -> SimResult<RunOutcome> {
        let StreamHandle { run_id, messages, worker, .. } = self;
        let outcome = wait(&run_id, worker);
        drop(messages);
        outcome
    }

    /// Client went away: cancel, hang up and wait for the worker.
    pub fn close(self) -> SimResult<RunOutcome> {
        let StreamHandle { run_id, messages, cancel, worker } = self;
        cancel.cancel();
        drop(messages);
        wait(&run_id, worker)
    }
}

fn wait(run_id: &str, worker: JoinHandle<SimResult<RunOutcome>>) -> SimResult<RunOutcome> {
    worker
        .join()
        .map_err(|_| anyhow::anyhow!("simulation worker for run {run_id} panicked"))?
}

/// Validate `config` and start a streaming run on a new thread.
/// Configuration errors are returned here, before any thread exists.
pub fn spawn_run(config: SimConfig, options: StreamOptions) -> SimResult<StreamHandle> {
    let mut engine = SimEngine::build(config)?;
    let run_id = engine.run_id.clone();
    let (sender, messages) = mpsc::sync_channel(options.buffer.max(1));
    let cancel = CancelToken::new();

    let worker_cancel = cancel.clone();
    let worker = thread::Builder::new()
        .name(format!("run-{run_id}"))
        .spawn(move || {
            let mut sink = ChannelSink::new(sender, options.tick_delay);
            let outcome = engine.run_streaming(&mut sink, &worker_cancel);
            if let Err(e) = &outcome {
                log::error!("run {}: {e}", engine.run_id);
            }
            if sink.dropped() > 0 {
                log::info!("run {}: {} snapshots dropped", engine.run_id, sink.dropped());
            }
            outcome
        })
        .map_err(|e| anyhow::anyhow!("cannot spawn simulation worker: {e}"))?;

    Ok(StreamHandle { run_id, messages, cancel, worker })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn full_channel_drops_ticks_but_not_the_final_message() {
        let (sender, receiver) = mpsc::sync_channel(1);
        let mut sink = ChannelSink::new(sender, Duration::ZERO);
        let tick = |t| StreamMessage::tick(t, 10, SimReport::default());

        assert_eq!(sink.offer(tick(0)), SinkStatus::Delivered);
        assert_eq!(sink.offer(tick(1)), SinkStatus::Dropped);
        assert_eq!(sink.dropped(), 1);

        let reader = thread::spawn(move || receiver.iter().collect::<Vec<_>>());
        assert_eq!(sink.deliver(StreamMessage::done(10, SimReport::default())), SinkStatus::Delivered);
        drop(sink);

        let received = reader.join().unwrap();
        assert_eq!(received.len(), 2);
        assert!(received[1].is_final());
    }

    #[test]
    fn hung_up_consumer_reports_closed() {
        let (sender, receiver) = mpsc::sync_channel(4);
        drop(receiver);
        let mut sink = ChannelSink::new(sender, Duration::ZERO);
        assert_eq!(sink.offer(StreamMessage::tick(0, 10, SimReport::default())), SinkStatus::Closed);
        assert_eq!(sink.deliver(StreamMessage::done(10, SimReport::default())), SinkStatus::Closed);
    }
}
