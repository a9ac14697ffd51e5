//! Per-channel atomic counters.
//!
//! Counters are incremented silently at the call site. Call
//! [`ChannelStats::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a run disconnects).

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters, shared between a channel and its I/O tasks.
#[derive(Debug, Default)]
pub struct ChannelStats {
    calls_sent: AtomicU64,
    responses_matched: AtomicU64,
    timeouts: AtomicU64,
    unmatched_responses: AtomicU64,
    malformed_frames: AtomicU64,
}

impl ChannelStats {
    pub const fn new() -> Self {
        Self {
            calls_sent: AtomicU64::new(0),
            responses_matched: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            unmatched_responses: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
        }
    }

    pub fn inc_calls_sent(&self) {
        self.calls_sent.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "calls_sent", "counter incremented");
    }

    pub fn inc_responses_matched(&self) {
        self.responses_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "timeouts", "counter incremented");
    }

    pub fn inc_unmatched_responses(&self) {
        self.unmatched_responses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "unmatched_responses", "counter incremented");
    }

    pub fn inc_malformed_frames(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "malformed_frames", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "channel.flush",
            calls_sent = self.calls_sent(),
            responses_matched = self.responses_matched(),
            timeouts = self.timeouts(),
            unmatched_responses = self.unmatched_responses(),
            malformed_frames = self.malformed_frames(),
        );
    }

    pub fn calls_sent(&self) -> u64 {
        self.calls_sent.load(Ordering::Relaxed)
    }

    pub fn responses_matched(&self) -> u64 {
        self.responses_matched.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn unmatched_responses(&self) -> u64 {
        self.unmatched_responses.load(Ordering::Relaxed)
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_independently() {
        let s = ChannelStats::new();
        s.inc_calls_sent();
        s.inc_calls_sent();
        s.inc_timeouts();
        s.inc_unmatched_responses();
        s.inc_malformed_frames();
        s.inc_malformed_frames();
        s.inc_malformed_frames();

        assert_eq!(s.calls_sent(), 2);
        assert_eq!(s.responses_matched(), 0);
        assert_eq!(s.timeouts(), 1);
        assert_eq!(s.unmatched_responses(), 1);
        assert_eq!(s.malformed_frames(), 3);
    }
}
