//! Session accounting for a running detector.
//!
//! Counts what flowed through the pipeline since startup so operators can
//! see what a long-running session actually did. Counters are atomic; the
//! log is shared freely across threads behind an `Arc`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::source::types::BlinkPhase;

/// Counters for one detector session.
#[derive(Debug)]
pub struct SessionLog {
    samples_ingested: AtomicU64,
    onsets_detected: AtomicU64,
    offsets_detected: AtomicU64,
    recalculations: AtomicU64,
    session_start: DateTime<Utc>,
    instance_id: Uuid,
}

/// Point-in-time snapshot of the session counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub samples_ingested: u64,
    pub onsets_detected: u64,
    pub offsets_detected: u64,
    pub recalculations: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: i64,
    pub instance_id: String,
}

impl SessionLog {
    pub fn new() -> Self {
        Self {
            samples_ingested: AtomicU64::new(0),
            onsets_detected: AtomicU64::new(0),
            offsets_detected: AtomicU64::new(0),
            recalculations: AtomicU64::new(0),
            session_start: Utc::now(),
            instance_id: Uuid::new_v4(),
        }
    }

    /// Stable identifier for this process's session.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn record_samples(&self, count: u64) {
        self.samples_ingested.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_event(&self, phase: BlinkPhase) {
        match phase {
            BlinkPhase::Onset => self.onsets_detected.fetch_add(1, Ordering::Relaxed),
            BlinkPhase::Offset => self.offsets_detected.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_recalculation(&self) {
        self.recalculations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.session_start);
        SessionStats {
            samples_ingested: self.samples_ingested.load(Ordering::Relaxed),
            onsets_detected: self.onsets_detected.load(Ordering::Relaxed),
            offsets_detected: self.offsets_detected.load(Ordering::Relaxed),
            recalculations: self.recalculations.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: duration.num_seconds(),
            instance_id: self.instance_id.to_string(),
        }
    }

    /// Human-readable session summary for CLI output.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Samples ingested: {}\n\
             - Blink onsets detected: {}\n\
             - Blink offsets detected: {}\n\
             - Recalculations run: {}\n\
             - Session duration: {} seconds",
            stats.samples_ingested,
            stats.onsets_detected,
            stats.offsets_detected,
            stats.recalculations,
            stats.session_duration_secs
        )
    }

    /// Zeroes the counters; the start time and instance id are kept.
    pub fn reset(&self) {
        self.samples_ingested.store(0, Ordering::Relaxed);
        self.onsets_detected.store(0, Ordering::Relaxed);
        self.offsets_detected.store(0, Ordering::Relaxed);
        self.recalculations.store(0, Ordering::Relaxed);
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared session log handle.
pub type SharedSessionLog = Arc<SessionLog>;

/// Creates a session log ready to share across threads.
pub fn create_shared_log() -> SharedSessionLog {
    Arc::new(SessionLog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let log = SessionLog::new();
        log.record_samples(100);
        log.record_samples(50);
        log.record_event(BlinkPhase::Onset);
        log.record_event(BlinkPhase::Offset);
        log.record_event(BlinkPhase::Offset);
        log.record_recalculation();

        let stats = log.stats();
        assert_eq!(stats.samples_ingested, 150);
        assert_eq!(stats.onsets_detected, 1);
        assert_eq!(stats.offsets_detected, 2);
        assert_eq!(stats.recalculations, 1);
        assert!(stats.session_duration_secs >= 0);
    }

    #[test]
    fn test_reset_keeps_identity() {
        let log = SessionLog::new();
        let id = log.instance_id();
        log.record_samples(10);
        log.reset();

        let stats = log.stats();
        assert_eq!(stats.samples_ingested, 0);
        assert_eq!(stats.instance_id, id.to_string());
    }

    #[test]
    fn test_summary_mentions_counts() {
        let log = SessionLog::new();
        log.record_samples(42);
        let summary = log.summary();
        assert!(summary.contains("Session Statistics"));
        assert!(summary.contains("Samples ingested: 42"));
    }

    #[test]
    fn test_shared_across_threads() {
        let log = create_shared_log();
        let mut handles = Vec::new();
        for _ in 0..4 {
            let log = Arc::clone(&log);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    log.record_samples(1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.stats().samples_ingested, 4000);
    }
}
