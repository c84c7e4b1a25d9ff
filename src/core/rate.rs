//! Blink rate and duration bookkeeping.
//!
//! The streaming detector emits raw onset/offset events, usually several per
//! physical blink as the transition slides through its window. This module
//! pairs them into completed blinks and keeps enough recent history to
//! answer "how often" and "how long" questions about them.

use std::collections::VecDeque;

use statrs::statistics::Statistics;

use crate::source::types::{BlinkEvent, BlinkPhase};

/// One paired onset/offset, timestamped at the offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedBlink {
    /// When the eye re-opened (recording clock, seconds)
    pub timestamp: f64,
    /// Seconds between the first onset detection and the first offset
    pub duration: f64,
}

/// Pairs onset/offset events and tracks recent completed blinks.
#[derive(Debug)]
pub struct BlinkRateTracker {
    open_onset: Option<f64>,
    history: VecDeque<CompletedBlink>,
    /// How many seconds of completed blinks to retain
    retention: f64,
}

impl BlinkRateTracker {
    pub fn new(retention_secs: f64) -> Self {
        Self {
            open_onset: None,
            history: VecDeque::new(),
            retention: retention_secs,
        }
    }

    /// Feeds one detector event; returns the blink it completes, if any.
    ///
    /// A burst of onset events for the same physical blink keeps the first
    /// timestamp, so the measured duration starts at the earliest detection.
    /// Offsets without a pending onset are ignored.
    pub fn record(&mut self, event: &BlinkEvent) -> Option<CompletedBlink> {
        match event.phase {
            BlinkPhase::Onset => {
                if self.open_onset.is_none() {
                    self.open_onset = Some(event.timestamp);
                }
                None
            }
            BlinkPhase::Offset => {
                let onset_ts = self.open_onset.take()?;
                let duration = event.timestamp - onset_ts;
                if duration < 0.0 {
                    return None;
                }

                let blink = CompletedBlink {
                    timestamp: event.timestamp,
                    duration,
                };
                self.history.push_back(blink);

                let cutoff = event.timestamp - self.retention;
                while self
                    .history
                    .front()
                    .map_or(false, |b| b.timestamp < cutoff)
                {
                    self.history.pop_front();
                }

                Some(blink)
            }
        }
    }

    /// Completed blinks per minute over the trailing `window_secs`.
    ///
    /// "Now" is the newest completed blink's timestamp; with no blinks the
    /// rate is zero.
    pub fn blinks_per_minute(&self, window_secs: f64) -> f64 {
        if window_secs <= 0.0 {
            return 0.0;
        }
        let newest = match self.history.back() {
            Some(blink) => blink.timestamp,
            None => return 0.0,
        };

        let cutoff = newest - window_secs;
        let count = self
            .history
            .iter()
            .filter(|b| b.timestamp >= cutoff)
            .count();
        count as f64 / (window_secs / 60.0)
    }

    /// Mean duration of retained blinks.
    pub fn mean_duration(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().map(|b| b.duration).mean())
    }

    /// Sample standard deviation of retained blink durations.
    pub fn duration_std_dev(&self) -> Option<f64> {
        if self.history.len() < 2 {
            return None;
        }
        Some(self.history.iter().map(|b| b.duration).std_dev())
    }

    pub fn completed_count(&self) -> usize {
        self.history.len()
    }

    /// Forgets all history and any pending onset.
    pub fn reset(&mut self) {
        self.open_onset = None;
        self.history.clear();
    }
}
