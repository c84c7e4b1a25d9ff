//! Online blink detection over a sliding window of recent samples.

use std::collections::VecDeque;

use crate::core::filter::matched_filter;
use crate::source::types::{BlinkEvent, BlinkPhase, PupilSample};

/// Detects blink onsets and offsets as samples arrive.
///
/// Keeps a time-bounded window of the most recent samples and correlates
/// their confidences against the step kernel after each ingest. The caller
/// must feed samples with non-decreasing timestamps; the detector owns the
/// window exclusively and is not internally synchronized.
#[derive(Debug)]
pub struct StreamingBlinkDetector {
    history: VecDeque<PupilSample>,
    /// Window horizon in seconds
    history_length: f64,
    onset_confidence_threshold: f64,
    offset_confidence_threshold: f64,
    last_event: Option<BlinkEvent>,
}

impl StreamingBlinkDetector {
    pub fn new(
        history_length: f64,
        onset_confidence_threshold: f64,
        offset_confidence_threshold: f64,
    ) -> Self {
        Self {
            history: VecDeque::new(),
            history_length,
            onset_confidence_threshold,
            offset_confidence_threshold,
            last_event: None,
        }
    }

    /// Appends `new_samples` to the window and classifies it once.
    ///
    /// Returns at most one event per call: the response is computed over the
    /// whole post-trim window, not once per appended sample, so callers that
    /// batch many samples into a single call trade temporal resolution for
    /// throughput.
    ///
    /// Until the window spans `history_length` seconds (and holds at least
    /// two samples) this returns `None`; that is the expected warm-up state,
    /// not an error.
    pub fn ingest(&mut self, new_samples: &[PupilSample]) -> Option<BlinkEvent> {
        for sample in new_samples {
            debug_assert!(
                self.history
                    .back()
                    .map_or(true, |prev| sample.timestamp >= prev.timestamp),
                "sample timestamps must be non-decreasing"
            );
            debug_assert!(
                (0.0..=1.0).contains(&sample.confidence),
                "confidence must be within [0, 1]"
            );
            self.history.push_back(*sample);
        }

        self.trim();

        if self.history.len() < 2 {
            return None;
        }

        let oldest = self.history.front()?.timestamp;
        let newest = self.history.back()?.timestamp;
        if newest - oldest < self.history_length {
            return None;
        }

        let activity: Vec<f64> = self.history.iter().map(|s| s.confidence).collect();
        let response = matched_filter(&activity);

        let phase = if response > self.onset_confidence_threshold {
            BlinkPhase::Onset
        } else if response < -self.offset_confidence_threshold {
            BlinkPhase::Offset
        } else {
            return None;
        };

        let confidence = response.abs().min(1.0);
        tracing::debug!("blink {} detected with confidence {:.3}", phase, confidence);

        let event = BlinkEvent {
            phase,
            confidence,
            // Midpoint of the window, where the kernel's sign flips.
            timestamp: self.history[self.history.len() / 2].timestamp,
            base_data: self.history.iter().copied().collect(),
            record: true,
        };
        self.last_event = Some(event.clone());
        Some(event)
    }

    /// Drops samples older than the window horizon.
    ///
    /// Checks the second-oldest sample rather than the oldest, so one sample
    /// older than the horizon is always retained and the window never empties
    /// here. Skipped entirely when fewer than two samples are buffered.
    fn trim(&mut self) {
        let newest = match self.history.back() {
            Some(sample) => sample.timestamp,
            None => return,
        };
        let age_threshold = newest - self.history_length;

        while self.history.len() >= 2 && self.history[1].timestamp < age_threshold {
            self.history.pop_front();
        }
    }

    /// The most recent event emitted, if any.
    pub fn recent_event(&self) -> Option<&BlinkEvent> {
        self.last_event.as_ref()
    }

    /// Timestamp of the newest buffered sample.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.history.back().map(|s| s.timestamp)
    }

    /// Number of samples currently buffered.
    pub fn window_len(&self) -> usize {
        self.history.len()
    }

    /// Clears the window and the remembered event.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_event = None;
    }
}
