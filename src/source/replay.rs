//! Recording replay source.
//!
//! Loads a recorded pupil-confidence trace from disk, validates it, and
//! replays it over a channel either paced against the recorded timestamps
//! or as fast as the consumer can drain it.

use std::path::Path;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::types::PupilSample;

/// Errors that occur while loading or validating a recording.
#[derive(Debug)]
pub enum SourceError {
    /// File could not be read
    Io(String),
    /// File contents were not a valid sample array
    Parse(String),
    /// Recording contains no samples
    Empty,
    /// Timestamp at `index` is earlier than its predecessor
    OutOfOrder { index: usize },
    /// Confidence at `index` is outside [0, 1]
    ConfidenceRange { index: usize, value: f64 },
    /// Timestamp or confidence at `index` is NaN or infinite
    NonFinite { index: usize },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "IO error: {}", e),
            SourceError::Parse(e) => write!(f, "Parse error: {}", e),
            SourceError::Empty => write!(f, "Recording contains no samples"),
            SourceError::OutOfOrder { index } => {
                write!(f, "Sample {} is out of timestamp order", index)
            }
            SourceError::ConfidenceRange { index, value } => {
                write!(
                    f,
                    "Sample {} has confidence {} outside [0, 1]",
                    index, value
                )
            }
            SourceError::NonFinite { index } => {
                write!(f, "Sample {} has a non-finite timestamp or confidence", index)
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// How fast `Recording::stream` releases samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Speed {
    /// Sleep the recorded inter-sample gap divided by the multiplier
    /// (1.0 replays in real time, 2.0 at double speed)
    Paced(f64),
    /// No sleeping, deliver as fast as the channel allows
    Burst,
}

/// Summary statistics for a loaded recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStats {
    pub sample_count: usize,
    pub duration_secs: f64,
    pub mean_rate_hz: f64,
    pub mean_interval_secs: f64,
    /// Sample standard deviation of inter-sample gaps (capture jitter)
    pub interval_std_dev_secs: f64,
}

/// A validated, timestamp-ordered pupil-confidence trace.
#[derive(Debug, Clone)]
pub struct Recording {
    samples: Vec<PupilSample>,
}

impl Recording {
    /// Validates and wraps a sample vector.
    pub fn from_samples(samples: Vec<PupilSample>) -> Result<Self, SourceError> {
        if samples.is_empty() {
            return Err(SourceError::Empty);
        }

        for (index, sample) in samples.iter().enumerate() {
            if !sample.timestamp.is_finite() || !sample.confidence.is_finite() {
                return Err(SourceError::NonFinite { index });
            }
            if !(0.0..=1.0).contains(&sample.confidence) {
                return Err(SourceError::ConfidenceRange {
                    index,
                    value: sample.confidence,
                });
            }
            if index > 0 && sample.timestamp < samples[index - 1].timestamp {
                return Err(SourceError::OutOfOrder { index });
            }
        }

        Ok(Self { samples })
    }

    /// Loads a recording from a JSON file containing an array of samples.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| SourceError::Io(e.to_string()))?;
        let samples: Vec<PupilSample> =
            serde_json::from_str(&contents).map_err(|e| SourceError::Parse(e.to_string()))?;
        Self::from_samples(samples)
    }

    /// Generates a constant-rate trace with one confidence dip.
    ///
    /// Confidence is 1.0 everywhere except `[dip_start, dip_end)` seconds,
    /// where it is `low_confidence`. Useful for demos and detector tests.
    pub fn synthetic_blink(
        rate_hz: f64,
        duration_secs: f64,
        dip_start: f64,
        dip_end: f64,
        low_confidence: f64,
    ) -> Self {
        let count = (rate_hz * duration_secs).round() as usize;
        let samples = (0..count)
            .map(|i| {
                let timestamp = i as f64 / rate_hz;
                let confidence = if timestamp >= dip_start && timestamp < dip_end {
                    low_confidence
                } else {
                    1.0
                };
                PupilSample::new(timestamp, confidence)
            })
            .collect();
        // Construction keeps the ordering and range invariants by itself.
        Self { samples }
    }

    pub fn samples(&self) -> &[PupilSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Seconds between first and last sample.
    pub fn duration(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Computes rate and jitter statistics over the recorded timestamps.
    pub fn stats(&self) -> RecordingStats {
        if self.samples.len() < 2 {
            return RecordingStats {
                sample_count: self.samples.len(),
                duration_secs: 0.0,
                mean_rate_hz: 0.0,
                mean_interval_secs: 0.0,
                interval_std_dev_secs: 0.0,
            };
        }

        let intervals: Vec<f64> = self
            .samples
            .windows(2)
            .map(|pair| pair[1].timestamp - pair[0].timestamp)
            .collect();

        let mean_interval = intervals.iter().mean();
        let std_dev = if intervals.len() < 2 {
            0.0
        } else {
            intervals.iter().std_dev()
        };
        let duration = self.duration();

        RecordingStats {
            sample_count: self.samples.len(),
            duration_secs: duration,
            mean_rate_hz: if duration > 0.0 {
                (self.samples.len() - 1) as f64 / duration
            } else {
                0.0
            },
            mean_interval_secs: mean_interval,
            interval_std_dev_secs: std_dev,
        }
    }

    /// Replays the recording on a background thread.
    ///
    /// Returns the receiving end of a bounded channel; the feeder thread
    /// exits when all samples are delivered or the receiver is dropped.
    pub fn stream(self, speed: Speed) -> Receiver<PupilSample> {
        let (tx, rx) = bounded(10_000);

        std::thread::spawn(move || {
            let mut previous: Option<f64> = None;
            for sample in self.samples {
                if let (Speed::Paced(multiplier), Some(prev)) = (speed, previous) {
                    let gap = sample.timestamp - prev;
                    if multiplier.is_finite() && multiplier > 0.0 && gap > 0.0 {
                        std::thread::sleep(Duration::from_secs_f64(gap / multiplier));
                    }
                }
                previous = Some(sample.timestamp);
                if tx.send(sample).is_err() {
                    break;
                }
            }
        });

        rx
    }
}
