//! Whole-recording blink classification.
//!
//! Unlike the streaming detector, which sizes its kernel from whatever the
//! sliding window currently holds, the batch path derives one kernel from
//! the recording's mean sample rate and convolves it across the entire
//! confidence trace in a single pass. The result is a per-sample response
//! curve hosts can plot, threshold, or turn back into discrete events.

use serde::{Deserialize, Serialize};

use crate::core::filter::{blink_kernel, convolve_same, RESPONSE_SCALE};
use crate::source::types::{BlinkEvent, BlinkPhase, PupilSample};

/// Errors from whole-recording recalculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecalcError {
    /// Fewer than two samples, or zero time span between first and last
    InsufficientData { sample_count: usize },
    /// The derived kernel length rounds to 0 or 1, so the filter is undefined
    DegenerateWindow { filter_size: usize },
}

impl std::fmt::Display for RecalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecalcError::InsufficientData { sample_count } => {
                write!(
                    f,
                    "need at least two samples spanning a nonzero duration (got {})",
                    sample_count
                )
            }
            RecalcError::DegenerateWindow { filter_size } => {
                write!(
                    f,
                    "derived filter size {} is too small; raise history_length or the sample rate",
                    filter_size
                )
            }
        }
    }
}

impl std::error::Error for RecalcError {}

/// Per-sample filter output over a whole recording.
///
/// All vectors have equal length, one entry per input sample. The curve is
/// immutable once produced and replaced wholesale on the next recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCurve {
    /// Input sample timestamps, in order
    pub timestamps: Vec<f64>,
    /// Scaled matched-filter response per sample
    pub filter_response: Vec<f64>,
    /// `+1` above the threshold, `-1` below its negation, `0` elsewhere.
    /// Indices where the kernel only partially overlaps the recording are
    /// always `0`: there the response measures the implicit zero padding,
    /// not the signal.
    pub classification: Vec<i8>,
    /// Kernel length derived from the mean sample rate
    pub filter_size: usize,
    pub onset_threshold: f64,
    pub offset_threshold: f64,
    /// Monotonic counter distinguishing successive recalculations
    pub generation: u64,
}

impl ResponseCurve {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Derives discrete blink events from the classification runs.
    ///
    /// Convolution flips the kernel, so a confidence drop classifies as `-1`
    /// and a recovery as `+1`; runs map to onset and offset accordingly.
    /// Each run contributes one event at its peak-response sample.
    pub fn events(&self) -> Vec<BlinkEvent> {
        let mut events = Vec::new();
        let len = self.classification.len();

        let mut run_start = 0;
        while run_start < len {
            let label = self.classification[run_start];
            let mut run_end = run_start + 1;
            while run_end < len && self.classification[run_end] == label {
                run_end += 1;
            }

            if label != 0 {
                let peak = (run_start..run_end)
                    .max_by(|&a, &b| {
                        self.filter_response[a]
                            .abs()
                            .total_cmp(&self.filter_response[b].abs())
                    })
                    .unwrap_or(run_start);

                let phase = if label < 0 {
                    BlinkPhase::Onset
                } else {
                    BlinkPhase::Offset
                };
                events.push(BlinkEvent {
                    phase,
                    confidence: self.filter_response[peak].abs().min(1.0),
                    timestamp: self.timestamps[peak],
                    base_data: Vec::new(),
                    record: true,
                });
            }

            run_start = run_end;
        }

        events
    }
}

/// Recomputes the response curve for a full recording on demand.
#[derive(Debug, Default)]
pub struct BatchBlinkRecalculator {
    latest: Option<ResponseCurve>,
    generation: u64,
}

impl BatchBlinkRecalculator {
    pub fn new() -> Self {
        Self {
            latest: None,
            generation: 0,
        }
    }

    /// Replaces the stored curve with one computed from `all_samples`.
    ///
    /// The kernel length is `round(sample_count * history_length / total_time)`,
    /// the sample count expected inside one `history_length` window at the
    /// recording's mean rate. Fails before touching any state, so the
    /// previous curve survives every error. Deterministic for identical
    /// inputs apart from the generation counter.
    pub fn recalculate(
        &mut self,
        all_samples: &[PupilSample],
        history_length: f64,
        onset_threshold: f64,
        offset_threshold: f64,
    ) -> Result<&ResponseCurve, RecalcError> {
        let sample_count = all_samples.len();
        if sample_count < 2 {
            return Err(RecalcError::InsufficientData { sample_count });
        }

        let total_time =
            all_samples[sample_count - 1].timestamp - all_samples[0].timestamp;
        if total_time <= 0.0 {
            return Err(RecalcError::InsufficientData { sample_count });
        }

        let filter_size =
            (sample_count as f64 * history_length / total_time).round() as usize;
        if filter_size <= 1 {
            return Err(RecalcError::DegenerateWindow { filter_size });
        }

        let kernel = blink_kernel(filter_size);
        let activity: Vec<f64> = all_samples.iter().map(|s| s.confidence).collect();
        let filter_response: Vec<f64> = convolve_same(&activity, &kernel)
            .into_iter()
            .map(|raw| raw / RESPONSE_SCALE)
            .collect();

        // The first index whose centered kernel lies fully inside the data,
        // and the last. Outside that range the convolution ran off the array
        // and the response reflects the missing half of the kernel.
        let start = (filter_size - 1) / 2;
        let full_overlap_from = filter_size - 1 - start;
        let full_overlap_to = sample_count.saturating_sub(1 + start);

        // Both bounds use the onset threshold; the offset threshold rides
        // along in the curve for hosts that re-derive events themselves.
        let classification: Vec<i8> = filter_response
            .iter()
            .enumerate()
            .map(|(i, &response)| {
                if i < full_overlap_from || i > full_overlap_to {
                    0
                } else if response > onset_threshold {
                    1
                } else if response < -onset_threshold {
                    -1
                } else {
                    0
                }
            })
            .collect();

        self.generation += 1;
        let curve = ResponseCurve {
            timestamps: all_samples.iter().map(|s| s.timestamp).collect(),
            filter_response,
            classification,
            filter_size,
            onset_threshold,
            offset_threshold,
            generation: self.generation,
        };

        Ok(&*self.latest.insert(curve))
    }

    /// The curve from the most recent successful recalculation.
    pub fn latest(&self) -> Option<&ResponseCurve> {
        self.latest.as_ref()
    }

    /// Drops the stored curve without resetting the generation counter.
    pub fn clear(&mut self) {
        self.latest = None;
    }
}
