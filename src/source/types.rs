//! Sample and event types shared by the streaming and batch detectors.
//!
//! A `PupilSample` is the only input the detectors consume; a `BlinkEvent`
//! is the only event they produce. Both serialize to the JSON shapes that
//! upstream pipelines and downstream recorders exchange.

use serde::{Deserialize, Serialize};

/// A single pupil-detection confidence sample.
///
/// Timestamps are seconds on the recording's monotonic clock. Confidence is
/// the upstream detector's certainty that a pupil was correctly located; it
/// drops sharply while the eyelid occludes the pupil.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PupilSample {
    /// Capture time in seconds (monotonic, non-decreasing across a stream)
    pub timestamp: f64,
    /// Detection certainty in [0, 1]
    pub confidence: f64,
}

impl PupilSample {
    pub fn new(timestamp: f64, confidence: f64) -> Self {
        Self {
            timestamp,
            confidence,
        }
    }
}

/// Which half of a blink a detection marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlinkPhase {
    /// The eyelid is closing (confidence fell)
    Onset,
    /// The eyelid re-opened (confidence recovered)
    Offset,
}

impl std::fmt::Display for BlinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlinkPhase::Onset => write!(f, "onset"),
            BlinkPhase::Offset => write!(f, "offset"),
        }
    }
}

/// A detected blink onset or offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkEvent {
    /// Onset or offset
    #[serde(rename = "type")]
    pub phase: BlinkPhase,
    /// Classification confidence in [0, 1] (clamped filter response)
    pub confidence: f64,
    /// Timestamp of the detection window's temporal midpoint
    pub timestamp: f64,
    /// Samples the classification was computed from
    pub base_data: Vec<PupilSample>,
    /// Whether downstream recorders should persist this event
    pub record: bool,
}
