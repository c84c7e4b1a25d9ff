//! Nictate - blink detection from pupil-confidence streams.
//!
//! This library classifies blink onsets and offsets from the per-sample
//! confidence values a pupil tracker emits: confidence collapses while the
//! eyelid occludes the pupil, and a matched step filter turns each edge of
//! that collapse into a signed, thresholdable response.
//!
//! Two engines share the same filter math:
//!
//! - **Streaming**: classifies a sliding window as samples arrive, for live
//!   pipelines.
//! - **Batch**: reprocesses a whole recording at once, producing a
//!   per-sample response curve for plotting and post-hoc analysis.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Nictate                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌─────────────┐   ┌──────────────────┐      │
//! │  │  Source  │──▶│  Streaming  │──▶│   BlinkEvents    │      │
//! │  │ (replay) │   │  Detector   │   │  + RateTracker   │      │
//! │  └──────────┘   └─────────────┘   └──────────────────┘      │
//! │       │                                                      │
//! │       ▼              debounced                               │
//! │  ┌─────────────┐   ┌─────────────────┐                      │
//! │  │    Batch    │◀──│ RecalcScheduler │                      │
//! │  │Recalculator │   └─────────────────┘                      │
//! │  └─────────────┘                                            │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  ResponseCurve (response + classification per sample)        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use nictate::core::StreamingBlinkDetector;
//! use nictate::source::PupilSample;
//!
//! let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);
//!
//! let mut events = Vec::new();
//! for i in 0..100 {
//!     let t = i as f64 / 100.0;
//!     let confidence = if (0.3..0.7).contains(&t) { 0.1 } else { 1.0 };
//!     if let Some(event) = detector.ingest(&[PupilSample::new(t, confidence)]) {
//!         events.push(event);
//!     }
//! }
//!
//! assert!(!events.is_empty());
//! ```

pub mod config;
pub mod core;
pub mod recalc;
pub mod session;
pub mod source;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{ConfigError, DetectorConfig};
pub use crate::core::{
    BatchBlinkRecalculator, BlinkRateTracker, RecalcError, ResponseCurve, StreamingBlinkDetector,
};
pub use recalc::{RecalcOutcome, RecalcRequest, RecalcScheduler};
pub use session::{create_shared_log, SessionLog, SessionStats, SharedSessionLog};
pub use source::{BlinkEvent, BlinkPhase, PupilSample, Recording, SourceError, Speed};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_semver_shaped() {
        assert!(VERSION.split('.').count() >= 2);
    }

    #[test]
    fn test_root_reexports_compose() {
        let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);
        assert!(detector.ingest(&[PupilSample::new(0.0, 1.0)]).is_none());
    }
}
