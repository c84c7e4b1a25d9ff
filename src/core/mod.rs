//! Blink detection engines.
//!
//! This module contains:
//! - The shared matched-filter math both detectors build on
//! - Streaming classification over a live sliding window
//! - Batch reclassification of whole recordings
//! - Rate and duration aggregation over emitted events

pub mod batch;
pub mod filter;
pub mod rate;
pub mod streaming;

// Re-export commonly used types
pub use batch::{BatchBlinkRecalculator, RecalcError, ResponseCurve};
pub use filter::{blink_kernel, convolve_same, matched_filter, RESPONSE_SCALE};
pub use rate::{BlinkRateTracker, CompletedBlink};
pub use streaming::StreamingBlinkDetector;
