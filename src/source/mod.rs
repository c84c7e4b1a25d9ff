//! Sample sources and shared data types.
//!
//! The detectors in `core` are source-agnostic; this module provides the
//! types they exchange plus a file-backed replay source for recorded traces.

pub mod replay;
pub mod types;

// Re-export commonly used types
pub use replay::{Recording, RecordingStats, SourceError, Speed};
pub use types::{BlinkEvent, BlinkPhase, PupilSample};
