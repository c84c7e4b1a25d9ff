//! End-to-end detection tests over the public API.
//!
//! Each scenario builds a synthetic pupil-confidence trace and checks that
//! the streaming and batch paths agree on where the blink edges are.

use nictate::core::{BatchBlinkRecalculator, BlinkRateTracker, RecalcError, StreamingBlinkDetector};
use nictate::recalc::{RecalcRequest, RecalcScheduler};
use nictate::source::{BlinkPhase, PupilSample, Recording, Speed};
use std::time::Duration;

/// One second of 100 Hz confidence with a blink dip on [0.3, 0.7).
fn blink_trace() -> Vec<PupilSample> {
    Recording::synthetic_blink(100.0, 1.0, 0.3, 0.7, 0.1)
        .samples()
        .to_vec()
}

/// A flat trace with no blink in it.
fn steady_trace(rate_hz: f64, duration_secs: f64, confidence: f64) -> Vec<PupilSample> {
    let count = (rate_hz * duration_secs).round() as usize;
    (0..count)
        .map(|i| PupilSample::new(i as f64 / rate_hz, confidence))
        .collect()
}

// ============================================================================
// STREAMING DETECTION TESTS
// ============================================================================

#[test]
fn test_streaming_detects_onset_then_offset() {
    let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);

    let mut events = Vec::new();
    for sample in blink_trace() {
        if let Some(event) = detector.ingest(&[sample]) {
            events.push(event);
        }
    }

    let first = events.first().expect("the dip should produce events");
    assert_eq!(first.phase, BlinkPhase::Onset);
    assert!(first.confidence > 0.5 && first.confidence <= 1.0);
    assert!((first.timestamp - 0.3).abs() < 0.08);
    assert!(!first.base_data.is_empty());

    let offset = events
        .iter()
        .find(|e| e.phase == BlinkPhase::Offset)
        .expect("the recovery should produce an offset");
    assert!((offset.timestamp - 0.7).abs() < 0.08);

    // The closing edge is fully reported before the opening edge starts.
    let last_onset = events
        .iter()
        .rposition(|e| e.phase == BlinkPhase::Onset)
        .unwrap();
    let first_offset = events
        .iter()
        .position(|e| e.phase == BlinkPhase::Offset)
        .unwrap();
    assert!(last_onset < first_offset);
}

#[test]
fn test_streaming_stays_silent_on_flat_confidence() {
    let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);

    for sample in steady_trace(50.0, 2.0, 0.9) {
        assert!(detector.ingest(&[sample]).is_none());
    }
}

#[test]
fn test_streaming_first_event_waits_for_full_window() {
    let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);

    // Low confidence for the first 50 ms, then a sharp recovery. The rise
    // is inside the warm-up, so nothing may fire until the window spans
    // the whole history length.
    let samples: Vec<PupilSample> = (0..=20)
        .map(|i| {
            let t = i as f64 / 100.0;
            let c = if t < 0.05 { 0.1 } else { 1.0 };
            PupilSample::new(t, c)
        })
        .collect();

    for sample in &samples[..20] {
        assert!(detector.ingest(std::slice::from_ref(sample)).is_none());
    }

    let event = detector
        .ingest(&samples[20..])
        .expect("a spanning window should report the recovery");
    assert_eq!(event.phase, BlinkPhase::Offset);
    assert!((event.timestamp - 0.10).abs() < 1e-9);
}

// ============================================================================
// BATCH RECALCULATION TESTS
// ============================================================================

#[test]
fn test_batch_classifies_blink_edges() {
    let mut recalculator = BatchBlinkRecalculator::new();
    let curve = recalculator
        .recalculate(&blink_trace(), 0.2, 0.5, 0.5)
        .expect("canonical trace should recalculate");

    assert_eq!(curve.filter_size, 20);
    assert_eq!(curve.len(), 100);

    // Falling edge labels around the dip start, rising edge around the end.
    assert!(curve.classification[28..=32].iter().all(|&c| c == -1));
    assert!(curve.classification[68..=72].iter().all(|&c| c == 1));

    // Flat stretches stay unlabeled.
    assert!(curve.classification[11..=24].iter().all(|&c| c == 0));
    assert!(curve.classification[36..=64].iter().all(|&c| c == 0));
    assert!(curve.classification[76..=90].iter().all(|&c| c == 0));

    // Response peaks sit on the edges themselves.
    assert!((curve.filter_response[30] + 1.0).abs() < 1e-9);
    assert!((curve.filter_response[70] - 1.0).abs() < 1e-9);

    let events = curve.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].phase, BlinkPhase::Onset);
    assert!((events[0].timestamp - 0.30).abs() < 1e-9);
    assert!(events[0].confidence > 0.9);
    assert_eq!(events[1].phase, BlinkPhase::Offset);
    assert!((events[1].timestamp - 0.70).abs() < 1e-9);
}

#[test]
fn test_batch_never_classifies_partial_overlap_zones() {
    let mut recalculator = BatchBlinkRecalculator::new();
    let curve = recalculator
        .recalculate(&blink_trace(), 0.2, 0.5, 0.5)
        .expect("canonical trace should recalculate");

    // Zero padding leaves large responses at the array ends. They stay in
    // the curve for plotting, but must never be labeled as blink edges.
    assert!(curve.filter_response[0] > 0.5);
    assert!(curve.filter_response[99] < -0.5);
    assert!(curve.classification[..10].iter().all(|&c| c == 0));
    assert!(curve.classification[91..].iter().all(|&c| c == 0));
}

#[test]
fn test_batch_flat_confidence_yields_no_labels() {
    let mut recalculator = BatchBlinkRecalculator::new();
    let curve = recalculator
        .recalculate(&steady_trace(50.0, 2.0, 0.9), 0.2, 0.5, 0.5)
        .expect("flat trace should recalculate");

    assert_eq!(curve.filter_size, 10);
    assert!(curve.classification.iter().all(|&c| c == 0));
    assert!(curve.events().is_empty());
    // Interior responses cancel exactly on a constant signal.
    assert!(curve.filter_response[5..=95].iter().all(|r| r.abs() < 1e-9));
}

#[test]
fn test_batch_recalculation_is_deterministic() {
    let samples = blink_trace();
    let mut recalculator = BatchBlinkRecalculator::new();

    let first = recalculator
        .recalculate(&samples, 0.2, 0.5, 0.5)
        .expect("recalculate")
        .clone();
    let second = recalculator
        .recalculate(&samples, 0.2, 0.5, 0.5)
        .expect("recalculate")
        .clone();

    assert_eq!(first.filter_response, second.filter_response);
    assert_eq!(first.classification, second.classification);
    assert_eq!(first.timestamps, second.timestamps);
    assert_eq!(second.generation, first.generation + 1);
}

// ============================================================================
// WINDOW SIZING TESTS
// ============================================================================

#[test]
fn test_short_history_on_slow_stream_still_works() {
    // 30 Hz at the minimum history length gives a 3-sample kernel.
    let mut recalculator = BatchBlinkRecalculator::new();
    let curve = recalculator
        .recalculate(&steady_trace(30.0, 1.0, 0.9), 0.1, 0.5, 0.5)
        .expect("3-sample kernel is valid");
    assert_eq!(curve.filter_size, 3);
}

#[test]
fn test_long_history_on_fast_stream_still_works() {
    // 200 Hz at the maximum history length gives a 101-sample kernel.
    let mut recalculator = BatchBlinkRecalculator::new();
    let curve = recalculator
        .recalculate(&steady_trace(200.0, 1.0, 0.9), 0.5, 0.5, 0.5)
        .expect("101-sample kernel is valid");
    assert_eq!(curve.filter_size, 101);
}

#[test]
fn test_degenerate_window_is_rejected() {
    let mut recalculator = BatchBlinkRecalculator::new();

    // 10 samples over 0.9 s with a 0.1 s history rounds to a single tap.
    let err = recalculator
        .recalculate(&steady_trace(10.0, 1.0, 0.9), 0.1, 0.5, 0.5)
        .unwrap_err();
    assert_eq!(err, RecalcError::DegenerateWindow { filter_size: 1 });

    let pair = vec![PupilSample::new(0.0, 0.9), PupilSample::new(1.0, 0.9)];
    let err = recalculator.recalculate(&pair, 0.2, 0.5, 0.5).unwrap_err();
    assert_eq!(err, RecalcError::DegenerateWindow { filter_size: 0 });
}

#[test]
fn test_too_little_data_is_rejected() {
    let mut recalculator = BatchBlinkRecalculator::new();

    let err = recalculator.recalculate(&[], 0.2, 0.5, 0.5).unwrap_err();
    assert_eq!(err, RecalcError::InsufficientData { sample_count: 0 });

    let one = vec![PupilSample::new(0.0, 0.9)];
    let err = recalculator.recalculate(&one, 0.2, 0.5, 0.5).unwrap_err();
    assert_eq!(err, RecalcError::InsufficientData { sample_count: 1 });

    // Two samples on the same instant span no time at all.
    let stacked = vec![PupilSample::new(1.0, 0.9), PupilSample::new(1.0, 0.8)];
    let err = recalculator
        .recalculate(&stacked, 0.2, 0.5, 0.5)
        .unwrap_err();
    assert_eq!(err, RecalcError::InsufficientData { sample_count: 2 });
}

// ============================================================================
// PIPELINE TESTS
// ============================================================================

#[test]
fn test_scheduler_matches_direct_recalculation() {
    let samples = blink_trace();

    let scheduler = RecalcScheduler::new(Duration::from_millis(50));
    assert!(scheduler.request(RecalcRequest {
        samples: samples.clone(),
        history_length: 0.2,
        onset_confidence_threshold: 0.5,
        offset_confidence_threshold: 0.5,
    }));

    let outcome = scheduler
        .outcomes()
        .recv_timeout(Duration::from_secs(2))
        .expect("scheduler should produce an outcome");
    let scheduled = outcome.expect("canonical trace should recalculate");

    let mut recalculator = BatchBlinkRecalculator::new();
    let direct = recalculator
        .recalculate(&samples, 0.2, 0.5, 0.5)
        .expect("recalculate");

    assert_eq!(scheduled.filter_response, direct.filter_response);
    assert_eq!(scheduled.classification, direct.classification);
    assert_eq!(scheduled.events().len(), 2);

    scheduler.shutdown();
}

#[test]
fn test_replayed_recording_drives_the_detector() {
    let recording = Recording::synthetic_blink(100.0, 1.0, 0.3, 0.7, 0.1);
    let receiver = recording.stream(Speed::Burst);

    let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);
    let mut phases = Vec::new();
    for sample in receiver {
        if let Some(event) = detector.ingest(&[sample]) {
            phases.push(event.phase);
        }
    }

    assert!(phases.contains(&BlinkPhase::Onset));
    assert!(phases.contains(&BlinkPhase::Offset));
}

#[test]
fn test_rate_tracker_pairs_streaming_events() {
    let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);
    let mut tracker = BlinkRateTracker::new(300.0);

    let mut completed = Vec::new();
    for sample in blink_trace() {
        if let Some(event) = detector.ingest(&[sample]) {
            if let Some(blink) = tracker.record(&event) {
                completed.push(blink);
            }
        }
    }

    assert_eq!(completed.len(), 1);
    assert_eq!(tracker.completed_count(), 1);
    // First onset to first offset, midpoint timestamps 0.4 s apart.
    assert!((completed[0].duration - 0.4).abs() < 0.05);
    let mean = tracker.mean_duration().expect("one completed blink");
    assert!((mean - completed[0].duration).abs() < 1e-12);
}
