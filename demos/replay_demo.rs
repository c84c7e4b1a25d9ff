//! Replay demo: synthesizes a one-second trace containing a single blink,
//! streams it through the live detector, then reprocesses the same trace
//! with the batch recalculator.
//!
//! Run with: cargo run --example replay_demo

use std::time::Duration;

use nictate::core::{BatchBlinkRecalculator, BlinkRateTracker, StreamingBlinkDetector};
use nictate::session::create_shared_log;
use nictate::source::{Recording, Speed};

fn main() {
    println!("=== Nictate Replay Demo ===");
    println!();

    let recording = Recording::synthetic_blink(100.0, 1.0, 0.3, 0.7, 0.1);
    let stats = recording.stats();
    println!(
        "Synthesized {} samples at {:.0}Hz, confidence dips during [0.3s, 0.7s)",
        stats.sample_count, stats.mean_rate_hz
    );
    println!();

    println!("Streaming detection (4x replay):");
    let session = create_shared_log();
    let mut detector = StreamingBlinkDetector::new(0.2, 0.5, 0.5);
    let mut rate_tracker = BlinkRateTracker::new(300.0);

    let receiver = recording.clone().stream(Speed::Paced(4.0));
    while let Ok(sample) = receiver.recv_timeout(Duration::from_secs(2)) {
        session.record_samples(1);
        if let Some(event) = detector.ingest(&[sample]) {
            session.record_event(event.phase);
            println!(
                "  [{:.3}s] {} (confidence {:.2})",
                event.timestamp, event.phase, event.confidence
            );
            if let Some(blink) = rate_tracker.record(&event) {
                println!("  eye was closed for {:.0}ms", blink.duration * 1000.0);
            }
        }
    }
    println!();

    println!("Batch recalculation of the same trace:");
    let mut recalculator = BatchBlinkRecalculator::new();
    match recalculator.recalculate(recording.samples(), 0.2, 0.5, 0.5) {
        Ok(curve) => {
            session.record_recalculation();
            println!(
                "  Kernel of {} taps over {} samples",
                curve.filter_size,
                curve.len()
            );
            for event in curve.events() {
                println!(
                    "  [{:.3}s] {} (confidence {:.2})",
                    event.timestamp, event.phase, event.confidence
                );
            }
        }
        Err(e) => {
            println!("  Recalculation failed: {e}");
        }
    }

    println!();
    println!("{}", session.summary());
    println!();
    println!("Done!");
}
