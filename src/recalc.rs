//! Debounced background recalculation.
//!
//! Whole-recording recalculation is expensive, so parameter changes should
//! not trigger it on every keystroke-level tweak. The scheduler runs a
//! worker thread that coalesces rapid request bursts: each new request
//! restarts the debounce timer, and only the most recent request in a burst
//! is executed once the timer lapses.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::core::batch::{BatchBlinkRecalculator, RecalcError, ResponseCurve};
use crate::source::types::PupilSample;

/// A snapshot of everything one recalculation needs.
#[derive(Debug, Clone)]
pub struct RecalcRequest {
    pub samples: Vec<PupilSample>,
    pub history_length: f64,
    pub onset_confidence_threshold: f64,
    pub offset_confidence_threshold: f64,
}

/// What the worker reports back per executed request.
pub type RecalcOutcome = Result<ResponseCurve, RecalcError>;

/// Owns the debounce worker and the channels to and from it.
pub struct RecalcScheduler {
    request_tx: Sender<RecalcRequest>,
    outcome_rx: Receiver<RecalcOutcome>,
    worker: JoinHandle<()>,
}

impl RecalcScheduler {
    /// Spawns the worker with the given debounce delay.
    pub fn new(debounce_delay: Duration) -> Self {
        let (request_tx, request_rx) = bounded(64);
        let (outcome_tx, outcome_rx) = bounded(64);

        let worker = std::thread::spawn(move || {
            worker_loop(request_rx, outcome_tx, debounce_delay);
        });

        Self {
            request_tx,
            outcome_rx,
            worker,
        }
    }

    /// Enqueues a recalculation request.
    ///
    /// Returns false if the worker is gone or the queue is full; the caller
    /// loses nothing either way since a newer request supersedes older ones.
    pub fn request(&self, request: RecalcRequest) -> bool {
        self.request_tx.try_send(request).is_ok()
    }

    /// The channel on which executed requests report their curves.
    pub fn outcomes(&self) -> &Receiver<RecalcOutcome> {
        &self.outcome_rx
    }

    /// Stops the worker after it finishes any pending request.
    pub fn shutdown(self) {
        let Self {
            request_tx,
            outcome_rx,
            worker,
        } = self;
        drop(request_tx);
        drop(outcome_rx);
        let _ = worker.join();
    }
}

fn worker_loop(
    requests: Receiver<RecalcRequest>,
    outcomes: Sender<RecalcOutcome>,
    delay: Duration,
) {
    let mut recalculator = BatchBlinkRecalculator::new();

    while let Ok(first) = requests.recv() {
        // Trailing-edge debounce: every newer request restarts the timer
        // and replaces the pending one.
        let mut pending = first;
        loop {
            match requests.recv_timeout(delay) {
                Ok(newer) => pending = newer,
                Err(_) => break,
            }
        }

        tracing::debug!(
            "recalculating over {} samples (history_length {:.3}s)",
            pending.samples.len(),
            pending.history_length
        );
        let outcome = recalculator
            .recalculate(
                &pending.samples,
                pending.history_length,
                pending.onset_confidence_threshold,
                pending.offset_confidence_threshold,
            )
            .map(|curve| curve.clone());

        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}
