//! HTTP server exposing the streaming detector to local tooling.
//!
//! This module provides an HTTP server that:
//! - Accepts pupil sample batches via POST /v1/samples
//! - Feeds them through a shared StreamingBlinkDetector
//! - Serves recent blink events and session counters for dashboards
//!
//! # Architecture
//!
//! ```text
//! Capture pipeline ──→ POST /v1/samples ──→ detector ──→ recent events ring
//!                                               ↓
//!                                        [session counters]
//! ```

use crate::config::DetectorConfig;
use crate::core::streaming::StreamingBlinkDetector;
use crate::session::{create_shared_log, SharedSessionLog};
use crate::source::types::{BlinkEvent, PupilSample};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};

/// How many emitted events the server remembers for GET /v1/events/recent.
const DEFAULT_RECENT_CAPACITY: usize = 32;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Detector parameters applied to the shared streaming detector
    pub detector: DetectorConfig,
    /// How many recent events to retain
    pub recent_capacity: usize,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, detector: DetectorConfig) -> Self {
        Self {
            port,
            detector,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
        }
    }
}

/// Shared server state
pub struct ServerState {
    /// The streaming detector all ingest requests feed
    detector: Mutex<StreamingBlinkDetector>,
    /// Ring of the most recent emitted events, oldest first
    recent: RwLock<VecDeque<BlinkEvent>>,
    recent_capacity: usize,
    /// Session counters
    session: SharedSessionLog,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            detector: Mutex::new(StreamingBlinkDetector::new(
                config.detector.history_length,
                config.detector.onset_confidence_threshold,
                config.detector.offset_confidence_threshold,
            )),
            recent: RwLock::new(VecDeque::with_capacity(config.recent_capacity)),
            recent_capacity: config.recent_capacity,
            session: create_shared_log(),
        }
    }
}

/// A batch of samples to feed the detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub samples: Vec<PupilSample>,
}

/// Response from the ingest endpoint
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    /// How many samples entered the detector window
    pub accepted: usize,
    /// The event this batch triggered, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<BlinkEvent>,
}

/// Recent events, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct RecentEventsResponse {
    pub events: Vec<BlinkEvent>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Rejects batches the detector's preconditions forbid.
fn validate_batch(samples: &[PupilSample], after: Option<f64>) -> Result<(), String> {
    let mut previous = after;
    for (index, sample) in samples.iter().enumerate() {
        if !sample.timestamp.is_finite() || !sample.confidence.is_finite() {
            return Err(format!("sample {} has a non-finite field", index));
        }
        if !(0.0..=1.0).contains(&sample.confidence) {
            return Err(format!(
                "sample {} confidence {} outside [0, 1]",
                index, sample.confidence
            ));
        }
        if let Some(prev) = previous {
            if sample.timestamp < prev {
                return Err(format!(
                    "sample {} timestamp {} precedes {}",
                    index, sample.timestamp, prev
                ));
            }
        }
        previous = Some(sample.timestamp);
    }
    Ok(())
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /v1/samples
///
/// Feeds a sample batch to the shared detector. Batches must continue the
/// timestamp order of everything ingested before them.
async fn ingest_samples(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut detector = state.detector.lock().await;

    validate_batch(&request.samples, detector.last_timestamp()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e,
                code: "INVALID_SAMPLES".to_string(),
            }),
        )
    })?;

    let event = detector.ingest(&request.samples);
    drop(detector);

    state.session.record_samples(request.samples.len() as u64);
    if let Some(ref event) = event {
        state.session.record_event(event.phase);

        let mut recent = state.recent.write().await;
        if recent.len() == state.recent_capacity {
            recent.pop_front();
        }
        recent.push_back(event.clone());
    }

    Ok(Json(IngestResponse {
        accepted: request.samples.len(),
        event,
    }))
}

/// GET /v1/events/recent
async fn recent_events(State(state): State<Arc<ServerState>>) -> Json<RecentEventsResponse> {
    let recent = state.recent.read().await;
    Json(RecentEventsResponse {
        events: recent.iter().cloned().collect(),
    })
}

/// GET /v1/session
async fn session_stats(
    State(state): State<Arc<ServerState>>,
) -> Json<crate::session::SessionStats> {
    Json(state.session.stats())
}

/// Build the service router over shared state.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/samples", post(ingest_samples))
        .route("/v1/events/recent", get(recent_events))
        .route("/v1/session", get(session_stats))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Blink detector server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
