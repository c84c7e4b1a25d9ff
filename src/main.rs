//! Nictate CLI
//!
//! Blink detection over recorded pupil-confidence traces.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nictate::{
    config::DetectorConfig,
    core::{BatchBlinkRecalculator, BlinkRateTracker, StreamingBlinkDetector},
    session::create_shared_log,
    source::{Recording, Speed},
    VERSION,
};

#[derive(Parser)]
#[command(name = "nictate")]
#[command(version = VERSION)]
#[command(about = "Blink detection from pupil-confidence streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recording through the streaming detector
    Stream {
        /// Recording file (JSON array of samples)
        input: PathBuf,

        /// Replay speed multiplier (1.0 is real time)
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Replay as fast as possible instead of pacing by timestamps
        #[arg(long)]
        burst: bool,

        /// Override the configured window length in seconds
        #[arg(long)]
        history_length: Option<f64>,

        /// Override the configured onset threshold
        #[arg(long)]
        onset_threshold: Option<f64>,

        /// Override the configured offset threshold
        #[arg(long)]
        offset_threshold: Option<f64>,

        /// Print events as JSON lines instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// Recalculate the response curve for a whole recording
    Recalc {
        /// Recording file (JSON array of samples)
        input: PathBuf,

        /// Write the response curve to this file as JSON
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Override the configured window length in seconds
        #[arg(long)]
        history_length: Option<f64>,

        /// Override the configured onset threshold
        #[arg(long)]
        onset_threshold: Option<f64>,

        /// Override the configured offset threshold
        #[arg(long)]
        offset_threshold: Option<f64>,
    },

    /// Show sample-rate statistics for a recording
    Inspect {
        /// Recording file (JSON array of samples)
        input: PathBuf,
    },

    /// Show configuration
    Config,

    /// Serve the streaming detector over HTTP
    #[cfg(feature = "server")]
    Serve {
        /// Port to bind to (0 for random)
        #[arg(long, default_value = "8723")]
        port: u16,
    },
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stream {
            input,
            speed,
            burst,
            history_length,
            onset_threshold,
            offset_threshold,
            json,
        } => {
            cmd_stream(
                &input,
                speed,
                burst,
                resolve_config(history_length, onset_threshold, offset_threshold),
                json,
            );
        }
        Commands::Recalc {
            input,
            output,
            history_length,
            onset_threshold,
            offset_threshold,
        } => {
            cmd_recalc(
                &input,
                output,
                resolve_config(history_length, onset_threshold, offset_threshold),
            );
        }
        Commands::Inspect { input } => {
            cmd_inspect(&input);
        }
        Commands::Config => {
            cmd_config();
        }
        #[cfg(feature = "server")]
        Commands::Serve { port } => {
            cmd_serve(port);
        }
    }
}

/// Route detection logs to stderr, controlled by RUST_LOG.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Merge CLI overrides into the stored configuration.
fn resolve_config(
    history_length: Option<f64>,
    onset_threshold: Option<f64>,
    offset_threshold: Option<f64>,
) -> DetectorConfig {
    let mut config = DetectorConfig::load().unwrap_or_default();
    if let Some(value) = history_length {
        config.history_length = value;
    }
    if let Some(value) = onset_threshold {
        config.onset_confidence_threshold = value;
    }
    if let Some(value) = offset_threshold {
        config.offset_confidence_threshold = value;
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    config
}

fn load_recording(input: &PathBuf) -> Recording {
    match Recording::load(input) {
        Ok(recording) => recording,
        Err(e) => {
            eprintln!("Error loading {input:?}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_stream(input: &PathBuf, speed: f64, burst: bool, config: DetectorConfig, json: bool) {
    println!("Nictate v{VERSION}");
    println!();

    if !burst && !(speed.is_finite() && speed > 0.0) {
        eprintln!("Error: --speed must be a positive number");
        std::process::exit(1);
    }

    let recording = load_recording(input);
    let stats = recording.stats();

    println!("Streaming {input:?}");
    println!("  Samples: {}", stats.sample_count);
    println!("  Duration: {:.2}s", stats.duration_secs);
    println!("  Mean rate: {:.1}Hz", stats.mean_rate_hz);
    println!("  Window: {:.3}s", config.history_length);
    println!(
        "  Thresholds: onset {:.2} / offset {:.2}",
        config.onset_confidence_threshold, config.offset_confidence_threshold
    );
    if burst {
        println!("  Replay: burst");
    } else {
        println!("  Replay: {speed}x");
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let session = create_shared_log();
    println!("Instance ID: {}", session.instance_id());
    println!();

    let mut detector = StreamingBlinkDetector::new(
        config.history_length,
        config.onset_confidence_threshold,
        config.offset_confidence_threshold,
    );
    let mut rate_tracker = BlinkRateTracker::new(300.0);

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let replay_speed = if burst { Speed::Burst } else { Speed::Paced(speed) };
    let receiver = recording.stream(replay_speed);

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(sample) => {
                session.record_samples(1);

                if let Some(event) = detector.ingest(&[sample]) {
                    session.record_event(event.phase);
                    let completed = rate_tracker.record(&event);

                    if json {
                        if let Ok(line) = serde_json::to_string(&event) {
                            println!("{line}");
                        }
                    } else {
                        println!(
                            "[{:>8.3}s] {} (confidence {:.2})",
                            event.timestamp, event.phase, event.confidence
                        );
                        if let Some(blink) = completed {
                            println!(
                                "           blink complete, {:.0}ms closed",
                                blink.duration * 1000.0
                            );
                        }
                    }
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                // Replay finished.
                break;
            }
        }
    }

    println!();
    println!("{}", session.summary());

    if rate_tracker.completed_count() > 0 {
        println!();
        println!(
            "Blink rate: {:.1}/min over the trailing minute",
            rate_tracker.blinks_per_minute(60.0)
        );
        if let Some(mean) = rate_tracker.mean_duration() {
            println!("Mean blink duration: {:.0}ms", mean * 1000.0);
        }
        if let Some(spread) = rate_tracker.duration_std_dev() {
            println!("Duration spread: {:.0}ms", spread * 1000.0);
        }
    }
}

fn cmd_recalc(input: &PathBuf, output: Option<PathBuf>, config: DetectorConfig) {
    let recording = load_recording(input);

    let mut recalculator = BatchBlinkRecalculator::new();
    let curve = match recalculator.recalculate(
        recording.samples(),
        config.history_length,
        config.onset_confidence_threshold,
        config.offset_confidence_threshold,
    ) {
        Ok(curve) => curve,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Recalculated {input:?}");
    println!("  Samples: {}", curve.len());
    println!("  Filter size: {} samples", curve.filter_size);

    let events = curve.events();
    println!("  Events: {}", events.len());
    for event in &events {
        println!(
            "    [{:>8.3}s] {} (confidence {:.2})",
            event.timestamp, event.phase, event.confidence
        );
    }

    if let Some(path) = output {
        match serde_json::to_string_pretty(curve) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    eprintln!("Error writing {path:?}: {e}");
                    std::process::exit(1);
                }
                println!();
                println!("Wrote response curve to {path:?}");
            }
            Err(e) => {
                eprintln!("Error serializing response curve: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn cmd_inspect(input: &PathBuf) {
    let recording = load_recording(input);
    let stats = recording.stats();

    println!("Recording Inspection");
    println!("====================");
    println!();
    println!("File: {input:?}");
    println!("  Samples: {}", stats.sample_count);
    println!("  Duration: {:.2}s", stats.duration_secs);
    println!("  Mean rate: {:.1}Hz", stats.mean_rate_hz);
    println!(
        "  Mean interval: {:.2}ms (jitter {:.2}ms)",
        stats.mean_interval_secs * 1000.0,
        stats.interval_std_dev_secs * 1000.0
    );
    println!();

    let config = DetectorConfig::load().unwrap_or_default();
    let mut recalculator = BatchBlinkRecalculator::new();
    match recalculator.recalculate(
        recording.samples(),
        config.history_length,
        config.onset_confidence_threshold,
        config.offset_confidence_threshold,
    ) {
        Ok(curve) => {
            println!(
                "Batch recalculation with history_length {:.3}s:",
                config.history_length
            );
            println!("  Filter size: {} samples", curve.filter_size);
            println!("  Derived events: {}", curve.events().len());
        }
        Err(e) => {
            println!("Batch recalculation unavailable: {e}");
        }
    }
}

fn cmd_config() {
    let config = DetectorConfig::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", DetectorConfig::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

#[cfg(feature = "server")]
fn cmd_serve(port: u16) {
    let config = DetectorConfig::load().unwrap_or_default();
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Nictate server v{VERSION}");
    println!();
    println!("  Window: {:.3}s", config.history_length);
    println!(
        "  Thresholds: onset {:.2} / offset {:.2}",
        config.onset_confidence_threshold, config.offset_confidence_threshold
    );
    println!();

    let server_config = nictate::server::ServerConfig::new(port, config);

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create async runtime");
    runtime.block_on(async {
        match nictate::server::run(server_config).await {
            Ok((addr, shutdown_tx)) => {
                println!("Listening on http://{addr}");
                println!("Press Ctrl+C to stop");

                let _ = tokio::signal::ctrl_c().await;
                println!();
                println!("Shutting down...");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                eprintln!("Error starting server: {e}");
                std::process::exit(1);
            }
        }
    });
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
