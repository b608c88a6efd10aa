//! Streaming TTS HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use runtime::metrics::TtsMetrics;
use runtime::{HealthTracker, ModelResource, SynthesisScheduler, VoiceRegistry};
use tts_core::ServiceConfig;
use tts_server::{create_router, AppState};

/// Streaming TTS server
#[derive(Debug, Parser)]
#[command(name = "tts-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port
    #[arg(long)]
    port: Option<u16>,

    /// Override the log level
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }

    runtime::logging::init_from_config(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?config.engine.backend,
        "Starting TTS server"
    );

    if config.metrics.enabled {
        TtsMetrics::init(config.metrics.port).context("Failed to start metrics exporter")?;
        info!(port = config.metrics.port, "Metrics exporter started");
    }

    let registry =
        Arc::new(VoiceRegistry::new(config.voices.clone()).context("Invalid voice registry")?);
    info!(voices = registry.len(), "Voice registry initialized");

    let engine_config = config.engine.clone();
    let audio_config = config.audio.clone();
    let model = Arc::new(ModelResource::new(Box::new(move || {
        synth_engine::create_engine(&engine_config, &audio_config)
    })));

    // A load failure degrades the service rather than aborting it: /health
    // reports the reason and synthesis returns 503 until an operator
    // intervenes.
    if let Err(e) = model.load().await {
        error!(error = %e, "Model load failed, serving degraded");
    }

    let scheduler = SynthesisScheduler::new(Arc::clone(&model), Arc::clone(&registry), &config);
    let health = Arc::new(HealthTracker::new(model, Arc::clone(&registry)));
    let state = AppState::new(scheduler, registry, health);

    let app = create_router(state, config.server.max_body_size);
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
