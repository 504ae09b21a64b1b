//! emoserve
//!
//! HTTP inference endpoint for the `distilbert-base-uncased-emotion` text
//! classifier. The model loads in the background after the listener binds;
//! readiness endpoints report `false` until it is ready, and a load failure
//! stops the server.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use emoserve_classifiers::HubModelLoader;
use emoserve_server::{routes, telemetry, AppConfig, AppState, ConfigOverrides, ModelAdapter};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "emoserve")]
#[command(about = "Emotion classification inference endpoint", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "emoserve.yaml", env = "EMOSERVE_CONFIG")]
    config: PathBuf,

    /// Name the model is served under
    #[arg(short = 'n', long)]
    model_name: Option<String>,

    /// Listen address
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Predictions allowed to run at once
    #[arg(short, long)]
    workers: Option<usize>,

    /// Hugging Face repository of the model
    #[arg(long)]
    model_repo: Option<String>,

    /// Local model directory (overrides --model-repo)
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Inference device: cpu, cuda, metal
    #[arg(long)]
    device: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model_name: self.model_name.clone(),
            listen: self.listen.clone(),
            port: self.port,
            workers: self.workers,
            model_repo: self.model_repo.clone(),
            model_path: self.model_path.clone(),
            device: self.device.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    info!("Starting emoserve");

    let mut config = AppConfig::load(&cli.config)?;
    config.apply_overrides(cli.overrides());
    config.validate()?;
    info!("Configuration loaded successfully");
    info!("Model: {} ({})", config.model_name, config.model.model_id());
    info!("Workers: {}", config.server.workers);

    let metrics_handle = telemetry::init_metrics()?;

    let adapter = Arc::new(ModelAdapter::new(
        config.model_name.clone(),
        config.limits.clone(),
        config.server.workers,
    ));
    let state = AppState::new(Arc::clone(&adapter)).with_metrics(metrics_handle);
    let app = routes::create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    info!(
        "Predict endpoint: POST http://{}/v1/models/{}:predict",
        addr, config.model_name
    );

    let load_failed = Arc::new(Notify::new());
    let loader = HubModelLoader::new(config.model.clone());
    let load_task = tokio::spawn({
        let adapter = Arc::clone(&adapter);
        let load_failed = Arc::clone(&load_failed);
        async move {
            let result = adapter.load(&loader).await;
            if result.is_err() {
                load_failed.notify_one();
            }
            result
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(load_failed))
        .await?;

    if load_task.is_finished() {
        if let Err(e) = load_task.await? {
            error!("Model failed to load: {}", e);
            return Err(e.into());
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on SIGTERM, SIGINT or a failed model load
async fn shutdown_signal(load_failed: Arc<Notify>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Shutdown signal received, stopping server..."),
        _ = terminate => warn!("Shutdown signal received, stopping server..."),
        _ = load_failed.notified() => error!("Model load failed, stopping server..."),
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("emoserve=debug,emoserve_server=debug,emoserve_classifiers=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("emoserve=info,emoserve_server=info,emoserve_classifiers=info,tower_http=info")
        })
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}
