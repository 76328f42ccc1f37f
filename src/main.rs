use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod error;
mod tts;

use api::routes::{create_router, AppState};
use config::{Config, LogFormat};
use tts::{EngineHandle, PiperLoader, TtsService};

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_logging(LogFormat::Text);
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_format);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: Config) -> std::io::Result<()> {
    tracing::info!("Piper Speak API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", config.addr);
    tracing::info!(
        model = %config.voice_model.display(),
        config = %config.voice_config.display(),
        voice = %config.voice_name,
        "Voice configured (loaded on first request)"
    );

    if config.api_keys.is_empty() {
        tracing::warn!("API_KEYS is empty; every /speak request will be rejected");
    } else {
        tracing::info!("{} API key(s) configured", config.api_keys.len());
    }

    let engine = EngineHandle::new(
        config.voice_model,
        config.voice_config,
        Box::new(PiperLoader),
    );

    let state = Arc::new(AppState {
        tts: TtsService::new(engine),
        keys: config.api_keys,
        voice_name: config.voice_name,
        request_timeout: config.request_timeout,
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
