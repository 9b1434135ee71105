//! MsgCheck - message moderation classifier.
//!
//! Loads the toxicity and sentiment models once and serves the
//! classification API until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use msgcheck_core::classifier::{OnnxSentimentScorer, OnnxToxicityScorer};
use msgcheck_core::model_downloader::{
    DownloadProgress, ModelDownloader, ModelKind, ProgressCallback,
};
use msgcheck_core::MessageClassifier;
use msgcheck_server::{
    AppState, Server, ServerConfig, DEFAULT_CORS_ORIGIN, DEFAULT_HOST, DEFAULT_PORT,
};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// MsgCheck - classify messages as dangerous, abusive, harassment, sarcasm or safe
#[derive(Parser, Debug)]
#[command(name = "msgcheck", version, about)]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Origin allowed to call the API from a browser (repeatable, `*` for any)
    #[arg(long = "cors-origin", default_values_t = [DEFAULT_CORS_ORIGIN.to_string()])]
    cors_origins: Vec<String>,

    /// Directory holding the `toxicity/` and `sentiment/` model bundles
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Download missing models and ONNX Runtime before starting
    #[arg(long)]
    download_models: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_host(self.host.clone())
            .with_port(self.port)
            .with_cors_origins(self.cors_origins.clone())
    }

    fn downloader(&self) -> ModelDownloader {
        let downloader = ModelDownloader::new().unwrap_or_else(|| {
            tracing::warn!("No platform data directory, using working directory");
            ModelDownloader::with_data_dir(".")
        });

        match &self.model_dir {
            Some(dir) => downloader.with_models_dir(dir),
            None => downloader,
        }
    }
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "msgcheck", "MsgCheck").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize console logging plus a rotating log file when possible.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("msgcheck={},warn", log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("msgcheck")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Fetches whatever the downloader reports missing.
async fn download_models(downloader: &ModelDownloader) -> Result<()> {
    let progress: ProgressCallback = Arc::new(|p: DownloadProgress| {
        if p.complete {
            tracing::info!("{}", p.step);
        } else if let Some(pct) = p.percentage() {
            tracing::info!("{} ({}%)", p.step, pct);
        } else {
            tracing::info!("{}", p.step);
        }
    });

    downloader
        .ensure_all(Some(progress))
        .await
        .context("failed to download models")
}

/// Loads both models and wires them into the classifier.
fn load_classifier(downloader: &ModelDownloader) -> Result<MessageClassifier> {
    if !downloader.setup_environment() {
        tracing::debug!(
            "No downloaded ONNX Runtime, relying on {} or system library",
            ModelDownloader::onnx_lib_env_var()
        );
    }

    let toxicity_paths = downloader.model_paths(ModelKind::Toxicity);
    let toxicity = OnnxToxicityScorer::new(toxicity_paths.clone()).with_context(|| {
        format!(
            "failed to load toxicity model from {} (try --download-models)",
            toxicity_paths.model_path.display()
        )
    })?;

    let sentiment_paths = downloader.model_paths(ModelKind::Sentiment);
    let sentiment = OnnxSentimentScorer::new(sentiment_paths.clone()).with_context(|| {
        format!(
            "failed to load sentiment model from {} (try --download-models)",
            sentiment_paths.model_path.display()
        )
    })?;

    tracing::info!("Models loaded from {:?}", downloader.models_dir());
    Ok(MessageClassifier::new(Box::new(toxicity), Box::new(sentiment)))
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args);

    tracing::info!("MsgCheck v{} starting", env!("CARGO_PKG_VERSION"));

    let downloader = args.downloader();
    if args.download_models {
        download_models(&downloader).await?;
    } else if !downloader.status().is_ready() {
        tracing::warn!("{}", downloader.status().description());
    }

    let classifier = load_classifier(&downloader)?;

    let server = Server::with_state(args.server_config(), AppState::new(classifier))
        .context("invalid server configuration")?;
    server.run_until(shutdown_signal()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = Args::try_parse_from(["msgcheck"]).unwrap();
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 5000);
        assert_eq!(args.cors_origins, vec!["http://localhost:3000"]);
        assert!(args.model_dir.is_none());
        assert!(!args.download_models);
    }

    #[test]
    fn args_repeatable_cors_origin() {
        let args = Args::try_parse_from([
            "msgcheck",
            "--cors-origin",
            "http://a.example",
            "--cors-origin",
            "http://b.example",
            "--port",
            "8080",
        ])
        .unwrap();
        assert_eq!(args.cors_origins, vec!["http://a.example", "http://b.example"]);

        let config = args.server_config();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn model_dir_overrides_downloader() {
        let args = Args::try_parse_from(["msgcheck", "--model-dir", "/opt/models"]).unwrap();
        let downloader = args.downloader();
        assert_eq!(
            downloader.model_paths(ModelKind::Toxicity).model_path,
            PathBuf::from("/opt/models/toxicity/model.onnx")
        );
    }
}
