//! Keyword Audit (kwaudit-ui) - Main entry point
//!
//! Local web service that submits course, program, CSV and pasted-text
//! sources to the analysis backend and presents the results as a
//! filterable, sortable, exportable table.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use kwaudit_common::config::{
    AppConfig, ConfigOverrides, ConfigResolver, LoggingConfig, RootFolderInitializer,
};
use kwaudit_common::db::init_database;
use kwaudit_ui::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for kwaudit-ui
#[derive(Parser, Debug)]
#[command(name = "kwaudit-ui")]
#[command(about = "Keyword audit service for course and program content")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "KWAUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database
    #[arg(short, long, env = "KWAUDIT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Analysis backend base URL
    #[arg(short, long, env = "KWAUDIT_BACKEND_URL")]
    backend_url: Option<String>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "KWAUDIT_PORT")]
    port: Option<u16>,
}

impl From<Args> for ConfigOverrides {
    fn from(args: Args) -> Self {
        Self {
            config_path: args.config,
            root_folder: args.root_folder,
            backend_url: args.backend_url,
            bind_address: args.bind,
            port: args.port,
        }
    }
}

/// Resolve configuration under a temporary console subscriber, so the
/// resolver's own log lines are visible before `init_tracing` runs
fn resolve_config<W>(overrides: ConfigOverrides, filter: EnvFilter, writer: W) -> Result<AppConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let bootstrap = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer));

    tracing::subscriber::with_default(bootstrap, || ConfigResolver::new(overrides).resolve())
        .context("Failed to load configuration")
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},tower_http=info", logging.level)))
        .context("Invalid log level")?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let bootstrap_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let config = resolve_config(args.into(), bootstrap_filter, std::io::stdout)?;

    init_tracing(&config.logging)?;

    info!(
        "Starting kwaudit-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Analysis backend: {}", config.backend_url);

    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let state = AppState::new(pool, &config).context("Failed to create backend client")?;
    state
        .restore()
        .await
        .context("Failed to restore previous results")?;

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address))?;
    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test writer that appends to a shared in-memory buffer
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_resolution_is_logged() {
        let captured = Arc::new(Mutex::new(Vec::<u8>::new()));
        let missing = std::env::temp_dir().join("kwaudit-no-such-config.toml");
        let overrides = ConfigOverrides {
            config_path: Some(missing.clone()),
            ..ConfigOverrides::default()
        };

        let config = resolve_config(overrides, EnvFilter::new("info"), {
            let captured = captured.clone();
            move || SharedBuf(captured.clone())
        }).unwrap();
        assert!(config.port > 0);

        let output = String::from_utf8(captured.lock().unwrap().clone()).unwrap();
        assert!(output.contains("not found, using defaults"));
        assert!(output.contains(&missing.display().to_string()));
    }
}
