use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use gce_agents::config::Config;
use gce_agents::dispatch::FanOutController;
use gce_agents::gcp::auth::{self, GcpCredentials};
use gce_agents::gcp::client::GcpClient;
use gce_agents::resource::gcp_registry;
use gce_agents::server::{self, AppState};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Settings service for Google Compute Engine build agents
#[derive(Parser, Debug)]
#[command(name = "gce-agents", version, about, long_about = None)]
struct Args {
    /// Default GCP project for lookups
    #[arg(short, long)]
    project: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service account JSON key file
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Per-lookup timeout in seconds
    #[arg(long)]
    lookup_timeout: Option<u64>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.to_string().to_lowercase()));

    let Some(log_path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_deref())?;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(project) = args.project {
        if !auth::validate_project_id(&project) {
            anyhow::bail!("Invalid project ID: {}", project);
        }
        config.project_id = Some(project);
    }
    if let Some(path) = args.credentials {
        config.credentials_file = Some(path);
    }
    if let Some(secs) = args.lookup_timeout {
        config.lookup_timeout_secs = Some(secs);
    }

    let project = config.effective_project().context(
        "No GCP project configured. Set GOOGLE_CLOUD_PROJECT, project_id in the config, or use --project",
    )?;
    let listen = match args.listen {
        Some(addr) => addr,
        None => config.effective_listen_addr()?,
    };

    let credentials = match &config.credentials_file {
        Some(path) => GcpCredentials::from_service_account_file(path)?,
        None => GcpCredentials::application_default().await?,
    };
    let client = GcpClient::new(credentials, &project, config.effective_endpoint())?;

    let lookup_timeout = config.lookup_timeout();
    tracing::info!(
        "Using project: {}, endpoint: {}, lookup timeout: {:?}",
        project,
        config.effective_endpoint(),
        lookup_timeout
    );
    if lookup_timeout < Duration::from_secs(1) {
        tracing::warn!("Lookup timeout below one second; most lookups will time out");
    }

    let registry = gcp_registry(client, config.agent_pools.clone());
    tracing::info!("Serving lookups: {}", registry.names().join(", "));

    let controller = FanOutController::with_limits(
        registry,
        lookup_timeout,
        config.max_concurrent_lookups(),
    );

    server::serve(listen, AppState::new(controller, config.images)).await
}
