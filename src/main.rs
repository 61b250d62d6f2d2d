use anyhow::{bail, Context};
use checkout_relay::models::payment::StatusPolicy;
use checkout_relay::services::checkout_api_client::CheckoutApiClient;
use checkout_relay::services::http_client::build_client;
use checkout_relay::services::{ConfirmationPoller, PollOutcome};
use checkout_relay::{build_router, build_service, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "checkout-relay", version, about = "Checkout relay for PIX and card payments")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// TOML file read before environment variables
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Poll a running relay until a PIX transaction is paid
    Watch {
        transaction_id: String,
        #[arg(long, default_value = "http://localhost:3003")]
        server: Url,
        /// Seconds between checks
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        max_attempts: Option<u32>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve {
        config: None,
        port: None,
    }) {
        Command::Serve { config, port } => serve(config, port).await,
        Command::Watch {
            transaction_id,
            server,
            interval,
            max_attempts,
            config,
        } => watch(transaction_id, server, interval, max_attempts, config).await,
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load(path.as_deref()).context("failed to load configuration")
}

async fn serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server_port = port;
    }

    let missing = config.missing_credentials();
    if !missing.is_empty() {
        warn!(?missing, "Gateway credentials not set; those charges will be refused upstream");
    }

    info!("Starting checkout relay on port {}", config.server_port);

    let service = build_service(&config).context("failed to build HTTP client")?;
    let app = build_router(service);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn watch(
    transaction_id: String,
    server: Url,
    interval: Option<u64>,
    max_attempts: Option<u32>,
    config_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let mut settings = config.poll;
    if let Some(secs) = interval {
        if secs == 0 {
            bail!("--interval must be at least 1 second");
        }
        settings.interval = Duration::from_secs(secs);
    }
    if let Some(max) = max_attempts {
        settings.max_attempts = max;
    }

    let client = build_client(config.http_timeout).context("failed to build HTTP client")?;
    let checker = CheckoutApiClient::new(client, &server, StatusPolicy::new(&config.paid_statuses));

    info!(
        %transaction_id,
        %server,
        interval_secs = settings.interval.as_secs(),
        max_attempts = settings.max_attempts,
        "Waiting for payment confirmation"
    );

    let mut handle = ConfirmationPoller::new(Arc::new(checker), settings).start(transaction_id);

    let finished = tokio::select! {
        outcome = handle.outcome() => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    let outcome = match finished {
        Some(outcome) => outcome?,
        None => {
            handle.cancel();
            handle.outcome().await?
        }
    };

    match outcome {
        PollOutcome::Confirmed {
            transaction_id,
            status,
            attempts,
        } => {
            println!("{transaction_id}: {status:?} after {attempts} check(s)");
            Ok(())
        }
        PollOutcome::TimedOut {
            transaction_id,
            attempts,
        } => bail!("{transaction_id} not confirmed after {attempts} check(s)"),
        PollOutcome::Cancelled { attempts } => bail!("cancelled after {attempts} check(s)"),
        PollOutcome::Superseded { previous, attempts } => {
            bail!("{previous} superseded after {attempts} check(s)")
        }
    }
}
