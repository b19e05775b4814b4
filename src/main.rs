use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use xvps_renew::headers::{DEFAULT_HEADERS_PATH, load_headers};
use xvps_renew::{ClientOptions, RenewConfig, XServerClient, mask_credential};

/// Renew the expiration of an XServer free VPS.
///
/// Reads VPS_ID, X2SESSID and XSERVER_DEVICEKEY from the environment.
#[derive(Parser, Debug)]
#[command(name = "xvps-renew", version)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with the browser headers to send
    #[arg(long, default_value = DEFAULT_HEADERS_PATH)]
    headers: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Error executing command");
            ExitCode::FAILURE
        }
    }
}

/// JSON lines on stderr. `--verbose` forces debug, otherwise RUST_LOG wins.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("xvps_renew=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("xvps_renew=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(args: &Args) -> Result<()> {
    let config = RenewConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(vps_id = %config.vps_id, "Starting VPS renewal process");
    tracing::debug!(
        x2sessid = %mask_credential(&config.session_id),
        device_key = %mask_credential(&config.device_key),
        "Credentials loaded"
    );

    let headers = load_headers(&args.headers).context("Failed to load header template")?;

    let client = XServerClient::new(ClientOptions {
        session_id: config.session_id.clone(),
        device_key: config.device_key.clone(),
        headers,
        ..Default::default()
    })
    .context("Failed to create XServer client")?;

    let unique_id = client
        .fetch_unique_id(&config.vps_id)
        .await
        .with_context(|| format!("Failed to get unique ID for VPS {}", config.vps_id))?;
    tracing::info!(%unique_id, "Unique ID retrieved");

    client
        .extend_free_vps(&config.vps_id, &unique_id)
        .await
        .with_context(|| format!("Failed to extend free VPS {}", config.vps_id))?;

    Ok(())
}
