//! History Link Binary
//!
//! Serves historical data calls for a host process.
//!
//! # Usage
//!
//! ```bash
//! # One call, result on stdout
//! history-link "IBM US Equity" PX_LAST 20160101 20160131
//!
//! # Link mode: one JSON array per stdin line, one JSON string per stdout line
//! history-link --link
//! ```
//!
//! # Environment Variables
//!
//! - `HISTORY_LINK_HOST`: Gateway host (default: localhost)
//! - `HISTORY_LINK_PORT`: Gateway port (default: 8194)
//! - `HISTORY_LINK_SERVICE`: Service to open (default: //blp/refdata)
//! - `HISTORY_LINK_TLS`: Use wss:// (default: false)
//! - `HISTORY_LINK_CONNECT_TIMEOUT_SECS`: Connect timeout (default: none)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `RUST_LOG`: Log filter (default: `history_link=warn`)

use anyhow::Context;
use clap::Parser;
use history_link::infrastructure::telemetry;
use history_link::{BridgeConfig, HistoryArgs, HistoryLink};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Command line.
#[derive(Debug, Parser)]
#[command(name = "history-link", version, about = "Historical market data bridge")]
struct Cli {
    /// Serve calls from stdin instead of running one call.
    #[arg(long)]
    link: bool,

    /// Gateway host (overrides `HISTORY_LINK_HOST`).
    #[arg(long)]
    host: Option<String>,

    /// Gateway port (overrides `HISTORY_LINK_PORT`).
    #[arg(long)]
    port: Option<u16>,

    /// Security identifier.
    #[arg(required_unless_present = "link")]
    ticker: Option<String>,

    /// Field mnemonic.
    #[arg(required_unless_present = "link")]
    field: Option<String>,

    /// First date of the range (YYYYMMDD).
    #[arg(required_unless_present = "link")]
    start_date: Option<String>,

    /// Last date of the range (YYYYMMDD).
    #[arg(required_unless_present = "link")]
    end_date: Option<String>,

    /// Sampling frequency.
    #[arg(default_value = "DAILY")]
    periodicity_selection: String,

    /// Calendar adjustment.
    #[arg(default_value = "Actual")]
    periodicity_adjustment: String,

    /// Follow DPDF adjustment settings (0 or 1).
    #[arg(default_value_t = 0, allow_negative_numbers = true)]
    use_dpdf: i32,

    /// Diagnostic verbosity.
    #[arg(default_value_t = 0, allow_negative_numbers = true)]
    debug: i32,
}

impl Cli {
    fn history_args(&self) -> HistoryArgs {
        HistoryArgs::new(
            self.ticker.clone().unwrap_or_default(),
            self.field.clone().unwrap_or_default(),
            self.start_date.clone().unwrap_or_default(),
            self.end_date.clone().unwrap_or_default(),
        )
        .with_periodicity_selection(&self.periodicity_selection)
        .with_periodicity_adjustment(&self.periodicity_adjustment)
        .with_use_dpdf(self.use_dpdf)
        .with_debug(self.debug)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("rustls crypto provider already installed");
    }

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    let config = BridgeConfig::from_env()
        .context("invalid gateway configuration")?
        .with_endpoint(cli.host.clone(), cli.port);
    tracing::debug!(
        url = %config.url(),
        service = %config.session.service,
        link = cli.link,
        "Configuration loaded"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let link = HistoryLink::new(config).with_cancel(cancel);

    if cli.link {
        let stdin = BufReader::new(tokio::io::stdin());
        link.serve(stdin, tokio::io::stdout())
            .await
            .context("host link failed")?;
    } else {
        let reply = link.call(&cli.history_args()).await;
        let mut stdout = tokio::io::stdout();
        stdout.write_all(reply.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Cancel in-flight calls on Ctrl+C.
async fn cancel_on_signal(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C, cancelling");
            cancel.cancel();
        }
        Err(e) => tracing::warn!(error = %e, "Signal handler unavailable"),
    }
}
