//! Host Link
//!
//! The host calls one function and always gets one string back. In link
//! mode the host writes one call per line as a JSON array of positional
//! arguments and reads one JSON string per line:
//!
//! ```text
//! > ["IBM US Equity", "PX_LAST", "20160104", "20160105"]
//! < "{{\"2016-01-04\", 135.95},{\"2016-01-05\", 135.85}}"
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::application::services::{BridgeOptions, run_history};
use crate::domain::request::HistoryArgs;
use crate::infrastructure::config::BridgeConfig;
use crate::infrastructure::logging::{self, Severity};
use crate::infrastructure::terminal::{TerminalSession, TerminalSessionConfig};

/// Fewest positional arguments in a call.
const MIN_ARGS: usize = 4;

/// Most positional arguments in a call.
const MAX_ARGS: usize = 8;

/// Errors from the link transport.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The call line is not a JSON array.
    #[error("malformed call: {0}")]
    Json(#[from] serde_json::Error),

    /// The call line is not UTF-8.
    #[error("call is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Wrong number of arguments.
    #[error("expected {MIN_ARGS} to {MAX_ARGS} arguments, got {0}")]
    Arity(usize),

    /// An argument has the wrong type.
    #[error("argument {position} ({name}) must be {expected}")]
    ArgumentType {
        /// 1-based position.
        position: usize,
        /// Parameter name.
        name: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// Reading or writing the link failed.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves host calls against one gateway.
#[derive(Debug, Clone)]
pub struct HistoryLink {
    config: BridgeConfig,
    cancel: CancellationToken,
}

impl HistoryLink {
    /// Create a link for `config`.
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to abort in-flight calls.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Gateway configuration.
    #[must_use]
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Serve one call on a fresh session.
    pub async fn call(&self, args: &HistoryArgs) -> String {
        if args.debug > 0 {
            logging::register_default(Severity::from_verbosity(args.debug));
        }

        let session = TerminalSession::new(
            TerminalSessionConfig::from(&self.config),
            self.cancel.clone(),
        );
        let options = BridgeOptions {
            service: self.config.session.service.clone(),
            endpoint: self.config.endpoint(),
        };

        run_history(session, args, &options).await
    }

    /// Serve calls from `reader` until EOF, one reply line per call.
    ///
    /// # Errors
    ///
    /// Returns an error only if the link itself fails. Bad call lines are
    /// answered with an `Invalid call: ...` string.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<(), LinkError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut served = 0_u64;

        loop {
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let reply = match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => match parse_call(&line) {
                    Ok(args) => self.call(&args).await,
                    Err(e) => {
                        tracing::warn!(error = %e, "Rejected call");
                        format!("Invalid call: {e}")
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected call");
                    format!("Invalid call: {}", LinkError::Encoding(e))
                }
            };

            let mut encoded = serde_json::to_string(&reply)?;
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
            served += 1;
        }

        tracing::debug!(served, "Link closed");
        Ok(())
    }
}

/// Parse one link call line.
///
/// # Errors
///
/// Returns an error if the line is not a JSON array of 4 to 8 arguments
/// with strings for the text parameters and integers for the flags.
pub fn parse_call(line: &str) -> Result<HistoryArgs, LinkError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(line)?;
    if !(MIN_ARGS..=MAX_ARGS).contains(&values.len()) {
        return Err(LinkError::Arity(values.len()));
    }

    let text = |index: usize, name: &'static str| -> Result<Option<String>, LinkError> {
        values.get(index).map_or(Ok(None), |v| {
            v.as_str()
                .map(|s| Some(s.to_string()))
                .ok_or(LinkError::ArgumentType {
                    position: index + 1,
                    name,
                    expected: "a string",
                })
        })
    };
    let int = |index: usize, name: &'static str| -> Result<Option<i32>, LinkError> {
        values.get(index).map_or(Ok(None), |v| {
            v.as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Some)
                .ok_or(LinkError::ArgumentType {
                    position: index + 1,
                    name,
                    expected: "an integer",
                })
        })
    };

    let mut args = HistoryArgs::new(
        text(0, "ticker")?.unwrap_or_default(),
        text(1, "field")?.unwrap_or_default(),
        text(2, "startDate")?.unwrap_or_default(),
        text(3, "endDate")?.unwrap_or_default(),
    );
    if let Some(selection) = text(4, "periodicitySelection")? {
        args = args.with_periodicity_selection(selection);
    }
    if let Some(adjustment) = text(5, "periodicityAdjustment")? {
        args = args.with_periodicity_adjustment(adjustment);
    }
    if let Some(use_dpdf) = int(6, "useDPDF")? {
        args = args.with_use_dpdf(use_dpdf);
    }
    if let Some(debug) = int(7, "debug")? {
        args = args.with_debug(debug);
    }

    Ok(args)
}

/// Fetch historical data for one security and field.
///
/// The gateway is located from the environment (`HISTORY_LINK_*`); an
/// invalid setting falls back to the defaults. Always returns a string.
#[allow(clippy::too_many_arguments)]
pub async fn get_history_link(
    ticker: &str,
    field: &str,
    start_date: &str,
    end_date: &str,
    periodicity_selection: &str,
    periodicity_adjustment: &str,
    use_dpdf: i32,
    debug: i32,
) -> String {
    let config = BridgeConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Invalid configuration, using defaults");
        BridgeConfig::default()
    });

    let args = HistoryArgs::new(ticker, field, start_date, end_date)
        .with_periodicity_selection(periodicity_selection)
        .with_periodicity_adjustment(periodicity_adjustment)
        .with_use_dpdf(use_dpdf)
        .with_debug(debug);

    HistoryLink::new(config).call(&args).await
}

// =============================================================================
// Tests
// =============================================================================
