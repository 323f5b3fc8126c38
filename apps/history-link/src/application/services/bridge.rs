//! Bridge Call
//!
//! One host call end to end: build the request, start the session, open the
//! service, send, collect, and return a single string. Every failure mode
//! collapses into that string:
//!
//! 1. Connection failures short-circuit with a fixed line and skip the send.
//! 2. Request or session failures arrive as events and are appended to the
//!    partial output by the collector.
//! 3. Library faults and panics during collection are appended as
//!    `Library Exception !!!` / `Unknown Exception !!!` lines.
//!
//! The session is released exactly once on every path.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::application::ports::SessionPort;
use crate::application::services::collector::ResponseCollector;
use crate::application::services::guard::SessionGuard;
use crate::domain::request::{HistoryArgs, HistoryRequest};

/// Reference data service name.
pub const REFDATA_SERVICE: &str = "//blp/refdata";

/// Line returned when the session cannot be started.
pub const START_FAILED: &str = "Failed to start session.\n";

/// Per-call settings that do not come from the host arguments.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// Service to open.
    pub service: String,
    /// `host:port` label used in diagnostics.
    pub endpoint: String,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            service: REFDATA_SERVICE.to_string(),
            endpoint: "localhost:8194".to_string(),
        }
    }
}

/// Run one historical data call over `session`.
pub async fn run_history<S: SessionPort>(
    session: S,
    args: &HistoryArgs,
    options: &BridgeOptions,
) -> String {
    let mut out = String::new();
    let request = HistoryRequest::from_args(args);

    if args.debug > 0 {
        out.push_str(&format!("Connecting to {}\n", options.endpoint));
    }

    let mut session = SessionGuard::new(session);

    if let Err(e) = session.start().await {
        tracing::error!(error = %e, endpoint = %options.endpoint, "Failed to start session");
        out.push_str(START_FAILED);
        session.shutdown().await;
        return out;
    }

    if let Err(e) = session.open_service(&options.service).await {
        tracing::error!(error = %e, service = %options.service, "Failed to open service");
        out.push_str(&format!("Failed to open {}\n", options.service));
        session.shutdown().await;
        return out;
    }

    tracing::debug!("Sending Request: {request}");
    session.send_request(&request).await;

    let mut collector = ResponseCollector::new(args.debug);
    let outcome = AssertUnwindSafe(collector.run(&mut *session))
        .catch_unwind()
        .await;
    out.push_str(collector.output());

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(fault)) => {
            tracing::error!(error = %fault, "Library exception while collecting response");
            out.push_str(&format!("Library Exception !!!{fault}\n"));
        }
        Err(_) => {
            tracing::error!("Unknown exception while collecting response");
            out.push_str("Unknown Exception !!!\n");
        }
    }

    session.shutdown().await;
    out
}

// =============================================================================
// Tests
// =============================================================================
