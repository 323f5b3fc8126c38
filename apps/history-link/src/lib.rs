#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! History Link - Historical Market Data Bridge
//!
//! Takes one historical-data call from a host numerical environment,
//! issues a single `HistoricalDataRequest` on a terminal session, collects
//! the streamed response events and returns one string the host can
//! evaluate: `{{"2016-01-04", 135.95},{"2016-01-05", 135.85}}`.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Element tree, events, request and the response formatter
//!   - `element`: Self-describing element tree with block printing
//!   - `event`: Inbound events and messages
//!   - `request`: Host arguments and the historical data request
//!   - `response`: Text formatting of response events
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: The `SessionPort` trait
//!   - `services`: Response collector, session guard, bridge call
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `terminal`: WebSocket session to the terminal gateway
//!   - `link`: Host link transport and `get_history_link`
//!   - `logging`: Library log records
//!   - `config`: Gateway configuration
//!   - `telemetry`: `tracing` subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Host ──call──► HistoryLink ──► run_history ──► TerminalSession ──ws──► Gateway
//!  ▲                                  │                                    │
//!  └────────────string────────────────┴──── ResponseCollector ◄──events────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure bridge types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::element::{Element, Scalar, Value};
pub use domain::event::{CorrelationId, Event, EventType, Message};
pub use domain::request::{HistoryArgs, HistoryRequest};
pub use domain::response::{ErrorInfo, FormatError, format_event};
pub use domain::session::SessionState;

// Application
pub use application::ports::{SessionError, SessionPort};
pub use application::services::{
    BridgeOptions, CollectorFault, CollectorState, REFDATA_SERVICE, ResponseCollector,
    SessionGuard, run_history,
};

// Infrastructure
pub use infrastructure::config::{BridgeConfig, ConfigError, SessionSettings};
pub use infrastructure::link::{HistoryLink, LinkError, get_history_link, parse_call};
pub use infrastructure::logging::{LogRecord, Severity};
pub use infrastructure::terminal::{TerminalSession, TerminalSessionConfig};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
