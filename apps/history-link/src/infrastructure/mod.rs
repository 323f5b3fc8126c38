//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Terminal gateway WebSocket session.
pub mod terminal;

/// Host link transport and the exported call.
pub mod link;

/// Library log records and callback registration.
pub mod logging;

/// Configuration loading.
pub mod config;

/// OpenTelemetry tracing integration.
pub mod telemetry;
