//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `SessionPort`: A single-use session to the terminal service

use async_trait::async_trait;

use crate::domain::event::Event;
use crate::domain::request::HistoryRequest;
use crate::domain::session::SessionState;

/// Errors surfaced by a session.
///
/// These are library-level faults. Business failures (a rejected request,
/// a dropped session) arrive as events instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Could not connect to the gateway.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect did not complete in time.
    #[error("connection timed out")]
    ConnectTimeout,

    /// The gateway refused the session during the handshake.
    #[error("session startup failed: {0}")]
    StartupFailed(String),

    /// The named service could not be opened.
    #[error("failed to open service {service}: {reason}")]
    ServiceOpenFailed {
        /// Service name.
        service: String,
        /// Reason given by the gateway.
        reason: String,
    },

    /// Operation not allowed in the current state.
    #[error("invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        /// Required state.
        expected: SessionState,
        /// Current state.
        actual: SessionState,
    },

    /// Transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The connection closed while an answer was awaited.
    #[error("connection closed")]
    ConnectionClosed,

    /// The session is not connected.
    #[error("session not connected")]
    NotConnected,

    /// The wait was cancelled.
    #[error("session cancelled")]
    Cancelled,
}

/// A single-use session to the terminal service.
///
/// Exactly one request is sent per session. `shutdown` releases the
/// connection on the normal path; `stop` is synchronous so that it can run
/// from a `Drop` guard on every other exit path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionPort: Send {
    /// Connect and complete the session handshake.
    async fn start(&mut self) -> Result<(), SessionError>;

    /// Open the named service.
    async fn open_service(&mut self, service: &str) -> Result<(), SessionError>;

    /// Dispatch the request. Failures surface later as request status events.
    async fn send_request(&mut self, request: &HistoryRequest);

    /// Wait for the next inbound event. There is no timeout.
    async fn next_event(&mut self) -> Result<Event, SessionError>;

    /// Release the connection, waiting for the close to be sent.
    async fn shutdown(&mut self) {
        self.stop();
    }

    /// Release the connection without waiting.
    fn stop(&mut self);

    /// Current lifecycle state.
    fn state(&self) -> SessionState;
}
