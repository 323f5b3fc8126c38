//! Session Lifecycle State

use std::fmt;

/// Lifecycle of a single-use session.
///
/// A session moves forward only: `Unstarted → Started → ServiceOpen →
/// RequestSent`, and any state can drop to `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, not yet connected.
    #[default]
    Unstarted,
    /// Connected and handshake complete.
    Started,
    /// Target service opened.
    ServiceOpen,
    /// The one request has been dispatched.
    RequestSent,
    /// Stopped or lost.
    Terminated,
}

impl SessionState {
    /// Check if a request may be sent.
    #[must_use]
    pub const fn can_send(&self) -> bool {
        matches!(self, Self::ServiceOpen)
    }

    /// State name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Started => "started",
            Self::ServiceOpen => "service-open",
            Self::RequestSent => "request-sent",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
