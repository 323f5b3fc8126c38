//! Library Log Records
//!
//! The session adapter reports its own diagnostics as severity-tagged
//! records. A process-wide callback, registered with a minimum severity,
//! receives every record at or above that severity. The default callback
//! forwards the formatted line to `tracing`, which writes to stderr.
//!
//! Record format:
//!
//! ```text
//! history_link.session [INFO] Thread ID = 1: Connecting to ws://localhost:8194/
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

// =============================================================================
// Severity
// =============================================================================

/// Record severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    /// Logging disabled.
    #[default]
    Off,
    /// Unrecoverable.
    Fatal,
    /// Error.
    Error,
    /// Warning.
    Warn,
    /// Informational.
    Info,
    /// Debug detail.
    Debug,
    /// Everything.
    Trace,
}

impl Severity {
    /// Map a verbosity count to a threshold.
    ///
    /// `0` (or less) is `Off`, `1` is `Info`, `2` is `Debug`, `3+` is `Trace`.
    #[must_use]
    pub const fn from_verbosity(count: i32) -> Self {
        match count {
            i32::MIN..=0 => Self::Off,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Upper-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Check if a record of `self` passes a `threshold`.
    #[must_use]
    pub fn passes(self, threshold: Self) -> bool {
        self != Self::Off && threshold != Self::Off && self <= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Record
// =============================================================================

/// One library log record.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Small per-process id of the emitting thread.
    pub thread_id: u64,
    /// Severity.
    pub severity: Severity,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
    /// Emitting component.
    pub category: String,
    /// Text.
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] Thread ID = {}: {}",
            self.category, self.severity, self.thread_id, self.message
        )
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Callback receiving records.
pub type LogCallback = Arc<dyn Fn(&LogRecord) + Send + Sync>;

struct Registration {
    threshold: Severity,
    callback: LogCallback,
}

static REGISTRATION: RwLock<Option<Registration>> = RwLock::new(None);

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: Cell<u64> = const { Cell::new(0) };
}

fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}

/// Install `callback` for records at or above `threshold`.
///
/// Replaces any previous registration.
pub fn register_callback<F>(threshold: Severity, callback: F)
where
    F: Fn(&LogRecord) + Send + Sync + 'static,
{
    *REGISTRATION.write() = Some(Registration {
        threshold,
        callback: Arc::new(callback),
    });
}

/// Install the default callback, which forwards to `tracing`.
pub fn register_default(threshold: Severity) {
    register_callback(threshold, forward_to_tracing);
}

/// Remove the current registration.
pub fn unregister() {
    *REGISTRATION.write() = None;
}

/// Emit a record. Cheap when nothing is registered for `severity`.
pub fn emit(severity: Severity, category: &str, message: impl fmt::Display) {
    let callback = {
        let guard = REGISTRATION.read();
        match guard.as_ref() {
            Some(r) if severity.passes(r.threshold) => Arc::clone(&r.callback),
            _ => return,
        }
    };

    let record = LogRecord {
        thread_id: current_thread_id(),
        severity,
        timestamp: Utc::now(),
        category: category.to_string(),
        message: message.to_string(),
    };
    callback(&record);
}

fn forward_to_tracing(record: &LogRecord) {
    let line = record.to_string();
    match record.severity {
        Severity::Fatal | Severity::Error => tracing::error!(target: "history_link::library", "{line}"),
        Severity::Warn => tracing::warn!(target: "history_link::library", "{line}"),
        Severity::Info => tracing::info!(target: "history_link::library", "{line}"),
        Severity::Debug => tracing::debug!(target: "history_link::library", "{line}"),
        Severity::Trace => tracing::trace!(target: "history_link::library", "{line}"),
        Severity::Off => {}
    }
}

// =============================================================================
// Tests
// =============================================================================
