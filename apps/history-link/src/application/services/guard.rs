//! Scoped Session Release
//!
//! Owns a session for the length of one host call and releases it exactly
//! once. The bridge awaits `shutdown` on its normal exit; the drop covers
//! early returns and panics.

use std::ops::{Deref, DerefMut};

use crate::application::ports::SessionPort;

/// Drop guard around a session.
pub struct SessionGuard<S: SessionPort> {
    session: S,
    stopped: bool,
}

impl<S: SessionPort> SessionGuard<S> {
    /// Take ownership of a session.
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self {
            session,
            stopped: false,
        }
    }

    /// Stop now instead of at drop. Later calls and the drop are no-ops.
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.session.stop();
        }
    }

    /// Shut down and wait for the close. Later calls and the drop are no-ops.
    pub async fn shutdown(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.session.shutdown().await;
        }
    }
}

impl<S: SessionPort> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl<S: SessionPort> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl<S: SessionPort> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockSessionPort;

    #[test]
    fn drop_stops_once() {
        let mut session = MockSessionPort::new();
        session.expect_stop().times(1).return_const(());

        let guard = SessionGuard::new(session);
        drop(guard);
    }

    #[test]
    fn explicit_stop_then_drop_stops_once() {
        let mut session = MockSessionPort::new();
        session.expect_stop().times(1).return_const(());

        let mut guard = SessionGuard::new(session);
        guard.stop();
        guard.stop();
    }

    #[tokio::test]
    async fn shutdown_replaces_the_drop_stop() {
        let mut session = MockSessionPort::new();
        session.expect_shutdown().times(1).return_const(());
        session.expect_stop().times(0);

        let mut guard = SessionGuard::new(session);
        guard.shutdown().await;
        guard.shutdown().await;
        guard.stop();
    }

    #[test]
    fn stops_during_unwind() {
        let mut session = MockSessionPort::new();
        session.expect_stop().times(1).return_const(());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = SessionGuard::new(session);
            panic!("boom");
        }));

        assert!(result.is_err());
    }
}
