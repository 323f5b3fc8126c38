//! Response Collector
//!
//! Pulls events from a session until a terminal one arrives. Two states:
//! `Waiting` and `Done`. The collector moves to `Done` only on
//!
//! - a final `RESPONSE` event (success),
//! - any `REQUEST_STATUS` message (request failed),
//! - a `SESSION_STATUS` message of type `SessionTerminated` or
//!   `SessionStartupFailure`.
//!
//! Partial responses are formatted and appended as they arrive; everything
//! else is ignored. Failure text is appended to whatever was already
//! collected, so the caller always gets the partial output back.

use crate::application::ports::{SessionError, SessionPort};
use crate::domain::event::{Event, EventType, names};
use crate::domain::response::{FormatError, format_event};

/// Collector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectorState {
    /// Still expecting events.
    #[default]
    Waiting,
    /// A terminal event was seen.
    Done,
}

/// Library-level faults that abort collection.
#[derive(Debug, thiserror::Error)]
pub enum CollectorFault {
    /// The session failed while waiting for events.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// A response tree could not be formatted.
    #[error("{0}")]
    Format(#[from] FormatError),
}

/// Accumulates the host text for one request.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    debug: i32,
    state: CollectorState,
    output: String,
}

impl ResponseCollector {
    /// Create a collector. `debug > 0` adds progress lines to the output.
    #[must_use]
    pub fn new(debug: i32) -> Self {
        Self {
            debug,
            ..Self::default()
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CollectorState {
        self.state
    }

    /// Text collected so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Apply one event and return the resulting state.
    ///
    /// # Errors
    ///
    /// Returns an error if a response event cannot be formatted.
    pub fn handle_event(&mut self, event: &Event) -> Result<CollectorState, FormatError> {
        match event.event_type() {
            EventType::PartialResponse => {
                if self.debug > 0 {
                    self.output.push_str("Processing Partial Response\n");
                }
                let text = format_event(event)?;
                self.output.push_str(&text);
            }
            EventType::Response => {
                if self.debug > 0 {
                    self.output.push_str("Processing Response\n");
                }
                let text = format_event(event)?;
                self.output.push_str(&text);
                self.state = CollectorState::Done;
            }
            EventType::RequestStatus => {
                for message in event.messages() {
                    let reason = message
                        .get_element(names::REASON)
                        .unwrap_or_else(|| message.as_element());
                    tracing::warn!(message_type = message.message_type(), "Request failed");
                    self.output.push_str(&format!("REQUEST FAILED: {reason}\n"));
                    self.state = CollectorState::Done;
                }
            }
            EventType::SessionStatus => {
                for message in event.messages() {
                    if message.message_type() == names::SESSION_TERMINATED
                        || message.message_type() == names::SESSION_STARTUP_FAILURE
                    {
                        tracing::warn!(message_type = message.message_type(), "Session ended");
                        self.output.push_str("session terminated");
                        self.state = CollectorState::Done;
                    }
                }
            }
            other => {
                tracing::trace!(event_type = other.as_str(), "Ignoring event");
            }
        }

        Ok(self.state)
    }

    /// Pull events from `session` until done.
    ///
    /// # Errors
    ///
    /// Returns an error if the session fails or a response cannot be
    /// formatted. Text collected before the fault stays in the collector.
    pub async fn run<S>(&mut self, session: &mut S) -> Result<(), CollectorFault>
    where
        S: SessionPort + ?Sized,
    {
        while self.state == CollectorState::Waiting {
            let event = session.next_event().await?;
            tracing::debug!(
                event_type = event.event_type().as_str(),
                messages = event.messages().len(),
                "Event received"
            );
            self.handle_event(&event)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::application::ports::MockSessionPort;
    use crate::domain::element::Element;
    use crate::domain::event::Message;
    use serde_json::json;

    fn rows_event(event_type: EventType, rows: &serde_json::Value) -> Event {
        let element = Element::from_json(
            "HistoricalDataResponse",
            &json!({
                "securityData": {
                    "security": "IBM US Equity",
                    "sequenceNumber": 0,
                    "fieldData": rows
                }
            }),
        );
        Event::new(
            event_type,
            vec![Message::with_element("HistoricalDataResponse", vec![1], element)],
        )
    }

    fn scripted(events: Vec<Result<Event, SessionError>>) -> MockSessionPort {
        let mut queue: VecDeque<_> = events.into();
        let mut session = MockSessionPort::new();
        session
            .expect_next_event()
            .returning(move || queue.pop_front().unwrap_or(Err(SessionError::ConnectionClosed)));
        session
    }

    #[tokio::test]
    async fn partial_then_final_response() {
        let mut session = scripted(vec![
            Ok(rows_event(EventType::PartialResponse, &json!([{"date": "a", "v": 1}]))),
            Ok(rows_event(EventType::Response, &json!([{"date": "b", "v": 2}]))),
        ]);
        let mut collector = ResponseCollector::new(0);

        collector.run(&mut session).await.unwrap();

        assert_eq!(collector.state(), CollectorState::Done);
        assert_eq!(collector.output(), "{{\"a\", 1}}{{\"b\", 2}}");
    }

    #[tokio::test]
    async fn debug_adds_progress_lines() {
        let mut session = scripted(vec![
            Ok(rows_event(EventType::PartialResponse, &json!([]))),
            Ok(rows_event(EventType::Response, &json!([]))),
        ]);
        let mut collector = ResponseCollector::new(1);

        collector.run(&mut session).await.unwrap();

        assert_eq!(
            collector.output(),
            "Processing Partial Response\n{}Processing Response\n{}"
        );
    }

    #[tokio::test]
    async fn request_failure_keeps_partial_output() {
        let failure = Event::new(
            EventType::RequestStatus,
            vec![Message::new(
                names::REQUEST_FAILURE,
                vec![1],
                vec![Element::composite(
                    names::REASON,
                    vec![Element::scalar(names::CATEGORY, "TIMEOUT")],
                )],
            )],
        );
        let mut session = scripted(vec![
            Ok(rows_event(EventType::PartialResponse, &json!([{"date": "a", "v": 1}]))),
            Ok(failure),
        ]);
        let mut collector = ResponseCollector::new(0);

        collector.run(&mut session).await.unwrap();

        assert_eq!(
            collector.output(),
            "{{\"a\", 1}}REQUEST FAILED: reason = {\n    category = \"TIMEOUT\"\n}\n\n"
        );
    }

    #[tokio::test]
    async fn session_terminated_ends_loop() {
        let mut session = scripted(vec![Ok(Event::session_terminated("gone"))]);
        let mut collector = ResponseCollector::new(0);

        collector.run(&mut session).await.unwrap();

        assert_eq!(collector.output(), "session terminated");
    }

    #[tokio::test]
    async fn unrelated_events_are_ignored() {
        let mut session = scripted(vec![
            Ok(Event::new(
                EventType::SessionStatus,
                vec![Message::new(names::SESSION_STARTED, vec![], vec![])],
            )),
            Ok(Event::new(
                EventType::ServiceStatus,
                vec![Message::new(names::SERVICE_OPENED, vec![], vec![])],
            )),
            Ok(Event::new(EventType::Admin, vec![])),
            Ok(Event::new(EventType::Unknown, vec![])),
            Ok(rows_event(EventType::Response, &json!([]))),
        ]);
        let mut collector = ResponseCollector::new(0);

        collector.run(&mut session).await.unwrap();

        assert_eq!(collector.output(), "{}");
    }

    #[tokio::test]
    async fn session_error_propagates_with_partial_text() {
        let mut session = scripted(vec![
            Ok(rows_event(EventType::PartialResponse, &json!([{"date": "a", "v": 1}]))),
            Err(SessionError::Transport("reset".to_string())),
        ]);
        let mut collector = ResponseCollector::new(0);

        let err = collector.run(&mut session).await.unwrap_err();

        assert!(matches!(err, CollectorFault::Session(SessionError::Transport(_))));
        assert_eq!(collector.output(), "{{\"a\", 1}}");
        assert_eq!(collector.state(), CollectorState::Waiting);
    }

    #[test]
    fn malformed_response_is_a_format_fault() {
        let mut collector = ResponseCollector::new(0);
        let event = Event::new(
            EventType::Response,
            vec![Message::new(
                "HistoricalDataResponse",
                vec![1],
                vec![Element::scalar("unexpected", 1_i64)],
            )],
        );

        let err = collector.handle_event(&event).unwrap_err();

        assert!(matches!(err, FormatError::MissingElement { .. }));
    }

    #[test]
    fn request_status_without_reason_prints_message() {
        let mut collector = ResponseCollector::new(0);
        let event = Event::new(
            EventType::RequestStatus,
            vec![Message::new(names::REQUEST_FAILURE, vec![1], vec![])],
        );

        let state = collector.handle_event(&event).unwrap();

        assert_eq!(state, CollectorState::Done);
        assert_eq!(
            collector.output(),
            "REQUEST FAILED: RequestFailure = {\n}\n\n"
        );
    }
}
