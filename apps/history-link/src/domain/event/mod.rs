//! Session Events
//!
//! Events are the unit of delivery from a terminal session: an event type
//! plus an ordered batch of messages, each message wrapping an element tree.
//!
//! Only a handful of event types matter to the bridge (responses, request
//! status and session status); the rest are carried so they can be
//! recognised and skipped.

use serde::{Deserialize, Serialize};

use crate::domain::element::Element;

/// Correlates requests with the events they produce.
pub type CorrelationId = u64;

/// Well-known element and message type names.
pub mod names {
    /// Per-security block in a historical data response.
    pub const SECURITY_DATA: &str = "securityData";
    /// Security identifier inside `securityData`.
    pub const SECURITY: &str = "security";
    /// Observation array inside `securityData`.
    pub const FIELD_DATA: &str = "fieldData";
    /// Request-level error.
    pub const RESPONSE_ERROR: &str = "responseError";
    /// Security-level error.
    pub const SECURITY_ERROR: &str = "securityError";
    /// Field-level errors.
    pub const FIELD_EXCEPTIONS: &str = "fieldExceptions";
    /// Field identifier inside a field exception.
    pub const FIELD_ID: &str = "fieldId";
    /// Error details inside a field exception.
    pub const ERROR_INFO: &str = "errorInfo";
    /// Error category.
    pub const CATEGORY: &str = "category";
    /// Error subcategory.
    pub const SUBCATEGORY: &str = "subcategory";
    /// Error text.
    pub const MESSAGE: &str = "message";
    /// Failure reason inside a request status message.
    pub const REASON: &str = "reason";
    /// Error source inside a reason.
    pub const SOURCE: &str = "source";
    /// Numeric error code inside a reason.
    pub const ERROR_CODE: &str = "errorCode";
    /// Free-text description inside a reason.
    pub const DESCRIPTION: &str = "description";

    /// Session came up.
    pub const SESSION_STARTED: &str = "SessionStarted";
    /// Session could not be established.
    pub const SESSION_STARTUP_FAILURE: &str = "SessionStartupFailure";
    /// Session went away.
    pub const SESSION_TERMINATED: &str = "SessionTerminated";
    /// Service open succeeded.
    pub const SERVICE_OPENED: &str = "ServiceOpened";
    /// Service open failed.
    pub const SERVICE_OPEN_FAILURE: &str = "ServiceOpenFailure";
    /// Request was rejected or lost.
    pub const REQUEST_FAILURE: &str = "RequestFailure";
}

// =============================================================================
// Event Type
// =============================================================================

/// Category of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Administrative notice.
    Admin,
    /// Session state change.
    SessionStatus,
    /// Subscription state change.
    SubscriptionStatus,
    /// Status of an outstanding request (failures).
    RequestStatus,
    /// Final response to a request.
    Response,
    /// Non-final response to a request.
    PartialResponse,
    /// Subscription data tick.
    SubscriptionData,
    /// Service state change.
    ServiceStatus,
    /// Wait timed out.
    Timeout,
    /// Authorization state change.
    AuthorizationStatus,
    /// Resolution state change.
    ResolutionStatus,
    /// Topic state change.
    TopicStatus,
    /// Token state change.
    TokenStatus,
    /// Inbound request.
    Request,
    /// Anything not recognised.
    #[serde(other)]
    Unknown,
}

impl EventType {
    /// Wire name of the event type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::SessionStatus => "SESSION_STATUS",
            Self::SubscriptionStatus => "SUBSCRIPTION_STATUS",
            Self::RequestStatus => "REQUEST_STATUS",
            Self::Response => "RESPONSE",
            Self::PartialResponse => "PARTIAL_RESPONSE",
            Self::SubscriptionData => "SUBSCRIPTION_DATA",
            Self::ServiceStatus => "SERVICE_STATUS",
            Self::Timeout => "TIMEOUT",
            Self::AuthorizationStatus => "AUTHORIZATION_STATUS",
            Self::ResolutionStatus => "RESOLUTION_STATUS",
            Self::TopicStatus => "TOPIC_STATUS",
            Self::TokenStatus => "TOKEN_STATUS",
            Self::Request => "REQUEST",
            Self::Unknown => "UNKNOWN",
        }
    }
}

// =============================================================================
// Message / Event
// =============================================================================

/// One message inside an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    message_type: String,
    correlation_ids: Vec<CorrelationId>,
    element: Element,
}

impl Message {
    /// Create a message. The root element is named after the message type.
    #[must_use]
    pub fn new(
        message_type: impl Into<String>,
        correlation_ids: Vec<CorrelationId>,
        children: Vec<Element>,
    ) -> Self {
        let message_type = message_type.into();
        let element = Element::composite(message_type.clone(), children);
        Self {
            message_type,
            correlation_ids,
            element,
        }
    }

    /// Create a message around an existing root element.
    #[must_use]
    pub fn with_element(
        message_type: impl Into<String>,
        correlation_ids: Vec<CorrelationId>,
        element: Element,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            correlation_ids,
            element,
        }
    }

    /// Message type name (e.g. `HistoricalDataResponse`).
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Correlation ids this message answers.
    #[must_use]
    pub fn correlation_ids(&self) -> &[CorrelationId] {
        &self.correlation_ids
    }

    /// Check if the message answers `id`.
    #[must_use]
    pub fn correlates(&self, id: CorrelationId) -> bool {
        self.correlation_ids.contains(&id)
    }

    /// Root element of the message.
    #[must_use]
    pub const fn as_element(&self) -> &Element {
        &self.element
    }

    /// Child of the root element named `name`.
    #[must_use]
    pub fn get_element(&self, name: &str) -> Option<&Element> {
        self.element.get(name)
    }
}

/// An inbound event: a type and its messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    event_type: EventType,
    messages: Vec<Message>,
}

impl Event {
    /// Create an event.
    #[must_use]
    pub const fn new(event_type: EventType, messages: Vec<Message>) -> Self {
        Self {
            event_type,
            messages,
        }
    }

    /// Event type.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Messages in delivery order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Check if any message has type `message_type`.
    #[must_use]
    pub fn has_message_type(&self, message_type: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.message_type() == message_type)
    }

    /// Synthetic `SESSION_STATUS` event reporting that the session ended.
    #[must_use]
    pub fn session_terminated(description: &str) -> Self {
        Self::new(
            EventType::SessionStatus,
            vec![Message::new(
                names::SESSION_TERMINATED,
                vec![],
                vec![Element::composite(
                    names::REASON,
                    vec![
                        Element::scalar(names::SOURCE, "Session"),
                        Element::scalar(names::CATEGORY, "IO_ERROR"),
                        Element::scalar(names::DESCRIPTION, description),
                    ],
                )],
            )],
        )
    }

    /// Synthetic `REQUEST_STATUS` event reporting a lost request.
    #[must_use]
    pub fn request_failure(correlation_id: CorrelationId, description: &str) -> Self {
        Self::new(
            EventType::RequestStatus,
            vec![Message::new(
                names::REQUEST_FAILURE,
                vec![correlation_id],
                vec![Element::composite(
                    names::REASON,
                    vec![
                        Element::scalar(names::SOURCE, "Session"),
                        Element::scalar(names::ERROR_CODE, -1_i64),
                        Element::scalar(names::CATEGORY, "IO_ERROR"),
                        Element::scalar(names::DESCRIPTION, description),
                    ],
                )],
            )],
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("\"PARTIAL_RESPONSE\"", EventType::PartialResponse ; "partial response")]
    #[test_case("\"RESPONSE\"", EventType::Response ; "response")]
    #[test_case("\"REQUEST_STATUS\"", EventType::RequestStatus ; "request status")]
    #[test_case("\"SESSION_STATUS\"", EventType::SessionStatus ; "session status")]
    #[test_case("\"SOMETHING_NEW\"", EventType::Unknown ; "unknown")]
    fn event_type_wire_names(json: &str, expected: EventType) {
        let parsed: EventType = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn event_type_as_str_matches_serde() {
        let json = serde_json::to_string(&EventType::ServiceStatus).unwrap();
        assert_eq!(json, format!("\"{}\"", EventType::ServiceStatus.as_str()));
    }

    #[test]
    fn message_root_element_named_after_type() {
        let msg = Message::new("HistoricalDataResponse", vec![3], vec![]);

        assert_eq!(msg.as_element().name(), "HistoricalDataResponse");
        assert!(msg.correlates(3));
        assert!(!msg.correlates(4));
    }

    #[test]
    fn synthetic_session_terminated() {
        let event = Event::session_terminated("connection closed");

        assert_eq!(event.event_type(), EventType::SessionStatus);
        assert!(event.has_message_type(names::SESSION_TERMINATED));
        let reason = event.messages()[0].get_element(names::REASON).unwrap();
        assert_eq!(
            reason.get_as_string(names::DESCRIPTION).as_deref(),
            Some("connection closed")
        );
    }

    #[test]
    fn synthetic_request_failure_correlates() {
        let event = Event::request_failure(9, "broken pipe");

        assert_eq!(event.event_type(), EventType::RequestStatus);
        assert!(event.messages()[0].correlates(9));
        assert!(event.has_message_type(names::REQUEST_FAILURE));
    }
}
