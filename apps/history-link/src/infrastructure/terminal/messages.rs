//! Gateway Wire Messages
//!
//! Frames exchanged with the terminal gateway. Every frame is one JSON
//! object in a WebSocket text frame.

use serde::{Deserialize, Serialize};

use crate::domain::event::{CorrelationId, EventType};
use crate::domain::request::HistoryRequest;

// =============================================================================
// Client -> Gateway
// =============================================================================

/// Frames sent to the gateway, tagged by `op`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClientFrame<'a> {
    /// Open a service.
    OpenService {
        /// Service name.
        service: &'a str,
        /// Id echoed on the `ServiceOpened` / `ServiceOpenFailure` reply.
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
    },
    /// Send a request on an open service.
    SendRequest {
        /// Service name.
        service: &'a str,
        /// Operation name.
        operation: &'a str,
        /// Id echoed on every reply to this request.
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
        /// Request payload.
        request: &'a HistoryRequest,
    },
}

// =============================================================================
// Gateway -> Client
// =============================================================================

/// One inbound event frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    /// Event category.
    pub event_type: EventType,
    /// Messages in delivery order.
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

/// One message inside an inbound event frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Message type name.
    pub message_type: String,
    /// Correlation ids this message answers.
    #[serde(default)]
    pub correlation_ids: Vec<CorrelationId>,
    /// Root element as a JSON object. Absent or `null` means no sub-elements.
    #[serde(default)]
    pub element: serde_json::Value,
}
