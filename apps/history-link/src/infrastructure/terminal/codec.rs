//! Gateway Codec
//!
//! Text frames to domain events and client frames to text.

use crate::domain::element::Element;
use crate::domain::event::{Event, Message};
use crate::infrastructure::terminal::messages::{ClientFrame, WireEvent, WireMessage};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON with the wrong shape.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the gateway protocol.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one event frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not an event object or a message
    /// element is not a JSON object.
    pub fn decode(&self, text: &str) -> Result<Event, CodecError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}...",
                trimmed.chars().take(50).collect::<String>()
            )));
        }

        let wire: WireEvent = serde_json::from_str(trimmed)?;
        let messages = wire
            .messages
            .into_iter()
            .map(Self::decode_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Event::new(wire.event_type, messages))
    }

    fn decode_message(wire: WireMessage) -> Result<Message, CodecError> {
        match &wire.element {
            serde_json::Value::Null => Ok(Message::new(
                wire.message_type,
                wire.correlation_ids,
                vec![],
            )),
            serde_json::Value::Object(_) => {
                let element = Element::from_json(wire.message_type.clone(), &wire.element);
                Ok(Message::with_element(
                    wire.message_type,
                    wire.correlation_ids,
                    element,
                ))
            }
            _ => Err(CodecError::InvalidFormat(format!(
                "element of {} must be an object",
                wire.message_type
            ))),
        }
    }

    /// Encode one client frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self, frame: &ClientFrame<'_>) -> Result<String, CodecError> {
        Ok(serde_json::to_string(frame)?)
    }
}
