//! Terminal Session
//!
//! A single-use WebSocket session to the terminal gateway.
//!
//! # Lifecycle
//!
//! 1. `start`: connect, then wait for `SessionStarted` / `SessionStartupFailure`
//! 2. `open_service`: send `openService`, wait for `ServiceOpened` /
//!    `ServiceOpenFailure` carrying the same correlation id
//! 3. `send_request`: send `sendRequest`; a failed write is queued as a
//!    `RequestFailure` event instead of being returned
//! 4. `next_event`: queued events first, then the socket
//! 5. `stop`: close the socket
//!
//! Events that arrive during a handshake wait are queued and delivered by
//! `next_event` in arrival order.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{SessionError, SessionPort};
use crate::domain::event::{CorrelationId, Event, EventType, Message, names};
use crate::domain::request::HistoryRequest;
use crate::domain::session::SessionState;
use crate::infrastructure::config::BridgeConfig;
use crate::infrastructure::logging::{self, Severity};
use crate::infrastructure::terminal::codec::JsonCodec;
use crate::infrastructure::terminal::messages::ClientFrame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Log category for library records from this adapter.
const LOG_CATEGORY: &str = "history_link.session";

/// Upper bound on sending the close frame during shutdown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a terminal session.
#[derive(Debug, Clone)]
pub struct TerminalSessionConfig {
    /// Gateway WebSocket URL.
    pub url: String,
    /// Connect timeout (`None` = no limit).
    pub connect_timeout: Option<Duration>,
}

impl TerminalSessionConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: None,
        }
    }
}

impl From<&BridgeConfig> for TerminalSessionConfig {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            url: config.url(),
            connect_timeout: config.session.connect_timeout,
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// WebSocket implementation of [`SessionPort`].
pub struct TerminalSession {
    config: TerminalSessionConfig,
    codec: JsonCodec,
    stream: Option<WsStream>,
    pending: VecDeque<Event>,
    state: SessionState,
    service: Option<String>,
    next_correlation_id: CorrelationId,
    cancel: CancellationToken,
}

impl TerminalSession {
    /// Create an unstarted session. Cancelling `cancel` aborts any wait.
    #[must_use]
    pub fn new(config: TerminalSessionConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            stream: None,
            pending: VecDeque::new(),
            state: SessionState::Unstarted,
            service: None,
            next_correlation_id: 1,
            cancel,
        }
    }

    fn allocate_correlation_id(&mut self) -> CorrelationId {
        let id = self.next_correlation_id;
        self.next_correlation_id += 1;
        id
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    async fn connect(&self) -> Result<WsStream, SessionError> {
        let connect = async {
            let connected = match self.config.connect_timeout {
                Some(limit) => tokio::time::timeout(
                    limit,
                    tokio_tungstenite::connect_async(self.config.url.as_str()),
                )
                .await
                .map_err(|_| SessionError::ConnectTimeout)?,
                None => tokio_tungstenite::connect_async(self.config.url.as_str()).await,
            };
            connected.map_err(|e| SessionError::ConnectionFailed(e.to_string()))
        };

        let (stream, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Err(SessionError::Cancelled),
            result = connect => result?,
        };
        Ok(stream)
    }

    async fn write_frame(&mut self, frame: &ClientFrame<'_>) -> Result<(), SessionError> {
        let text = self
            .codec
            .encode(frame)
            .map_err(|e| SessionError::Codec(e.to_string()))?;
        logging::emit(Severity::Trace, LOG_CATEGORY, format_args!("Sending frame {text}"));

        let stream = self.stream.as_mut().ok_or(SessionError::NotConnected)?;
        stream
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))
    }

    /// Read the next event off the socket. `None` means the gateway closed.
    async fn read_event(&mut self) -> Result<Option<Event>, SessionError> {
        let stream = self.stream.as_mut().ok_or(SessionError::NotConnected)?;

        loop {
            let frame = tokio::select! {
                () = self.cancel.cancelled() => return Err(SessionError::Cancelled),
                frame = stream.next() => frame,
            };

            match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    logging::emit(
                        Severity::Trace,
                        LOG_CATEGORY,
                        format_args!("Received frame {}", text.as_str()),
                    );
                    return self
                        .codec
                        .decode(text.as_str())
                        .map(Some)
                        .map_err(|e| SessionError::Codec(e.to_string()));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!(?frame, "Gateway closed the connection");
                    return Ok(None);
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    tracing::warn!(len = data.len(), "Ignoring binary frame");
                }
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(
                    tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                ))
                | None => return Ok(None),
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
            }
        }
    }

    /// Read until `accept` picks a message, queueing every other event.
    async fn await_status<F>(&mut self, mut accept: F) -> Result<Message, SessionError>
    where
        F: FnMut(EventType, &Message) -> bool + Send,
    {
        loop {
            let Some(event) = self.read_event().await? else {
                return Err(SessionError::ConnectionClosed);
            };

            let event_type = event.event_type();
            if let Some(found) = event
                .messages()
                .iter()
                .find(|m| accept(event_type, m))
                .cloned()
            {
                return Ok(found);
            }

            tracing::trace!(event_type = event_type.as_str(), "Queueing event");
            self.pending.push_back(event);
        }
    }
}

/// Best human-readable reason carried by a status message.
fn reason_text(message: &Message) -> String {
    let reason = message.get_element(names::REASON);
    reason
        .and_then(|r| r.get_as_string(names::DESCRIPTION))
        .or_else(|| reason.and_then(|r| r.get_as_string(names::MESSAGE)))
        .or_else(|| reason.and_then(|r| r.get_as_string(names::CATEGORY)))
        .unwrap_or_else(|| message.message_type().to_string())
}

#[async_trait]
impl SessionPort for TerminalSession {
    async fn start(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Unstarted)?;

        logging::emit(
            Severity::Info,
            LOG_CATEGORY,
            format_args!("Connecting to {}", self.config.url),
        );
        tracing::debug!(url = %self.config.url, "Connecting to gateway");

        let stream = self.connect().await?;
        self.stream = Some(stream);

        let message = self
            .await_status(|event_type, m| {
                event_type == EventType::SessionStatus
                    && (m.message_type() == names::SESSION_STARTED
                        || m.message_type() == names::SESSION_STARTUP_FAILURE)
            })
            .await?;

        if message.message_type() == names::SESSION_STARTED {
            self.state = SessionState::Started;
            logging::emit(Severity::Info, LOG_CATEGORY, "Session started");
            Ok(())
        } else {
            let reason = reason_text(&message);
            logging::emit(
                Severity::Error,
                LOG_CATEGORY,
                format_args!("Session startup failed: {reason}"),
            );
            Err(SessionError::StartupFailed(reason))
        }
    }

    async fn open_service(&mut self, service: &str) -> Result<(), SessionError> {
        self.expect_state(SessionState::Started)?;

        let correlation_id = self.allocate_correlation_id();
        self.write_frame(&ClientFrame::OpenService {
            service,
            correlation_id,
        })
        .await?;

        let message = self
            .await_status(|event_type, m| {
                event_type == EventType::ServiceStatus
                    && (m.correlation_ids().is_empty() || m.correlates(correlation_id))
                    && (m.message_type() == names::SERVICE_OPENED
                        || m.message_type() == names::SERVICE_OPEN_FAILURE)
            })
            .await?;

        if message.message_type() == names::SERVICE_OPENED {
            self.state = SessionState::ServiceOpen;
            self.service = Some(service.to_string());
            logging::emit(
                Severity::Info,
                LOG_CATEGORY,
                format_args!("Service {service} opened"),
            );
            Ok(())
        } else {
            let reason = reason_text(&message);
            logging::emit(
                Severity::Error,
                LOG_CATEGORY,
                format_args!("Failed to open {service}: {reason}"),
            );
            Err(SessionError::ServiceOpenFailed {
                service: service.to_string(),
                reason,
            })
        }
    }

    async fn send_request(&mut self, request: &HistoryRequest) {
        let correlation_id = self.allocate_correlation_id();

        let outcome = match (self.state.can_send(), self.service.clone()) {
            (true, Some(service)) => {
                self.write_frame(&ClientFrame::SendRequest {
                    service: &service,
                    operation: request.operation(),
                    correlation_id,
                    request,
                })
                .await
            }
            _ => Err(SessionError::InvalidState {
                expected: SessionState::ServiceOpen,
                actual: self.state,
            }),
        };

        match outcome {
            Ok(()) => {
                self.state = SessionState::RequestSent;
                logging::emit(
                    Severity::Debug,
                    LOG_CATEGORY,
                    format_args!("Request {correlation_id} sent"),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, correlation_id, "Request could not be sent");
                self.pending
                    .push_back(Event::request_failure(correlation_id, &e.to_string()));
            }
        }
    }

    async fn next_event(&mut self) -> Result<Event, SessionError> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        match self.read_event().await? {
            Some(event) => Ok(event),
            None => {
                self.stream = None;
                self.state = SessionState::Terminated;
                logging::emit(Severity::Warn, LOG_CATEGORY, "Connection closed by gateway");
                Ok(Event::session_terminated("connection closed by gateway"))
            }
        }
    }

    async fn shutdown(&mut self) {
        self.state = SessionState::Terminated;
        self.pending.clear();

        let Some(mut stream) = self.stream.take() else {
            return;
        };
        logging::emit(Severity::Info, LOG_CATEGORY, "Stopping session");

        match tokio::time::timeout(CLOSE_TIMEOUT, stream.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Close handshake failed"),
            Err(_) => tracing::debug!("Close handshake timed out"),
        }
    }

    fn stop(&mut self) {
        self.state = SessionState::Terminated;
        self.pending.clear();

        let Some(mut stream) = self.stream.take() else {
            return;
        };
        logging::emit(Severity::Info, LOG_CATEGORY, "Stopping session");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = stream.close(None).await {
                        tracing::debug!(error = %e, "Close handshake failed");
                    }
                });
            }
            Err(_) => drop(stream),
        }
    }

    fn state(&self) -> SessionState {
        self.state
    }
}
