//! Gateway Session Integration Tests
//!
//! Runs real host calls against an in-process WebSocket gateway that plays
//! the session/service handshake and scripted responses.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use history_link::{BridgeConfig, HistoryArgs, HistoryLink};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// =============================================================================
// Test Gateway
// =============================================================================

type Responder = Arc<dyn Fn(u64) -> Vec<Value> + Send + Sync>;

#[derive(Clone)]
struct Script {
    startup_ok: bool,
    service_ok: bool,
    before_start: Vec<Value>,
    respond: Responder,
}

impl Script {
    fn respond(respond: impl Fn(u64) -> Vec<Value> + Send + Sync + 'static) -> Self {
        Self {
            startup_ok: true,
            service_ok: true,
            before_start: vec![],
            respond: Arc::new(respond),
        }
    }
}

struct Gateway {
    port: u16,
    frames: Arc<Mutex<Vec<Value>>>,
}

impl Gateway {
    async fn spawn(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let frames = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&frames);
        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let script = script.clone();
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let Ok(ws) = accept_async(tcp).await else {
                        return;
                    };
                    serve_connection(ws, script, recorded).await;
                });
            }
        });

        Self { port, frames }
    }

    fn link(&self) -> HistoryLink {
        HistoryLink::new(
            BridgeConfig::default().with_endpoint(Some("127.0.0.1".to_string()), Some(self.port)),
        )
    }

    async fn saw_close(&self) -> bool {
        for _ in 0..100 {
            if self.frames.lock().iter().any(|f| f["op"] == "close") {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        false
    }

    fn sent_requests(&self) -> Vec<Value> {
        self.frames
            .lock()
            .iter()
            .filter(|f| f["op"] == "sendRequest")
            .cloned()
            .collect()
    }
}

async fn serve_connection<S>(
    mut ws: tokio_tungstenite::WebSocketStream<S>,
    script: Script,
    recorded: Arc<Mutex<Vec<Value>>>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    for event in &script.before_start {
        if ws.send(Message::Text(event.to_string().into())).await.is_err() {
            return;
        }
    }

    let startup = if script.startup_ok {
        "SessionStarted"
    } else {
        "SessionStartupFailure"
    };
    let hello = json!({
        "eventType": "SESSION_STATUS",
        "messages": [{
            "messageType": startup,
            "element": {"reason": {"description": "no entitlement"}}
        }]
    });
    if ws.send(Message::Text(hello.to_string().into())).await.is_err() || !script.startup_ok {
        return;
    }

    while let Some(Ok(message)) = ws.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => {
                recorded.lock().push(json!({"op": "close"}));
                continue;
            }
            _ => continue,
        };
        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
        recorded.lock().push(frame.clone());
        let cid = frame["correlationId"].as_u64().unwrap_or_default();

        let replies = match frame["op"].as_str() {
            Some("openService") => {
                let kind = if script.service_ok {
                    "ServiceOpened"
                } else {
                    "ServiceOpenFailure"
                };
                vec![json!({
                    "eventType": "SERVICE_STATUS",
                    "messages": [{"messageType": kind, "correlationIds": [cid]}]
                })]
            }
            Some("sendRequest") => (script.respond)(cid),
            _ => vec![],
        };

        for reply in replies {
            if reply.is_null() {
                let _ = ws.close(None).await;
                return;
            }
            if ws.send(Message::Text(reply.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

fn history_event(event_type: &str, cid: u64, rows: &Value) -> Value {
    json!({
        "eventType": event_type,
        "messages": [{
            "messageType": "HistoricalDataResponse",
            "correlationIds": [cid],
            "element": {
                "securityData": {
                    "security": "IBM US Equity",
                    "sequenceNumber": 0,
                    "fieldData": rows
                }
            }
        }]
    })
}

fn ibm_jan_2016() -> HistoryArgs {
    HistoryArgs::new("IBM US Equity", "PX_LAST", "20160104", "20160105")
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn partial_and_final_responses_are_concatenated() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![
            history_event(
                "PARTIAL_RESPONSE",
                cid,
                &json!([{"date": "2016-01-04", "PX_LAST": 135.95}]),
            ),
            history_event(
                "RESPONSE",
                cid,
                &json!([{"date": "2016-01-05", "PX_LAST": 135.85}]),
            ),
        ]
    }))
    .await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(
        out,
        "{{\"2016-01-04\", 135.95}}{{\"2016-01-05\", 135.85}}"
    );

    let requests = gateway.sent_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["service"], "//blp/refdata");
    assert_eq!(requests[0]["operation"], "HistoricalDataRequest");
    assert_eq!(requests[0]["request"]["startDate"], "20160104");
    assert_eq!(requests[0]["request"]["periodicitySelection"], "DAILY");
    assert!(gateway.saw_close().await, "session closed without a close frame");
}

#[tokio::test]
async fn multiple_rows_are_comma_separated() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![history_event(
            "RESPONSE",
            cid,
            &json!([
                {"date": "2016-01-04", "PX_LAST": 135.95},
                {"date": "2016-01-05", "PX_LAST": 135.85},
                {"date": "2016-01-06", "PX_LAST": 135.17}
            ]),
        )]
    }))
    .await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(
        out,
        "{{\"2016-01-04\", 135.95},{\"2016-01-05\", 135.85},{\"2016-01-06\", 135.17}}"
    );
}

#[tokio::test]
async fn events_before_session_start_are_not_lost() {
    let mut script = Script::respond(|cid| vec![history_event("RESPONSE", cid, &json!([]))]);
    script.before_start = vec![json!({
        "eventType": "ADMIN",
        "messages": [{"messageType": "SlowConsumerWarning"}]
    })];
    let gateway = Gateway::spawn(script).await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(out, "{}");
}

#[tokio::test]
async fn debug_adds_connect_and_progress_lines() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![
            history_event("PARTIAL_RESPONSE", cid, &json!([])),
            history_event("RESPONSE", cid, &json!([])),
        ]
    }))
    .await;

    let out = gateway.link().call(&ibm_jan_2016().with_debug(1)).await;

    assert_eq!(
        out,
        format!(
            "Connecting to 127.0.0.1:{}\nProcessing Partial Response\n{{}}Processing Response\n{{}}",
            gateway.port
        )
    );
}

#[tokio::test]
async fn request_failure_is_reported() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![json!({
            "eventType": "REQUEST_STATUS",
            "messages": [{
                "messageType": "RequestFailure",
                "correlationIds": [cid],
                "element": {
                    "reason": {
                        "source": "bbdbh1",
                        "errorCode": 1,
                        "category": "BAD_SEC",
                        "message": "Unknown/Invalid security"
                    }
                }
            }]
        })]
    }))
    .await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(
        out,
        "REQUEST FAILED: reason = {\n    source = \"bbdbh1\"\n    errorCode = 1\n    \
         category = \"BAD_SEC\"\n    message = \"Unknown/Invalid security\"\n}\n\n"
    );
}

#[tokio::test]
async fn gateway_hangup_terminates_session() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![
            history_event(
                "PARTIAL_RESPONSE",
                cid,
                &json!([{"date": "2016-01-04", "PX_LAST": 135.95}]),
            ),
            Value::Null,
        ]
    }))
    .await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(out, "{{\"2016-01-04\", 135.95}}session terminated");
}

#[tokio::test]
async fn startup_failure_skips_request() {
    let mut script = Script::respond(|_| vec![]);
    script.startup_ok = false;
    let gateway = Gateway::spawn(script).await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(out, "Failed to start session.\n");
    assert!(gateway.sent_requests().is_empty());
}

#[tokio::test]
async fn unreachable_gateway_fails_to_start() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let link = HistoryLink::new(
        BridgeConfig::default().with_endpoint(Some("127.0.0.1".to_string()), Some(port)),
    );
    let out = link.call(&ibm_jan_2016()).await;

    assert_eq!(out, "Failed to start session.\n");
}

#[tokio::test]
async fn service_failure_skips_request() {
    let mut script = Script::respond(|_| vec![]);
    script.service_ok = false;
    let gateway = Gateway::spawn(script).await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert_eq!(out, "Failed to open //blp/refdata\n");
    assert!(gateway.sent_requests().is_empty());
}

#[tokio::test]
async fn empty_ticker_and_field_request_defaults() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![history_event("RESPONSE", cid, &json!([]))]
    }))
    .await;

    let args = HistoryArgs::new("", "", "20160101", "20160131").with_use_dpdf(1);
    let out = gateway.link().call(&args).await;

    assert_eq!(out, "{}");
    let requests = gateway.sent_requests();
    assert_eq!(requests[0]["request"]["securities"], json!(["IBM US Equity"]));
    assert_eq!(requests[0]["request"]["fields"], json!(["PX_LAST"]));
    assert_eq!(requests[0]["request"]["adjustmentFollowDPDF"], true);
}

#[tokio::test]
async fn malformed_response_is_a_library_exception() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![json!({
            "eventType": "RESPONSE",
            "messages": [{
                "messageType": "HistoricalDataResponse",
                "correlationIds": [cid],
                "element": {"unexpected": 1}
            }]
        })]
    }))
    .await;

    let out = gateway.link().call(&ibm_jan_2016()).await;

    assert!(out.starts_with("Library Exception !!!"), "{out}");
    assert!(out.ends_with('\n'));
}

#[tokio::test]
async fn link_mode_serves_each_line() {
    let gateway = Gateway::spawn(Script::respond(|cid| {
        vec![history_event(
            "RESPONSE",
            cid,
            &json!([{"date": "2016-01-04", "PX_LAST": 135.95}]),
        )]
    }))
    .await;

    let input = concat!(
        r#"["IBM US Equity", "PX_LAST", "20160104", "20160104"]"#,
        "\n",
        r#"["IBM US Equity"]"#,
        "\n",
        r#"["IBM US Equity", "PX_LAST", "20160104", "20160104", "DAILY", "Actual", 0, 0]"#,
        "\n",
    );
    let mut output = Vec::new();

    gateway
        .link()
        .serve(input.as_bytes(), &mut output)
        .await
        .unwrap();

    let text = String::from_utf8(output).unwrap();
    let replies: Vec<String> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(
        replies,
        vec![
            "{{\"2016-01-04\", 135.95}}".to_string(),
            "Invalid call: expected 4 to 8 arguments, got 1".to_string(),
            "{{\"2016-01-04\", 135.95}}".to_string(),
        ]
    );
    assert_eq!(gateway.sent_requests().len(), 2);
}
