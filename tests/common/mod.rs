//! Shared mock Gremlin Server used by the integration tests.
//!
//! Spins up a bare WebSocket server on a random local port (mirroring the
//! `find_free_port` + background-`tokio::spawn` pattern used for the daemon's
//! own HTTP tests) and lets each test script exactly which frames the
//! "server" sends back for each inbound request.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message;

/// One canned behavior the mock server performs for an inbound request,
/// keyed by the gremlin source text it was sent (good enough for these
/// tests — no two concurrent requests in one scenario share a source).
pub enum Script {
    /// Reply with a single terminating 200 carrying `result`.
    Reply(Value),
    /// Reply with a 206 carrying `first`, then a terminating 200 carrying `second`.
    Stream(Value, Value),
    /// Don't reply at all — used to drive timeout and close-mid-flight tests.
    Ignore,
    /// Close the whole connection with this code/reason instead of replying.
    CloseConnection(u16, String),
    /// Reply with a 200 addressed to a request id that was never sent —
    /// exercises the unattributable-response path.
    ReplyToForeignId(Value),
}

pub struct MockServer {
    pub addr: SocketAddr,
    script_tx: mpsc::UnboundedSender<(String, Script)>,
}

impl MockServer {
    /// Bind a mock server and start accepting a single client connection in
    /// the background. Scripts registered via [`Self::on`] before the client
    /// sends its matching request are honored in order of arrival.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (script_tx, script_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_server(listener, script_rx));

        Self { addr, script_tx }
    }

    pub fn on(&self, gremlin: impl Into<String>, script: Script) {
        let _ = self.script_tx.send((gremlin.into(), script));
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

async fn run_server(listener: TcpListener, mut script_rx: mpsc::UnboundedReceiver<(String, Script)>) {
    let Ok((tcp, _)) = listener.accept().await else {
        return;
    };
    let Ok(ws) = tokio_tungstenite::accept_async(tcp).await else {
        return;
    };
    let (mut sink, mut stream) = ws.split();

    let mut scripts: Vec<(String, Script)> = Vec::new();
    loop {
        tokio::select! {
            registered = script_rx.recv() => {
                match registered {
                    Some(entry) => scripts.push(entry),
                    None => continue,
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Binary(data))) => {
                        let envelope: Value = match parse_request(&data) {
                            Some(v) => v,
                            None => continue,
                        };
                        let request_id = envelope["requestId"].as_str().unwrap_or_default().to_string();
                        let gremlin = envelope["args"]["gremlin"].as_str().unwrap_or_default().to_string();

                        let idx = scripts.iter().position(|(key, _)| key == &gremlin);
                        let Some(idx) = idx else { continue };
                        let (_, script) = scripts.remove(idx);

                        match script {
                            Script::Reply(result) => {
                                let _ = sink.send(status_frame(&request_id, 200, result)).await;
                            }
                            Script::Stream(first, second) => {
                                let _ = sink.send(status_frame(&request_id, 206, first)).await;
                                let _ = sink.send(status_frame(&request_id, 200, second)).await;
                            }
                            Script::Ignore => {}
                            Script::ReplyToForeignId(result) => {
                                let foreign_id = uuid::Uuid::new_v4().to_string();
                                let _ = sink.send(status_frame(&foreign_id, 200, result)).await;
                            }
                            Script::CloseConnection(code, reason) => {
                                let _ = sink
                                    .send(Message::Close(Some(CloseFrame {
                                        code: CloseCode::from(code),
                                        reason: reason.into(),
                                    })))
                                    .await;
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => return,
                }
            }
        }
    }
}

fn parse_request(data: &[u8]) -> Option<Value> {
    let prefix_len = *data.first()? as usize;
    let body = data.get(1 + prefix_len..)?;
    serde_json::from_slice(body).ok()
}

fn status_frame(request_id: &str, code: u16, result: Value) -> Message {
    let payload = serde_json::json!({
        "requestId": request_id,
        "status": { "code": code, "message": "", "attributes": {} },
        "result": result,
    });
    Message::Binary(serde_json::to_vec(&payload).unwrap().into())
}
