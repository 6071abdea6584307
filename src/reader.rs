//! The reader task.
//!
//! Pulls binary frames off the WebSocket and hands them to the multiplexer
//! over an unbounded channel. Does not decode, does not touch the pool,
//! does not observe timeouts — its only job is turning "the socket said
//! something" into an event the multiplexer can select on.

use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::GremlinError;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How the reader task's loop ended, joined by the multiplexer as `EvRxDone`.
#[derive(Debug)]
pub(crate) enum ReaderOutcome {
    /// Close frame with status 1000, or end-of-stream with no close frame.
    Clean,
    /// Any other close status or I/O error.
    Fatal(GremlinError),
}

/// Run the reader loop until the socket closes or errors. `inbound_tx` is
/// unbounded, so this task never blocks on backpressure from the
/// multiplexer — only on the socket itself.
pub(crate) async fn run_reader(
    mut stream: SplitStream<WsStream>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
) -> ReaderOutcome {
    loop {
        match stream.next().await {
            Some(Ok(Message::Binary(data))) => {
                trace!(bytes = data.len(), "inbound frame");
                // Receiver side only disappears once the multiplexer has
                // exited, at which point this task is being aborted anyway.
                let _ = inbound_tx.send(data.into());
            }
            Some(Ok(Message::Close(frame))) => {
                return match frame {
                    Some(f) if f.code == CloseCode::Normal => {
                        debug!("server sent close frame (1000 normal)");
                        ReaderOutcome::Clean
                    }
                    Some(f) => {
                        let code: u16 = f.code.into();
                        warn!(code, reason = %f.reason, "server sent abnormal close frame");
                        ReaderOutcome::Fatal(GremlinError::Transport {
                            code,
                            reason: f.reason.to_string(),
                        })
                    }
                    None => {
                        warn!("server sent close frame with no status — treating as abnormal");
                        ReaderOutcome::Fatal(GremlinError::Transport {
                            code: 0,
                            reason: "close frame carried no status".to_string(),
                        })
                    }
                };
            }
            Some(Ok(Message::Text(_) | Message::Frame(_))) => {
                // Core is binary-only; ignore stray non-binary data frames.
                continue;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Keepalive frames carry no request data; nothing to do.
                continue;
            }
            Some(Err(e)) => {
                warn!(err = %e, "websocket read error");
                return ReaderOutcome::Fatal(GremlinError::Transport {
                    code: 0,
                    reason: e.to_string(),
                });
            }
            None => {
                debug!("transport end-of-stream with no close frame");
                return ReaderOutcome::Clean;
            }
        }
    }
}
