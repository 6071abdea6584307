//! The multiplexer event loop.
//!
//! Single task, owns the pool and the WebSocket write half. Each iteration
//! races four event sources — EvReq, EvRes, EvRxDone, EvTimeout — via
//! `tokio::select!`, which (deliberately left unbiased, matching "raced via
//! a non-deterministic select; no starvation guarantee required beyond what
//! the underlying select provides") picks uniformly among whichever
//! branches are ready.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::codec::Codec;
use crate::connection::ReqPack;
use crate::error::{GeneralException, GremlinError};
use crate::pool::RequestPool;
use crate::reader::{ReaderOutcome, WsStream};

type WsSink = SplitSink<WsStream, Message>;

/// Why the loop stopped. Distinct from the function's own `Result` — a
/// server-initiated or caller-initiated close is a normal end of life for
/// the connection even though it is an *error* (`ServerClosed` / `Closed`)
/// from the point of view of any request still pending when it happened.
enum ExitReason {
    /// Reader saw a clean (1000) close, or end-of-stream with no frame.
    ServerClosed,
    /// `ConnectionHandle::close` was called.
    LocallyClosed,
    /// Reader error, a dead reader task, or a failed wire send.
    Fatal(GremlinError),
}

impl ExitReason {
    fn drain_cause(&self) -> GremlinError {
        match self {
            ExitReason::ServerClosed => GremlinError::ServerClosed,
            ExitReason::LocallyClosed => GremlinError::Closed,
            ExitReason::Fatal(e) => e.clone(),
        }
    }

    fn into_result(self) -> Result<(), GremlinError> {
        match self {
            ExitReason::ServerClosed | ExitReason::LocallyClosed => Ok(()),
            ExitReason::Fatal(e) => Err(e),
        }
    }
}

/// Run the multiplexer loop to completion. Always returns after fully
/// draining the pool and the producer queue and closing the WebSocket —
/// `Ok(())` for a clean shutdown (server close, or caller-requested close),
/// `Err(e)` when `e` is the transport failure that also got fanned out to
/// every pending/queued request.
pub(crate) async fn run_multiplexer<C: Codec>(
    mut ws_sink: WsSink,
    mut producer_rx: mpsc::Receiver<ReqPack<C::Response>>,
    mut inbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    mut reader_handle: JoinHandle<ReaderOutcome>,
    codec: Arc<C>,
    response_timeout: Duration,
    on_general_exception: Arc<dyn Fn(GeneralException) + Send + Sync>,
    cancel: CancellationToken,
) -> Result<(), GremlinError> {
    let mut pool: RequestPool<C::Response> = RequestPool::new();
    let mut producer_closed = false;
    let mut reader_done = false;

    let reason: ExitReason = loop {
        tokio::select! {
            pack = producer_rx.recv(), if !producer_closed => {
                match pack {
                    Some(pack) => {
                        if let Err(e) = handle_ev_req(pack, &mut ws_sink, &mut pool, response_timeout).await {
                            break ExitReason::Fatal(e);
                        }
                    }
                    None => {
                        // Every ConnectionHandle clone (and its producer_tx)
                        // has been dropped. No more requests can arrive, but
                        // in-flight ones still deserve to finish normally.
                        debug!("producer queue closed — no more requests can be enqueued");
                        producer_closed = true;
                    }
                }
            }

            Some(raw) = inbound_rx.recv() => {
                handle_ev_res(raw, codec.as_ref(), &mut pool, on_general_exception.as_ref());
            }

            reader_result = &mut reader_handle => {
                reader_done = true;
                let reader_outcome = match reader_result {
                    Ok(outcome) => outcome,
                    Err(join_err) => ReaderOutcome::Fatal(GremlinError::Transport {
                        code: 0,
                        reason: format!("reader task failed: {join_err}"),
                    }),
                };
                match reader_outcome {
                    ReaderOutcome::Clean => {
                        debug!("reader finished cleanly — server closed the connection");
                        break ExitReason::ServerClosed;
                    }
                    ReaderOutcome::Fatal(e) => {
                        warn!(err = %e, "reader finished with a fatal transport error");
                        break ExitReason::Fatal(e);
                    }
                }
            }

            Some(req_id) = pool.next_timeout() => {
                handle_ev_timeout(req_id, &mut pool, response_timeout);
            }

            () = cancel.cancelled() => {
                debug!("connection close requested — draining and shutting down");
                break ExitReason::LocallyClosed;
            }
        }
    };

    let cause = reason.drain_cause();
    finalize(pool, &mut producer_rx, reader_handle, reader_done, &mut ws_sink, cause).await;

    reason.into_result()
}

/// EvReq: attempt to register the request, then write it to the wire.
async fn handle_ev_req<C: Codec>(
    pack: ReqPack<C::Response>,
    ws_sink: &mut WsSink,
    pool: &mut RequestPool<C::Response>,
    response_timeout: Duration,
) -> Result<(), GremlinError> {
    if !pool.try_insert(pack.req_id, response_timeout, pack.output.clone()) {
        let _ = pack
            .output
            .send(Err(GremlinError::DuplicateRequestId(pack.req_id)));
        return Ok(());
    }

    if let Err(e) = ws_sink.send(Message::Binary(pack.encoded.into())).await {
        // A send failure is fatal to the whole connection: propagate up so
        // the caller drains every entry, including the one just inserted,
        // with this cause.
        return Err(GremlinError::Transport {
            code: 0,
            reason: e.to_string(),
        });
    }
    Ok(())
}

/// EvRes: decode and route one inbound frame.
fn handle_ev_res<C: Codec>(
    raw: Vec<u8>,
    codec: &C,
    pool: &mut RequestPool<C::Response>,
    on_general_exception: &(dyn Fn(GeneralException) + Send + Sync),
) {
    use crate::codec::Response as _;

    let response = match codec.decode(&raw) {
        Ok(r) => r,
        Err(e) => {
            on_general_exception(GeneralException::ParseFailure(e));
            return;
        }
    };

    let req_id = response.request_id();
    if response.terminating() {
        match pool.remove(req_id) {
            Some(entry) => {
                let _ = entry.output.send(Ok(response));
            }
            None => on_general_exception(GeneralException::UnexpectedRequestId(req_id)),
        }
    } else {
        match pool.lookup(req_id) {
            Some(entry) => {
                let _ = entry.output.send(Ok(response));
            }
            None => on_general_exception(GeneralException::UnexpectedRequestId(req_id)),
        }
    }
}

/// EvTimeout: a per-request timer fired. Ignored if the entry is already
/// gone (the response race won).
fn handle_ev_timeout<R: crate::codec::Response>(
    req_id: Uuid,
    pool: &mut RequestPool<R>,
    response_timeout: Duration,
) {
    if let Some(entry) = pool.remove(req_id) {
        let _ = entry
            .output
            .send(Err(GremlinError::ResponseTimeout(response_timeout)));
    }
}

/// Cleanup run on every exit path: cancel+join the reader if it hasn't
/// already finished, drain the pool and the producer queue with the same
/// cause, and close the WebSocket.
async fn finalize<R: crate::codec::Response>(
    mut pool: RequestPool<R>,
    producer_rx: &mut mpsc::Receiver<ReqPack<R>>,
    mut reader_handle: JoinHandle<ReaderOutcome>,
    reader_done: bool,
    ws_sink: &mut WsSink,
    cause: GremlinError,
) {
    if !reader_done {
        reader_handle.abort();
        let _ = reader_handle.await;
    }

    pool.drain(cause.clone());

    producer_rx.close();
    while let Ok(pack) = producer_rx.try_recv() {
        let _ = pack.output.send(Err(cause.clone()));
    }

    let _ = ws_sink.close().await;
}
