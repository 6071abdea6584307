//! Caller-facing API and the data types that cross the caller/multiplexer
//! boundary.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::codec::{Codec, Response};
use crate::error::GremlinError;

/// A request packet as it travels the bounded producer queue: the
/// already-framed bytes plus the per-request output stream the
/// multiplexer will write results into.
pub(crate) struct ReqPack<R> {
    pub(crate) req_id: Uuid,
    pub(crate) encoded: Vec<u8>,
    pub(crate) output: mpsc::UnboundedSender<Result<R, GremlinError>>,
}

/// A live connection to a single Gremlin Server over one WebSocket.
///
/// Cloning a `ConnectionHandle` is cheap and safe — every clone shares the
/// same producer queue and cancellation token, so any of them can enqueue
/// requests or close the connection for all the others. Dropping every clone
/// without calling [`Self::close`]
/// leaves the connection's background tasks running until the server
/// closes the socket; see `DESIGN.md` for why that tradeoff was made.
#[derive(Clone)]
pub struct ConnectionHandle<C: Codec> {
    pub(crate) producer_tx: mpsc::Sender<ReqPack<C::Response>>,
    pub(crate) codec: std::sync::Arc<C>,
    pub(crate) cancel: CancellationToken,
}

impl<C: Codec> ConnectionHandle<C> {
    /// Enqueue `request` under `req_id`, which the caller must have chosen
    /// to be unique among currently-pending requests on this connection.
    ///
    /// Blocks (backpressure) if the producer queue is at capacity. Does not
    /// wait for wire delivery — by the time this returns, the request has
    /// only been handed to the multiplexer, not necessarily sent.
    pub async fn send(
        &self,
        req_id: Uuid,
        request: C::Request,
    ) -> Result<ResponseHandle<C::Response>, GremlinError> {
        let encoded = self.codec.encode_binary(req_id, &request)?;
        let (output_tx, output_rx) = mpsc::unbounded_channel();
        let pack = ReqPack {
            req_id,
            encoded,
            output: output_tx,
        };
        self.producer_tx
            .send(pack)
            .await
            .map_err(|_| GremlinError::QueueClosed)?;
        Ok(ResponseHandle {
            output: output_rx,
            terminated: false,
        })
    }

    /// Convenience wrapper over [`Self::send`] that generates a fresh
    /// correlation id for the caller.
    pub async fn send_new(
        &self,
        request: C::Request,
    ) -> Result<(Uuid, ResponseHandle<C::Response>), GremlinError> {
        let req_id = Uuid::new_v4();
        let handle = self.send(req_id, request).await?;
        Ok((req_id, handle))
    }

    /// Request that the connection close. Cancels the supervisor's
    /// cooperative shutdown path, which drains every pending and queued
    /// request with [`GremlinError::Closed`] and closes the WebSocket.
    /// Returns immediately — it does not wait for teardown to finish.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// The caller-side handle to one request's response stream.
///
/// Not `Clone` — the output stream has exactly one consumer. `terminated`
/// latches permanently once a terminating response or an error has been
/// observed, after which [`Self::next_response`] returns `Ok(None)` without
/// touching the channel again.
pub struct ResponseHandle<R> {
    output: mpsc::UnboundedReceiver<Result<R, GremlinError>>,
    terminated: bool,
}

impl<R: Response> ResponseHandle<R> {
    /// `Ok(Some(msg))` — the next response, `Ok(None)` — the stream has
    /// ended (idempotent once terminated), `Err(e)` — the stream ended
    /// with an error (sets `terminated` too).
    pub async fn next_response(&mut self) -> Result<Option<R>, GremlinError> {
        if self.terminated {
            return Ok(None);
        }
        match self.output.recv().await {
            None => {
                // The multiplexer dropped the sender without writing a
                // final result — can only happen if the pool entry was
                // removed without notifying us, which every production
                // path in this crate avoids. Treat it as end-of-stream.
                self.terminated = true;
                Ok(None)
            }
            Some(Err(e)) => {
                self.terminated = true;
                Err(e)
            }
            Some(Ok(msg)) => {
                if msg.terminating() {
                    self.terminated = true;
                }
                Ok(Some(msg))
            }
        }
    }

    /// Collect every remaining response eagerly. Equivalent to calling
    /// [`Self::next_response`] until it returns `Ok(None)`.
    pub async fn slurp(mut self) -> Result<Vec<R>, GremlinError> {
        let mut out = Vec::new();
        while let Some(msg) = self.next_response().await? {
            out.push(msg);
        }
        Ok(out)
    }

    /// Whether a terminating response or error has already been observed.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }
}
