//! The request pool.
//!
//! Owned exclusively by the multiplexer task — every method here takes
//! `&mut self`, never a lock. Registering a timer and inserting the entry
//! happen inside the same `&mut self` call, so the two can never drift out
//! of sync before the loop re-enters its `select!`.
//!
//! Per-request timers are modeled as a [`FuturesUnordered`] of tagged sleep
//! futures rather than one abort handle per entry. There is no API to
//! cancel an individual future out of a
//! `FuturesUnordered`, so "cancelling" a timer on entry removal is
//! implicit: the sleep still fires later, but by then `lookup`/`remove`
//! finds nothing and the timeout handler is a no-op. The caller-visible
//! effect — no `ResponseTimeout` reaches a request whose entry is already
//! gone — is identical to true cancellation.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::codec::Response;
use crate::error::GremlinError;

type TimerFuture = Pin<Box<dyn Future<Output = Uuid> + Send>>;

/// One pending request: its output stream, keyed by correlation id in the
/// enclosing [`RequestPool`].
pub(crate) struct PoolEntry<R> {
    pub(crate) output: mpsc::UnboundedSender<Result<R, GremlinError>>,
}

/// Mapping `ReqId -> entry`, plus the set of outstanding timeout timers.
pub(crate) struct RequestPool<R> {
    entries: HashMap<Uuid, PoolEntry<R>>,
    timers: FuturesUnordered<TimerFuture>,
}

impl<R: Response> RequestPool<R> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            timers: FuturesUnordered::new(),
        }
    }

    /// Insert a new entry for `req_id` with a timer that fires after
    /// `timeout`. Returns `false` without touching anything if `req_id` is
    /// already pending.
    pub(crate) fn try_insert(
        &mut self,
        req_id: Uuid,
        timeout: Duration,
        output: mpsc::UnboundedSender<Result<R, GremlinError>>,
    ) -> bool {
        if self.entries.contains_key(&req_id) {
            return false;
        }
        self.entries.insert(req_id, PoolEntry { output });
        self.timers.push(Box::pin(async move {
            tokio::time::sleep(timeout).await;
            req_id
        }));
        true
    }

    pub(crate) fn lookup(&self, req_id: Uuid) -> Option<&PoolEntry<R>> {
        self.entries.get(&req_id)
    }

    /// Remove and return the entry for `req_id`, if any. Idempotent.
    pub(crate) fn remove(&mut self, req_id: Uuid) -> Option<PoolEntry<R>> {
        self.entries.remove(&req_id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolves to the id of the next request whose timer expired. Pending
    /// forever while no timers are outstanding — an empty `FuturesUnordered`
    /// never wakes, which is exactly the behavior wanted here.
    pub(crate) async fn next_timeout(&mut self) -> Option<Uuid> {
        self.timers.next().await
    }

    /// Write `cause` to every pending output stream, then empty the pool.
    /// Used on fatal transport error, server close, or supervisor teardown.
    pub(crate) fn drain(&mut self, cause: GremlinError) {
        for (_, entry) in self.entries.drain() {
            let _ = entry.output.send(Err(cause.clone()));
        }
        self.timers.clear();
    }
}
