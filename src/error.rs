//! Error taxonomy for the connection core.
//!
//! Every variant here is either returned from [`crate::connect`] at connect
//! time, written into a request's output stream, or handed to the
//! `on_general_exception` callback. All variants derive `Clone` so the
//! multiplexer can fan a single cause out to every pending request's output
//! stream without cloning the underlying transport error by hand.

use std::time::Duration;
use uuid::Uuid;

/// Errors surfaced to callers through output streams, as a fatal raise from
/// [`crate::connect`], or (for the non-attributable variants wrapped in
/// [`GeneralException`]) through the `on_general_exception` callback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GremlinError {
    /// Transport failed to open during [`crate::connect`].
    #[error("failed to connect to gremlin server: {0}")]
    Connect(String),

    /// A request was enqueued with an id already pending on this connection.
    #[error("duplicate request id: {0}")]
    DuplicateRequestId(Uuid),

    /// No terminating response arrived within `response_timeout`.
    #[error("response timed out after {0:?}")]
    ResponseTimeout(Duration),

    /// The server closed the WebSocket cleanly (status 1000) while this
    /// request was still pending, or queued but not yet sent.
    #[error("server closed the connection")]
    ServerClosed,

    /// The caller asked the connection to close via
    /// [`crate::ConnectionHandle::close`] before this request completed.
    #[error("connection closed locally")]
    Closed,

    /// The WebSocket closed abnormally (non-1000 status) or the transport
    /// raised an I/O error. The close code and reason are preserved so
    /// callers can log *why* the connection dropped.
    #[error("transport error (close code {code}): {reason}")]
    Transport { code: u16, reason: String },

    /// The producer queue is closed — the connection has already torn down.
    #[error("request queue is closed")]
    QueueClosed,

    /// The codec failed to encode an outgoing request.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

/// A codec-level decode failure. Never fatal to the connection — surfaced
/// only through [`GeneralException::ParseFailure`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed response frame: {0}")]
    Malformed(String),

    #[error("json decode error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Json(e.to_string())
    }
}

/// An anomaly that cannot be attributed to any single in-flight request.
/// Handed to the `on_general_exception` callback; the multiplexer loop
/// continues afterward.
#[derive(Debug, Clone)]
pub enum GeneralException {
    /// A frame failed to decode.
    ParseFailure(DecodeError),
    /// A decoded response named a `requestId` with no matching pool entry.
    UnexpectedRequestId(Uuid),
}

impl std::fmt::Display for GeneralException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneralException::ParseFailure(e) => write!(f, "parse failure: {e}"),
            GeneralException::UnexpectedRequestId(id) => {
                write!(f, "unexpected request id: {id}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_exception_display_is_stable() {
        let e = GeneralException::UnexpectedRequestId(Uuid::nil());
        assert_eq!(
            e.to_string(),
            "unexpected request id: 00000000-0000-0000-0000-000000000000"
        );
    }
}
