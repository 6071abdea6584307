//! The codec interface.
//!
//! The core never inspects a request or response body beyond what this
//! trait exposes. Callers bring their own [`Codec`] (or use the default
//! JSON one in [`crate::message`]); the multiplexer only ever asks it to
//! frame outgoing bytes and to extract a correlation id / terminating flag
//! from a decoded response.
//!
//! `Codec` is monomorphized at `connect` time (a generic type parameter)
//! rather than boxed as `dyn Codec` — the codec and its `Response` type are
//! both known statically at the call site, so there is no need to pay for
//! dynamic dispatch on the hot decode path.

use uuid::Uuid;

use crate::error::{DecodeError, GremlinError};

/// A decoded response message, opaque to the core except for these two
/// accessors.
pub trait Response: Send + 'static {
    /// The correlation id this response is addressed to.
    fn request_id(&self) -> Uuid;

    /// Whether this is the last message of its response stream.
    fn terminating(&self) -> bool;
}

/// Encodes requests to framed bytes and decodes inbound frames into typed
/// responses. Implementations are expected to be cheap to construct and
/// stateless (the core clones requests into a `Settings<C>` once, at
/// connect time).
pub trait Codec: Send + Sync + 'static {
    /// The request value callers pass to [`crate::ConnectionHandle::send`].
    type Request: Send;
    /// The decoded response type, scoped to a single correlation id.
    type Response: Response;

    /// The content type embedded in the wire frame by [`Codec::encode_binary`].
    fn content_type(&self) -> &'static str;

    /// Produce a complete binary WebSocket payload for `request`, addressed
    /// to `request_id`. Must be total-order: byte-identical output for the
    /// same input.
    fn encode_binary(
        &self,
        request_id: Uuid,
        request: &Self::Request,
    ) -> Result<Vec<u8>, GremlinError>;

    /// Parse one inbound WebSocket payload. Decode failures are never fatal
    /// to the connection — they are surfaced through
    /// `on_general_exception` and the loop continues.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Response, DecodeError>;
}
