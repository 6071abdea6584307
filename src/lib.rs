//! An async client for the Gremlin Server WebSocket protocol.
//!
//! A connection is a single long-lived WebSocket shared by any number of
//! concurrent callers. Each call gets its own correlation id and its own
//! response stream; a background multiplexer task owns the socket, matches
//! inbound frames back to the caller that sent them, and enforces a
//! per-request timeout independent of every other in-flight request.
//!
//! ```no_run
//! use gremlin_client::{connect, Settings, JsonCodec, GremlinRequest};
//!
//! # async fn run() -> Result<(), gremlin_client::GremlinError> {
//! let settings = Settings::new(JsonCodec);
//! let conn = connect("localhost", 8182, settings).await?;
//!
//! let (_req_id, mut response) = conn
//!     .send_new(GremlinRequest::eval("g.V().limit(10)"))
//!     .await?;
//!
//! while let Some(msg) = response.next_response().await? {
//!     println!("{msg:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod codec;
mod connection;
mod error;
mod message;
mod multiplexer;
mod pool;
mod reader;
mod settings;
mod supervisor;

pub use codec::{Codec, Response};
pub use connection::{ConnectionHandle, ResponseHandle};
pub use error::{DecodeError, GeneralException, GremlinError};
pub use message::{GremlinRequest, GremlinResponse, JsonCodec, ResponseStatus};
pub use settings::Settings;
pub use supervisor::connect;
