//! The connection supervisor.
//!
//! `connect()` spawns a dedicated supervisor task that owns the connect
//! handshake and, once open, spawns the reader task and the multiplexer
//! loop as its own children — three tasks per connection total. The
//! supervisor's own job after the handshake is purely to wait for the
//! multiplexer to finish and log the outcome; all teardown guarantees live
//! inside the multiplexer's `finalize`, since it is the sole owner of the
//! pool, the queues, and the WebSocket.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::codec::Codec;
use crate::connection::{ConnectionHandle, ReqPack};
use crate::error::GremlinError;
use crate::multiplexer::run_multiplexer;
use crate::reader::run_reader;
use crate::settings::Settings;

/// Open a connection to a Gremlin Server and return a handle once the
/// WebSocket handshake has completed.
///
/// Spawns the supervisor task immediately; this function itself only waits
/// on the one-shot "connect result" slot, so it returns as soon as the
/// handshake settles, not when the connection eventually closes.
pub async fn connect<C: Codec>(
    host: &str,
    port: u16,
    settings: Settings<C>,
) -> Result<ConnectionHandle<C>, GremlinError> {
    let (producer_tx, producer_rx) = mpsc::channel(settings.request_queue_size);
    let (connect_tx, connect_rx) = oneshot::channel();
    let cancel = CancellationToken::new();

    let codec = Arc::new(settings.codec);
    let scheme = if settings.tls { "wss" } else { "ws" };
    let url = format!(
        "{scheme}://{host}:{port}{}",
        settings.endpoint_path
    );

    tokio::spawn(supervisor_task(
        url,
        producer_rx,
        connect_tx,
        codec.clone(),
        settings.response_timeout,
        settings.on_general_exception,
        cancel.clone(),
    ));

    match connect_rx.await {
        Ok(Ok(())) => Ok(ConnectionHandle {
            producer_tx,
            codec,
            cancel,
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(GremlinError::Connect(
            "supervisor task ended before reporting a connect result".to_string(),
        )),
    }
}

#[allow(clippy::too_many_arguments)]
async fn supervisor_task<C: Codec>(
    url: String,
    producer_rx: mpsc::Receiver<ReqPack<C::Response>>,
    connect_tx: oneshot::Sender<Result<(), GremlinError>>,
    codec: Arc<C>,
    response_timeout: std::time::Duration,
    on_general_exception: Arc<dyn Fn(crate::error::GeneralException) + Send + Sync>,
    cancel: CancellationToken,
) {
    info!(url = %url, "connecting to gremlin server");

    let ws_stream = match tokio_tungstenite::connect_async(&url).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(url = %url, err = %e, "failed to open websocket");
            let _ = connect_tx.send(Err(GremlinError::Connect(e.to_string())));
            return;
        }
    };

    // Idempotent: the oneshot can only be sent once; the failure path above
    // already returned, so this is the only send on the success path.
    if connect_tx.send(Ok(())).is_err() {
        // Nobody is listening anymore (the caller's `connect` future was
        // dropped). Nothing pending yet, so just tear the socket down.
        let _ = ws_stream.close(None).await;
        return;
    }

    let (ws_sink, ws_stream) = ws_stream.split();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let reader_handle = tokio::spawn(run_reader(ws_stream, inbound_tx));

    info!(url = %url, "gremlin connection established");

    let result = run_multiplexer(
        ws_sink,
        producer_rx,
        inbound_rx,
        reader_handle,
        codec,
        response_timeout,
        on_general_exception,
        cancel,
    )
    .await;

    match result {
        Ok(()) => info!(url = %url, "gremlin connection closed"),
        Err(e) => error!(url = %url, err = %e, "gremlin connection closed with error"),
    }
}
