//! Connection settings.
//!
//! Typed fields with named-constant defaults, following `DaemonConfig`'s
//! convention elsewhere in this codebase; each override is applied
//! independently via a `with_*` method that consumes and returns `Self`,
//! the same builder idiom used by `HealthReporter` and `PoolConfig`.

use std::sync::Arc;
use std::time::Duration;

use crate::codec::Codec;
use crate::error::GeneralException;

/// Default WebSocket URL path.
pub const DEFAULT_ENDPOINT_PATH: &str = "/gremlin";
/// Default per-request deadline, applied to the last response of a stream.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);
/// Default producer queue capacity.
pub const DEFAULT_REQUEST_QUEUE_SIZE: usize = 8;

/// Everything [`crate::connect`] needs beyond the host/port pair.
pub struct Settings<C: Codec> {
    pub(crate) codec: C,
    pub(crate) endpoint_path: String,
    pub(crate) response_timeout: Duration,
    pub(crate) request_queue_size: usize,
    pub(crate) tls: bool,
    pub(crate) on_general_exception: Arc<dyn Fn(GeneralException) + Send + Sync>,
}

impl<C: Codec> Settings<C> {
    /// Start from the codec plus every other default.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            request_queue_size: DEFAULT_REQUEST_QUEUE_SIZE,
            tls: false,
            on_general_exception: Arc::new(default_on_general_exception),
        }
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_request_queue_size(mut self, size: usize) -> Self {
        self.request_queue_size = size;
        self
    }

    /// Use `wss://` instead of `ws://`. The core never inspects
    /// certificates either way — this is a boolean the transport layer
    /// consumes, not a TLS-negotiation implementation living in the core.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Callback for decode failures and unattributable routing anomalies.
    /// Defaults to logging at `warn` via `tracing`.
    pub fn with_on_general_exception<F>(mut self, f: F) -> Self
    where
        F: Fn(GeneralException) + Send + Sync + 'static,
    {
        self.on_general_exception = Arc::new(f);
        self
    }
}

impl<C: Codec + Default> Default for Settings<C> {
    fn default() -> Self {
        Settings::new(C::default())
    }
}

fn default_on_general_exception(exc: GeneralException) {
    tracing::warn!(event = %exc, "gremlin connection: unattributed event");
}
