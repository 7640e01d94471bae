//! EndpointClient - publishes items to a single gateway endpoint

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use contracts::{ExportedMessage, Item, PubControlError, Transport, TransportRequest};

use crate::auth::{AuthMode, Claims};
use crate::handle::{PublishCallback, PublishRequest, WorkerHandle};
use crate::http::HttpTransport;
use crate::metrics::EndpointMetrics;

/// Wire body of one publish call
#[derive(Serialize)]
struct PublishBody<'a> {
    items: &'a [ExportedMessage],
}

/// Client for one publish endpoint
///
/// Offers a synchronous path ([`publish`](Self::publish), one transport call
/// per item) and an asynchronous path ([`publish_async`](Self::publish_async))
/// backed by a lazily started background worker that batches queued items.
/// Call [`finish`](Self::finish) to flush and stop the worker.
///
/// Dropping a client without `finish` closes the queue; the detached worker
/// still delivers what was queued, but nobody waits for it.
pub struct EndpointClient<T = HttpTransport> {
    uri: String,
    auth: Mutex<AuthMode>,
    transport: Arc<T>,
    worker: Mutex<Option<WorkerHandle>>,
    metrics: Arc<EndpointMetrics>,
}

impl EndpointClient<HttpTransport> {
    /// Create a client with a default HTTP transport
    ///
    /// # Errors
    /// `Config` if the HTTP client cannot be built
    pub fn http(uri: impl Into<String>) -> Result<Self, PubControlError> {
        Ok(Self::with_transport(
            uri,
            Arc::new(HttpTransport::with_defaults()?),
        ))
    }
}

impl<T> EndpointClient<T>
where
    T: Transport + Sync + 'static,
{
    /// Create a client that sends through `transport`
    pub fn with_transport(uri: impl Into<String>, transport: Arc<T>) -> Self {
        Self {
            uri: uri.into(),
            auth: Mutex::new(AuthMode::None),
            transport,
            worker: Mutex::new(None),
            metrics: Arc::new(EndpointMetrics::new()),
        }
    }

    /// Endpoint base URI
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Per-endpoint counters
    pub fn metrics(&self) -> &Arc<EndpointMetrics> {
        &self.metrics
    }

    /// Use basic auth (replaces any other auth mode)
    pub fn set_auth_basic(&self, user: impl Into<String>, pass: impl Into<String>) {
        self.set_auth(AuthMode::Basic {
            user: user.into(),
            pass: pass.into(),
        });
    }

    /// Use JWT auth (replaces any other auth mode)
    pub fn set_auth_jwt(&self, claims: Claims, key: impl Into<Vec<u8>>) {
        self.set_auth(AuthMode::Jwt {
            claims,
            key: key.into(),
        });
    }

    /// Use a pre-shared bearer token (replaces any other auth mode)
    pub fn set_auth_bearer(&self, token: impl Into<String>) {
        self.set_auth(AuthMode::Bearer {
            token: token.into(),
        });
    }

    /// Label of the configured auth mode
    pub fn auth_kind(&self) -> &'static str {
        self.auth.lock().unwrap_or_else(PoisonError::into_inner).kind()
    }

    /// Render the `Authorization` header for the current auth mode
    ///
    /// # Errors
    /// `Signing` if the JWT key or claims are rejected
    pub fn generate_auth_header(&self) -> Result<String, PubControlError> {
        self.auth
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .header()
    }

    /// Whether a background worker is currently running
    pub fn is_worker_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|w| !w.is_closed())
    }

    /// Publish `item` to `channel` and wait for the endpoint's answer
    ///
    /// # Errors
    /// - `DuplicateFormat` if the item cannot be exported
    /// - `Signing` if the auth header cannot be generated
    /// - `Transport` / `Publish` if delivery fails
    #[instrument(
        name = "endpoint_client_publish",
        skip(self, item),
        fields(uri = %self.uri)
    )]
    pub async fn publish(&self, channel: &str, item: &Item) -> Result<(), PubControlError> {
        let message = self.prepare(channel, item)?;
        let auth_header = self.generate_auth_header()?;

        self.metrics.inc_call_count();
        let result = pub_call(
            &*self.transport,
            &self.uri,
            &auth_header,
            std::slice::from_ref(&message),
        )
        .await;

        match &result {
            Ok(()) => self.metrics.add_published(1),
            Err(_) => self.metrics.add_failures(1),
        }
        observability::metrics::record_publish(&self.uri, 1, result.is_ok());
        result
    }

    /// Queue `item` for delivery to `channel` and return immediately
    ///
    /// Export and auth failures are reported here, before anything is queued.
    /// Delivery failures are reported through `callback` only.
    ///
    /// Must be called from within a Tokio runtime (the worker is spawned on
    /// first use).
    ///
    /// # Errors
    /// - `DuplicateFormat` if the item cannot be exported
    /// - `Signing` if the auth header cannot be generated
    /// - `Config` if called outside a Tokio runtime
    #[instrument(
        name = "endpoint_client_publish_async",
        skip(self, item, callback),
        fields(uri = %self.uri)
    )]
    pub fn publish_async(
        &self,
        channel: &str,
        item: &Item,
        callback: Option<PublishCallback>,
    ) -> Result<(), PubControlError> {
        let message = self.prepare(channel, item)?;
        let auth_header = self.generate_auth_header()?;

        let request = PublishRequest {
            uri: self.uri.clone(),
            auth_header,
            message,
            callback,
        };

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.as_ref().is_some_and(WorkerHandle::is_closed) {
            warn!(uri = %self.uri, "Publish worker died, restarting");
            *worker = None;
        }
        let handle = match worker.take() {
            Some(handle) => worker.insert(handle),
            None => {
                debug!(uri = %self.uri, "Starting publish worker");
                worker.insert(WorkerHandle::spawn(
                    Arc::clone(&self.transport),
                    Arc::clone(&self.metrics),
                    self.uri.clone(),
                )?)
            }
        };
        handle.enqueue(request);
        observability::metrics::record_queue_depth(&self.uri, self.metrics.queue_len());
        Ok(())
    }

    /// Deliver everything queued so far, then stop the worker
    ///
    /// No-op if no async publish was ever issued.
    #[instrument(name = "endpoint_client_finish", skip(self), fields(uri = %self.uri))]
    pub async fn finish(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    fn set_auth(&self, mode: AuthMode) {
        debug!(uri = %self.uri, auth = mode.kind(), "Auth configured");
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    fn prepare(&self, channel: &str, item: &Item) -> Result<ExportedMessage, PubControlError> {
        let mut message = item.export()?;
        message.set_channel(channel);
        Ok(message)
    }
}

/// POST `items` to `<uri>/publish/`
///
/// Any status outside `[200, 300)` becomes a `Publish` error carrying the body.
pub(crate) async fn pub_call<T>(
    transport: &T,
    uri: &str,
    auth_header: &str,
    items: &[ExportedMessage],
) -> Result<(), PubControlError>
where
    T: Transport + Sync,
{
    let body = serde_json::to_vec(&PublishBody { items })?;
    let request = TransportRequest {
        url: format!("{uri}/publish/"),
        headers: vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), auth_header.to_string()),
        ],
        body: Bytes::from(body),
    };

    let response = transport.post(request).await?;
    if !response.is_success() {
        return Err(PubControlError::Publish {
            status: response.status,
            body: response.body,
        });
    }
    Ok(())
}
