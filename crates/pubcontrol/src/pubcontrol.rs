//! PubControl - publishes one item to every configured endpoint

use std::any::Any;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use contracts::{EndpointConfig, Item, PubControlConfig, PubControlError, Transport};

use crate::callback::CallbackAggregator;
use crate::client::EndpointClient;
use crate::handle::PublishCallback;
use crate::http::HttpTransport;

/// Manages a set of endpoint clients and publishes to all of them
///
/// Readers (publish calls) share the client list; writers (add / remove /
/// apply config) take it exclusively, so a publish never sees a
/// half-updated list.
pub struct PubControl<T = HttpTransport> {
    clients: RwLock<Vec<Arc<EndpointClient<T>>>>,
    transport: Arc<T>,
}

impl PubControl<HttpTransport> {
    /// Build from declarative configuration over a real HTTP transport
    ///
    /// # Errors
    /// `Config` if the HTTP client cannot be built
    pub fn new(config: &PubControlConfig) -> Result<Self, PubControlError> {
        let transport = Arc::new(HttpTransport::new(&config.client)?);
        Ok(Self::with_transport(transport, &config.endpoints))
    }
}

impl<T> PubControl<T>
where
    T: Transport + Sync + 'static,
{
    /// Build over `transport`, registering `endpoints`
    pub fn with_transport(transport: Arc<T>, endpoints: &[EndpointConfig]) -> Self {
        let clients = build_clients(&transport, endpoints);
        Self {
            clients: RwLock::new(clients),
            transport,
        }
    }

    /// Add an endpoint client
    pub async fn add_client(&self, client: impl Into<Arc<EndpointClient<T>>>) {
        self.clients.write().await.push(client.into());
    }

    /// Remove every endpoint client
    ///
    /// Removed clients are not finished; their queued requests are still
    /// delivered by their detached workers.
    pub async fn remove_all_clients(&self) {
        self.clients.write().await.clear();
    }

    /// Register a client per entry carrying a `uri`
    ///
    /// Entries without `uri` are skipped silently; invalid entries are
    /// skipped with a warning. Returns the number of clients registered.
    #[instrument(name = "pubcontrol_apply_config", skip(self, entries), fields(entries = entries.len()))]
    pub async fn apply_config(&self, entries: &[EndpointConfig]) -> usize {
        let built = build_clients(&self.transport, entries);
        let count = built.len();
        self.clients.write().await.extend(built);
        count
    }

    /// Snapshot of the managed clients
    pub async fn clients(&self) -> Vec<Arc<EndpointClient<T>>> {
        self.clients.read().await.clone()
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Publish to each endpoint in turn, stopping at the first error
    ///
    /// # Errors
    /// The first endpoint error, as returned by [`EndpointClient::publish`]
    #[instrument(name = "pubcontrol_publish", skip(self, item))]
    pub async fn publish(&self, channel: &str, item: &Item) -> Result<(), PubControlError> {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            client.publish(channel, item).await?;
        }
        Ok(())
    }

    /// Queue `item` on every endpoint's async worker
    ///
    /// With a callback, it fires once after every endpoint completed, with
    /// the first failure if any. If an endpoint rejects synchronously, that
    /// error is returned and later endpoints are skipped. The rejected and
    /// skipped endpoints count as `NotAttempted` failures, so the callback
    /// still fires once the endpoints queued before them have delivered.
    ///
    /// # Errors
    /// The first synchronous rejection (export or auth failure)
    #[instrument(name = "pubcontrol_publish_async", skip(self, item, callback))]
    pub async fn publish_async(
        &self,
        channel: &str,
        item: &Item,
        callback: Option<PublishCallback>,
    ) -> Result<(), PubControlError> {
        let clients = self.clients.read().await;
        let aggregator = callback.map(|callback| CallbackAggregator::new(clients.len(), callback));

        for (index, client) in clients.iter().enumerate() {
            let handler = aggregator.as_ref().map(CallbackAggregator::handler);
            if let Err(e) = client.publish_async(channel, item, handler) {
                if let Some(aggregator) = &aggregator {
                    let reason = e.to_string();
                    for skipped in &clients[index..] {
                        aggregator.on_result(Err(Arc::new(PubControlError::not_attempted(
                            skipped.uri(),
                            reason.clone(),
                        ))));
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Publish to every endpoint concurrently and wait for all of them
    ///
    /// Each endpoint runs in its own task, so a panic inside one endpoint's
    /// path is reported as that endpoint's failure instead of unwinding into
    /// the caller.
    ///
    /// # Errors
    /// `Aggregate` naming every failed endpoint
    #[instrument(name = "pubcontrol_publish_parallel", skip(self, item))]
    pub async fn publish_parallel(&self, channel: &str, item: &Item) -> Result<(), PubControlError> {
        let clients = self.clients.read().await;
        let total = clients.len();

        let tasks: Vec<_> = clients
            .iter()
            .map(|client| {
                let client = Arc::clone(client);
                let channel = channel.to_string();
                let item = item.clone();
                let uri = client.uri().to_string();
                let task = tokio::spawn(async move { client.publish(&channel, &item).await });
                (uri, task)
            })
            .collect();

        let mut errors = Vec::new();
        for (uri, task) in tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(format!("{uri}: {}", e.to_string().trim())),
                Err(e) if e.is_panic() => {
                    let message = panic_message(e.into_panic());
                    warn!(uri = %uri, panic = %message, "Endpoint publish panicked");
                    errors.push(format!("{uri}: PANIC: {message}"));
                }
                Err(e) => errors.push(format!("{uri}: {e}")),
            }
        }

        observability::metrics::record_fanout(errors.len(), total);
        if errors.is_empty() {
            return Ok(());
        }

        Err(PubControlError::Aggregate {
            failed: errors.len(),
            total,
            channel: channel.to_string(),
            errors,
        })
    }

    /// Finish every endpoint client, draining and stopping their workers
    #[instrument(name = "pubcontrol_finish", skip(self))]
    pub async fn finish(&self) {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            client.finish().await;
        }
        debug!(clients = clients.len(), "All endpoint workers finished");
    }
}

/// Build clients for every usable entry
fn build_clients<T>(transport: &Arc<T>, entries: &[EndpointConfig]) -> Vec<Arc<EndpointClient<T>>>
where
    T: Transport + Sync + 'static,
{
    let mut clients = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match client_from_entry(transport, entry) {
            Ok(Some(client)) => {
                info!(uri = %client.uri(), auth = client.auth_kind(), "Endpoint registered");
                clients.push(Arc::new(client));
            }
            Ok(None) => debug!(entry = idx, "Endpoint entry without uri skipped"),
            Err(e) => warn!(entry = idx, error = %e, "Invalid endpoint entry skipped"),
        }
    }
    clients
}

/// Turn one entry into a client
///
/// - `iss` + `key`: JWT auth with claims `{"iss": ...}`
/// - `key` alone: pre-shared bearer token
/// - neither: no auth
fn client_from_entry<T>(
    transport: &Arc<T>,
    entry: &EndpointConfig,
) -> Result<Option<EndpointClient<T>>, PubControlError>
where
    T: Transport + Sync + 'static,
{
    let Some(uri) = entry.uri.as_deref() else {
        return Ok(None);
    };
    entry
        .check()
        .map_err(|e| PubControlError::config(format!("endpoint '{uri}': {e}")))?;

    let client = EndpointClient::with_transport(uri, Arc::clone(transport));
    match (&entry.iss, &entry.key) {
        (Some(iss), Some(key)) => {
            let mut claims = Map::new();
            claims.insert("iss".to_string(), Value::String(iss.clone()));
            client.set_auth_jwt(claims, key.as_bytes().to_vec());
        }
        (None, Some(key)) => {
            let token = String::from_utf8(key.as_bytes().to_vec()).map_err(|_| {
                PubControlError::config(format!("bearer key for '{uri}' is not valid UTF-8"))
            })?;
            client.set_auth_bearer(token);
        }
        // `check` rejects iss without key
        (_, None) => {}
    }
    Ok(Some(client))
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
