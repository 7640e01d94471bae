//! WorkerHandle - owns one endpoint's async publish queue and worker task

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ExportedMessage, PubControlError, SharedError, Transport};

use crate::client::pub_call;
use crate::metrics::EndpointMetrics;
use crate::pubcontrol::panic_message;

/// Maximum number of queued requests delivered in one transport call
pub const MAX_BATCH_SIZE: usize = 10;

/// Completion callback for one async publish
///
/// Every request of a batch receives the same outcome.
pub type PublishCallback = Box<dyn FnOnce(Result<(), SharedError>) + Send + 'static>;

/// A queued publish, with its auth header already rendered
pub(crate) struct PublishRequest {
    pub uri: String,
    pub auth_header: String,
    pub message: ExportedMessage,
    pub callback: Option<PublishCallback>,
}

impl PublishRequest {
    /// Resolve the callback with an error, without delivering
    pub fn fail(self, error: PubControlError) {
        if let Some(callback) = self.callback {
            callback(Err(Arc::new(error)));
        }
    }
}

/// Queue entry consumed by the worker
pub(crate) enum Request {
    Publish(PublishRequest),
    /// Shutdown sentinel: everything enqueued before it is delivered first
    Stop,
}

/// Handle to a running publish worker
pub(crate) struct WorkerHandle {
    /// Endpoint URI (for logs)
    name: String,
    /// Channel to send requests to worker
    tx: mpsc::UnboundedSender<Request>,
    /// Shared metrics
    metrics: Arc<EndpointMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Create a new WorkerHandle and spawn the worker task
    ///
    /// # Errors
    /// `Config` when called outside a Tokio runtime
    pub fn spawn<T>(
        transport: Arc<T>,
        metrics: Arc<EndpointMetrics>,
        name: String,
    ) -> Result<Self, PubControlError>
    where
        T: Transport + Sync + 'static,
    {
        let runtime = Handle::try_current().map_err(|e| {
            PubControlError::config(format!("publish worker for '{name}' needs a Tokio runtime: {e}"))
        })?;
        let (tx, rx) = mpsc::unbounded_channel();

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = runtime.spawn(async move {
            publish_worker(transport, rx, worker_metrics, worker_name).await;
        });

        Ok(Self {
            name,
            tx,
            metrics,
            worker_handle,
        })
    }

    /// Whether the worker can no longer receive requests
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a publish request (never blocks)
    ///
    /// If the worker is gone the request's callback is failed instead.
    pub fn enqueue(&self, request: PublishRequest) {
        self.metrics.inc_queue_len();
        if let Err(mpsc::error::SendError(rejected)) = self.tx.send(Request::Publish(request)) {
            self.metrics.dec_queue_len(1);
            error!(endpoint = %self.name, "Publish worker closed unexpectedly");
            if let Request::Publish(request) = rejected {
                let uri = request.uri.clone();
                request.fail(PubControlError::transport(uri, "publish worker stopped"));
            }
        }
    }

    /// Stop the worker after it has delivered everything queued so far
    #[instrument(name = "worker_handle_shutdown", skip(self), fields(endpoint = %self.name))]
    pub async fn shutdown(self) {
        if self.tx.send(Request::Stop).is_err() {
            warn!(endpoint = %self.name, "Worker already stopped");
        }
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(endpoint = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(endpoint = %self.name, "WorkerHandle shutdown complete");
    }
}

/// Worker task that drains the queue in batches and delivers them
#[instrument(
    name = "publish_worker_loop",
    skip(transport, rx, metrics),
    fields(endpoint = %name)
)]
async fn publish_worker<T>(
    transport: Arc<T>,
    mut rx: mpsc::UnboundedReceiver<Request>,
    metrics: Arc<EndpointMetrics>,
    name: String,
) where
    T: Transport + Sync,
{
    debug!(endpoint = %name, "Publish worker started");

    let mut drained = Vec::with_capacity(MAX_BATCH_SIZE);
    loop {
        // Waits for at least one request, then takes whatever else is ready.
        if rx.recv_many(&mut drained, MAX_BATCH_SIZE).await == 0 {
            // Every sender dropped and the queue is empty
            break;
        }

        // Nothing can follow Stop: the sender is owned by the handle that sent it.
        let mut stopped = false;
        let batch: Vec<PublishRequest> = drained
            .drain(..)
            .filter_map(|request| match request {
                Request::Publish(request) => Some(request),
                Request::Stop => {
                    stopped = true;
                    None
                }
            })
            .collect();
        metrics.dec_queue_len(batch.len());

        deliver_batch(&*transport, batch, &metrics, &name).await;

        if stopped {
            break;
        }
    }

    debug!(endpoint = %name, "Publish worker stopped");
}

/// Deliver one drained batch
///
/// Consecutive requests sharing a URI and auth header go out in one call.
async fn deliver_batch<T>(
    transport: &T,
    batch: Vec<PublishRequest>,
    metrics: &EndpointMetrics,
    name: &str,
) where
    T: Transport + Sync,
{
    let mut requests = batch.into_iter().peekable();
    while let Some(first) = requests.next() {
        let uri = first.uri.clone();
        let auth_header = first.auth_header.clone();

        let mut messages = vec![first.message];
        let mut callbacks = vec![first.callback];
        while let Some(next) =
            requests.next_if(|r| r.uri == uri && r.auth_header == auth_header)
        {
            messages.push(next.message);
            callbacks.push(next.callback);
        }

        let count = messages.len();
        debug!(endpoint = %name, items = count, "Delivering batch");
        observability::metrics::record_batch(name, count);
        metrics.inc_call_count();

        let result = match AssertUnwindSafe(pub_call(transport, &uri, &auth_header, &messages))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload);
                error!(endpoint = %name, items = count, panic = %message, "Transport panicked");
                Err(PubControlError::transport(&uri, format!("PANIC: {message}")))
            }
        };
        match &result {
            Ok(()) => metrics.add_published(count as u64),
            Err(e) => {
                metrics.add_failures(count as u64);
                warn!(endpoint = %name, items = count, error = %e, "Batch delivery failed");
            }
        }
        observability::metrics::record_publish(name, count, result.is_ok());

        let result = result.map_err(Arc::new);
        for callback in callbacks.into_iter().flatten() {
            let outcome = result.clone();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(outcome))) {
                error!(
                    endpoint = %name,
                    panic = %panic_message(payload),
                    "Publish callback panicked"
                );
            }
        }
    }
}
