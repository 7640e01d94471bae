//! HttpTransport - reqwest-backed POST transport

use std::time::Duration;

use tracing::{debug, instrument, warn};

use contracts::{ClientSettings, PubControlError, Transport, TransportRequest, TransportResponse};

/// Transport issuing real HTTP POSTs
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from client settings
    ///
    /// # Errors
    /// `Config` if the HTTP client cannot be built
    pub fn new(settings: &ClientSettings) -> Result<Self, PubControlError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|e| PubControlError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Create a transport with default settings
    pub fn with_defaults() -> Result<Self, PubControlError> {
        Self::new(&ClientSettings::default())
    }
}

impl Transport for HttpTransport {
    #[instrument(
        name = "http_transport_post",
        skip(self, request),
        fields(url = %request.url, bytes = request.body.len())
    )]
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, PubControlError> {
        let mut http_request = self.client.post(&request.url).body(request.body);
        for (name, value) in &request.headers {
            http_request = http_request.header(name, value);
        }

        let response = http_request.send().await.map_err(|e| {
            warn!(url = %request.url, error = %e, "Request failed");
            if e.is_timeout() {
                PubControlError::transport_timeout(&request.url, e.to_string())
            } else if e.is_connect() {
                PubControlError::transport(&request.url, format!("connection failed: {e}"))
            } else {
                PubControlError::transport(&request.url, e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                PubControlError::transport_timeout(&request.url, e.to_string())
            } else {
                PubControlError::transport(&request.url, format!("failed to read body: {e}"))
            }
        })?;

        debug!(status, "Received response");
        Ok(TransportResponse { status, body })
    }
}
