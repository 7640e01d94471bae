//! Transport trait - outbound HTTP seam
//!
//! The publish core hands a fully-built POST to a transport and classifies
//! the returned status itself.

use bytes::Bytes;

use crate::PubControlError;

/// A single outbound POST
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Absolute destination URL
    pub url: String,
    /// Header name/value pairs, sent in order
    pub headers: Vec<(String, String)>,
    /// Encoded request body
    pub body: Bytes,
}

impl TransportRequest {
    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw endpoint answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Full response body as text
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in `[200, 300)`
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound POST interface
///
/// Implementations must surface network-level failures as
/// [`PubControlError::Transport`]; any HTTP answer, whatever its status,
/// is a successful transport call.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Issue the POST and read the full response body
    ///
    /// # Errors
    /// Returns transport error (DNS, connection, timeout)
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, PubControlError>;
}
