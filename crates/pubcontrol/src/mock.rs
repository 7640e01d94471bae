//! Scripted in-memory transport for unit tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use contracts::{PubControlError, Transport, TransportRequest, TransportResponse};

/// One recorded POST
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub url: String,
    pub authorization: String,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Behavior {
    Respond { status: u16, body: String },
    Unreachable,
    Panic,
}

/// Transport that records calls and answers per endpoint URI
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    behaviors: Mutex<HashMap<String, Behavior>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, uri: &str, status: u16, body: &str) {
        self.set(
            uri,
            Behavior::Respond {
                status,
                body: body.to_string(),
            },
        );
    }

    pub fn unreachable(&self, uri: &str) {
        self.set(uri, Behavior::Unreachable);
    }

    pub fn panic_on(&self, uri: &str) {
        self.set(uri, Behavior::Panic);
    }

    pub fn delay(&self, uri: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(uri.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn set(&self, uri: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(uri.to_string(), behavior);
    }
}

impl Transport for MockTransport {
    async fn post(&self, request: TransportRequest) -> Result<TransportResponse, PubControlError> {
        let uri = request
            .url
            .strip_suffix("/publish/")
            .unwrap_or(&request.url)
            .to_string();

        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let items = body["items"].as_array().cloned().unwrap_or_default();
        self.calls.lock().unwrap().push(RecordedCall {
            url: request.url.clone(),
            authorization: request.header("Authorization").unwrap_or_default().to_string(),
            items,
        });

        let delay = self.delays.lock().unwrap().get(&uri).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self.behaviors.lock().unwrap().get(&uri).cloned();
        match behavior {
            None => Ok(TransportResponse {
                status: 200,
                body: "Published".to_string(),
            }),
            Some(Behavior::Respond { status, body }) => Ok(TransportResponse { status, body }),
            Some(Behavior::Unreachable) => Err(PubControlError::transport(
                request.url,
                "connection refused",
            )),
            Some(Behavior::Panic) => panic!("transport exploded for {uri}"),
        }
    }
}
