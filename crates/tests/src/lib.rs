//! # Integration Tests
//!
//! Cross-crate tests against real HTTP mock servers.
//!
//! Covers:
//! - the publish wire contract (path, headers, body)
//! - background batching as seen by the server
//! - configuration file to orchestrator
//! - sequential, parallel and queued fan-out

#[cfg(test)]
mod contract_tests {
    use contracts::{EndpointConfig, Item, PubControlConfig};
    use pubcontrol::ValueFormat;
    use serde_json::json;

    #[test]
    fn test_exported_item_shape() {
        let item = Item::single(ValueFormat::new("http-stream", json!({"content": "hi\n"})))
            .with_id("2")
            .with_prev_id("1");

        let mut message = item.export().unwrap();
        message.set_channel("news");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "http-stream": {"content": "hi\n"},
                "id": "2",
                "prev-id": "1",
                "channel": "news"
            })
        );
    }

    #[test]
    fn test_default_config_is_empty() {
        let config = PubControlConfig::default();
        assert!(config.endpoints.is_empty());
        assert_eq!(EndpointConfig::default().uri, None);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ClientSettings, Item, PubControlConfig, PubControlError, SharedError};
    use pubcontrol::{EndpointClient, HttpTransport, PubControl, ValueFormat};
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn item(content: &str) -> Item {
        Item::single(ValueFormat::new("http-stream", json!({ "content": content })))
    }

    async fn server_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish/"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream says no"))
            .mount(&server)
            .await;
        server
    }

    async fn published_items(server: &MockServer) -> Vec<Vec<Value>> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request: &Request| {
                let body: Value = serde_json::from_slice(&request.body).unwrap();
                body["items"].as_array().cloned().unwrap()
            })
            .collect()
    }

    fn toml_for(servers: &[&MockServer]) -> String {
        let mut content = String::from("[client]\ntimeout_ms = 2000\n");
        for server in servers {
            content.push_str(&format!(
                "\n[[endpoints]]\nuri = \"{}\"\niss = \"realm\"\nkey = \"secret\"\n",
                server.uri()
            ));
        }
        content
    }

    #[tokio::test]
    async fn test_wire_contract() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish/"))
            .and(header("Content-Type", "application/json"))
            .and(header("Authorization", "Basic #user:#pass"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = EndpointClient::http(server.uri()).unwrap();
        client.set_auth_basic("user", "pass");
        client
            .publish("news", &item("hello").with_id("7"))
            .await
            .unwrap();

        let items = published_items(&server).await;
        assert_eq!(
            items,
            vec![vec![json!({
                "http-stream": {"content": "hello"},
                "id": "7",
                "channel": "news"
            })]]
        );
    }

    #[tokio::test]
    async fn test_async_publishes_are_batched() {
        let server = server_answering(200).await;
        let client = EndpointClient::http(server.uri()).unwrap();

        let outcomes: Arc<Mutex<Vec<bool>>> = Arc::default();
        for i in 0..25 {
            let sink = Arc::clone(&outcomes);
            client
                .publish_async(
                    "news",
                    &item(&i.to_string()),
                    Some(Box::new(move |result: Result<(), SharedError>| {
                        sink.lock().unwrap().push(result.is_ok())
                    })),
                )
                .unwrap();
        }
        client.finish().await;

        let batches = published_items(&server).await;
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);

        let order: Vec<String> = batches
            .iter()
            .flatten()
            .map(|m| m["http-stream"]["content"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..25).map(|i| i.to_string()).collect();
        assert_eq!(order, expected);

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 25);
        assert!(outcomes.iter().all(|ok| *ok));
    }

    #[tokio::test]
    async fn test_config_file_to_jwt_publish() {
        let server = server_answering(200).await;
        let config = ConfigLoader::load_from_str(&toml_for(&[&server]), ConfigFormat::Toml).unwrap();

        let pub_control = PubControl::new(&config).unwrap();
        assert_eq!(pub_control.client_count().await, 1);
        pub_control.publish("news", &item("x")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[0]
            .headers
            .get("Authorization")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let token = authorization.strip_prefix("Bearer ").unwrap();
        assert_eq!(token.split('.').count(), 3);
    }

    #[tokio::test]
    async fn test_bare_key_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/publish/"))
            .and(header("Authorization", "Bearer pre-shared"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let content = format!(
            r#"{{"endpoints": [{{"uri": "{}", "key": "pre-shared"}}, {{"key": "no-uri"}}]}}"#,
            server.uri()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Json).unwrap();
        let pub_control = PubControl::new(&config).unwrap();

        assert_eq!(pub_control.client_count().await, 1);
        pub_control.publish("news", &item("x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_broken_entry_does_not_block_good_one() {
        let server = server_answering(200).await;
        let mut content = toml_for(&[&server]);
        content.push_str("\n[[endpoints]]\nuri = \"http://127.0.0.1:9\"\niss = \"realm\"\n");

        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();
        assert_eq!(config_loader::usable_endpoints(&config), 1);
        assert_eq!(config_loader::warnings(&config).len(), 1);

        let pub_control = PubControl::new(&config).unwrap();
        assert_eq!(pub_control.client_count().await, 1);
        pub_control.publish("news", &item("x")).await.unwrap();
        assert_eq!(published_items(&server).await.len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_stops_at_first_failure() {
        let failing = server_answering(500).await;
        let healthy = server_answering(200).await;
        let config = ConfigLoader::load_from_str(
            &toml_for(&[&failing, &healthy]),
            ConfigFormat::Toml,
        )
        .unwrap();
        let pub_control = PubControl::new(&config).unwrap();

        let err = pub_control.publish("news", &item("x")).await.unwrap_err();
        match err {
            PubControlError::Publish { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream says no");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(published_items(&healthy).await.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_reports_each_failure() {
        let failing = server_answering(500).await;
        let healthy = server_answering(200).await;
        let config = ConfigLoader::load_from_str(
            &toml_for(&[&healthy, &failing]),
            ConfigFormat::Toml,
        )
        .unwrap();
        let pub_control = PubControl::new(&config).unwrap();

        let err = pub_control
            .publish_parallel("news", &item("x"))
            .await
            .unwrap_err();
        let PubControlError::Aggregate {
            failed,
            total,
            ref errors,
            ..
        } = err
        else {
            panic!("expected aggregate error, got {err}");
        };
        assert_eq!((failed, total), (1, 2));
        assert!(errors[0].starts_with(&failing.uri()));
        assert!(err
            .to_string()
            .starts_with("1/2 client(s) failed to publish to channel: news Errors: ["));

        assert_eq!(published_items(&healthy).await.len(), 1);
    }

    #[tokio::test]
    async fn test_async_fan_out_single_callback() {
        let failing = server_answering(503).await;
        let healthy = server_answering(200).await;
        let config = PubControlConfig {
            client: ClientSettings::default(),
            endpoints: vec![
                contracts::EndpointConfig::uri(healthy.uri()),
                contracts::EndpointConfig::uri(failing.uri()),
            ],
        };
        let pub_control = PubControl::new(&config).unwrap();

        let outcomes: Arc<Mutex<Vec<Result<(), SharedError>>>> = Arc::default();
        let sink = Arc::clone(&outcomes);
        pub_control
            .publish_async(
                "news",
                &item("x"),
                Some(Box::new(move |result: Result<(), SharedError>| {
                    sink.lock().unwrap().push(result)
                })),
            )
            .await
            .unwrap();
        pub_control.finish().await;

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        let err = outcomes[0].as_ref().unwrap_err();
        assert!(matches!(**err, PubControlError::Publish { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let transport = Arc::new(HttpTransport::new(&ClientSettings::default()).unwrap());
        let client = EndpointClient::with_transport("http://127.0.0.1:9", transport);

        let err = client.publish("news", &item("x")).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(client.metrics().snapshot().failure_count, 1);
    }

    #[tokio::test]
    async fn test_reconfigure_replaces_endpoints() {
        let old = server_answering(200).await;
        let new = server_answering(200).await;
        let pub_control = PubControl::new(&PubControlConfig {
            endpoints: vec![contracts::EndpointConfig::uri(old.uri())],
            ..Default::default()
        })
        .unwrap();

        pub_control.remove_all_clients().await;
        let added = pub_control
            .apply_config(&[contracts::EndpointConfig::uri(new.uri())])
            .await;
        assert_eq!(added, 1);

        pub_control.publish("news", &item("x")).await.unwrap();
        assert!(published_items(&old).await.is_empty());
        assert_eq!(published_items(&new).await.len(), 1);
    }
}
