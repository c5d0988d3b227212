use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use secrecy::Secret;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use contract_service::config::{Config, ServerConfig, WebhookConfig};
use contract_service::startup::Application;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    /// Events captured by the webhook sink, in arrival order.
    pub webhooks: Arc<Mutex<Vec<Value>>>,
}

async fn sink_handler(
    State(received): State<Arc<Mutex<Vec<Value>>>>,
    Json(body): Json<Value>,
) -> StatusCode {
    received.lock().unwrap().push(body);
    StatusCode::OK
}

/// Spawn a capture server the emitter delivers webhooks to.
async fn spawn_webhook_sink() -> (String, Arc<Mutex<Vec<Value>>>) {
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/", post(sink_handler))
        .with_state(received.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind webhook sink");
    let url = format!("http://127.0.0.1:{}/", listener.local_addr().unwrap().port());

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (url, received)
}

impl TestApp {
    pub async fn spawn() -> Self {
        let (sink_url, webhooks) = spawn_webhook_sink().await;

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            webhooks: WebhookConfig {
                targets: vec![sink_url],
                secret: Secret::new("test-secret".to_string()),
            },
            service_name: "contract-service-test".to_string(),
            log_level: "info".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the server to be ready by polling the health endpoint
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            client,
            webhooks,
        }
    }

    pub async fn create_customer(&self, id: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/customers", self.address))
            .json(&serde_json::json!({ "id": id }))
            .send()
            .await
            .expect("Failed to create customer")
    }

    pub async fn create_contract(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/contracts", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to create contract")
    }

    pub async fn edit_contract(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/contracts/edit", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to edit contract")
    }

    pub async fn get_contract(&self, contract_id: &str) -> Value {
        self.client
            .get(format!("{}/contracts/{}", self.address, contract_id))
            .send()
            .await
            .expect("Failed to get contract")
            .json()
            .await
            .expect("Contract response was not JSON")
    }

    pub async fn get_customer(&self, customer_id: &str) -> Value {
        self.client
            .get(format!("{}/customers/{}", self.address, customer_id))
            .send()
            .await
            .expect("Failed to get customer")
            .json()
            .await
            .expect("Customer response was not JSON")
    }

    pub async fn set_balance(&self, customer_id: &str, product_id: &str, amount: i64) -> reqwest::Response {
        self.client
            .post(format!("{}/customers/{}/balance", self.address, customer_id))
            .json(&serde_json::json!({ "product_id": product_id, "amount": amount }))
            .send()
            .await
            .expect("Failed to set balance")
    }

    /// Wait until at least `min` webhooks of `event_type` arrived, then
    /// return all of them. Delivery is fire-and-forget, so callers poll.
    pub async fn wait_for_webhooks(&self, event_type: &str, min: usize) -> Vec<Value> {
        for _ in 0..40 {
            let matching = self.captured_webhooks(event_type);
            if matching.len() >= min {
                return matching;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
        self.captured_webhooks(event_type)
    }

    pub fn captured_webhooks(&self, event_type: &str) -> Vec<Value> {
        self.webhooks
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event["type"] == event_type)
            .cloned()
            .collect()
    }
}
