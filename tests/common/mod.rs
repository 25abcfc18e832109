#![allow(dead_code)]

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use agent_registry::api::create_router;
use agent_registry::config::Config;
use agent_registry::db::Database;
use agent_registry::state::AppState;

/// Test client for API calls
pub struct TestClient {
    pub base_url: String,
    pub client: Client,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn put<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// POST /agents/register and return the parsed body
    pub async fn register(&self, body: &Value) -> Value {
        let resp = self.post("/agents/register", body).await;
        assert_eq!(resp.status(), 200, "register failed");
        resp.json().await.expect("Invalid JSON body")
    }
}

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".into(),
        port: 0,
        database_path: ":memory:".into(),
        version: "test".into(),
    }
}

/// Serve an already built state on a random port
pub async fn serve(state: Arc<AppState>) -> TestClient {
    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestClient::new(format!("http://{}", addr))
}

/// Start a test server backed by an in-memory database
pub async fn start_test_server() -> (TestClient, Arc<AppState>) {
    let db = Database::open_in_memory().expect("Failed to open database");
    let state = AppState::new(test_config(), db);
    let client = serve(Arc::clone(&state)).await;
    (client, state)
}

/// Random signing key
pub fn signing_key() -> SigningKey {
    let seed: [u8; 32] = rand::thread_rng().gen();
    SigningKey::from_bytes(&seed)
}

/// Base58 public key of a fresh random keypair
pub fn public_key() -> String {
    bs58::encode(signing_key().verifying_key().as_bytes()).into_string()
}

pub fn key_body(key_id: &str, public_key: &str) -> Value {
    json!({
        "key_id": key_id,
        "public_key": public_key,
        "algorithm": "ed25519"
    })
}

/// Generate a unique test domain
pub fn unique_domain(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(10000..99999);
    format!("https://{}-{}.example", prefix, suffix)
}
