//! Integration test harness for the device warranty service.
//!
//! Each [`TestServer`] runs the real router on an ephemeral port over fresh
//! in-memory stores, so tests are isolated and need no database.
//!
//! ```bash
//! cargo test -p device-warranty-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use device_warranty_server::config::{JwtConfig, ServerConfig, StorageBackend};
use device_warranty_server::db::Stores;
use device_warranty_server::models::{Passport, PassportDraft};
use device_warranty_server::state::AppState;

/// Signing secret shared by every test server.
pub const TEST_JWT_SECRET: &str = "kX9#mP2$vL7@nQ4&wR8*jT3^bY6!cF1%";

/// Password used by [`registration`] and [`TestServer::admin_token`].
pub const TEST_PASSWORD: &str = "Password1";

/// A running server plus direct access to its state.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: Client,
    /// Passport covering `ABC1..=ABC9999` with a 24 month warranty.
    pub passport: Passport,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: None,
        host: [127, 0, 0, 1].into(),
        port: 0,
        storage: StorageBackend::Memory,
        jwt: JwtConfig {
            secret: SecretString::from(TEST_JWT_SECRET.to_owned()),
            validity: Duration::from_secs(24 * 60 * 60),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestServer {
    pub async fn spawn() -> Self {
        let stores = Stores::memory();
        let passport = stores
            .passports
            .create(&PassportDraft {
                name: "TestPassport".to_owned(),
                model: "M1".to_owned(),
                serial_prefix: "ABC".to_owned(),
                from_serial_number: 1,
                to_serial_number: 9999,
                warranty_months: 24,
            })
            .await
            .expect("Failed to seed passport");
        let state = AppState::with_stores(test_config(), stores);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let app = device_warranty_server::app(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            client: Client::new(),
            passport,
            handle,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    #[must_use]
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    #[must_use]
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    #[must_use]
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    /// Register through the API and return the `{token, user}` body.
    pub async fn register(&self, email: &str, phone: &str, serial: &str) -> Value {
        let resp = self
            .post("/api/v1/users/registration")
            .json(&registration(email, phone, serial))
            .send()
            .await
            .expect("Registration request failed");
        assert!(resp.status().is_success(), "registration failed: {}", resp.status());
        resp.json().await.expect("Registration body is not JSON")
    }

    /// Create an administrator directly and log in through the API.
    pub async fn admin_token(&self) -> String {
        self.state
            .accounts()
            .create_admin("Admin", "admin@x.com", "999", "HQ", TEST_PASSWORD)
            .await
            .expect("Failed to create admin");
        self.login_token("admin@x.com", TEST_PASSWORD).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.post("/api/v1/users/login")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Login request failed")
    }

    pub async fn login_token(&self, username: &str, password: &str) -> String {
        let body: Value = self
            .login(username, password)
            .await
            .json()
            .await
            .expect("Login body is not JSON");
        body["token"]
            .as_str()
            .expect("Login response has no token")
            .to_owned()
    }
}

/// A registration body with fixed name, address, password and purchase date.
#[must_use]
pub fn registration(email: &str, phone: &str, serial: &str) -> Value {
    json!({
        "fullName": "Test User",
        "password": TEST_PASSWORD,
        "email": email,
        "phone": phone,
        "address": "Somewhere 1",
        "purchaseDate": "2024-01-15",
        "deviceSerialNumber": serial,
    })
}

/// Read a JSON error body and return its `errorCode`.
pub async fn error_code(resp: Response) -> i64 {
    let body: Value = resp.json().await.expect("Error body is not JSON");
    body["errorCode"].as_i64().expect("Error body has no errorCode")
}
