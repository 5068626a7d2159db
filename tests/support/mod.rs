//! In-process harness driving the router over the in-memory store.

use argon2::Params;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

use opensase_inventory::{router, AppState, AuthSettings, EventPublisher, Stores};

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let auth = AuthSettings {
            secret: SecretString::from("integration-secret-integration-secret".to_string()),
            session_ttl: Duration::hours(1),
            hash_params: Params::new(Params::MIN_M_COST, 1, 1, None).expect("argon2 params"),
        };
        let state = AppState::new(&Stores::in_memory(), auth, EventPublisher::disabled());
        Self { router: router(state.clone()), state }
    }

    pub async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).expect("encode body"))
            }
            None => Body::empty(),
        };
        let response = self.router.clone().oneshot(builder.body(body).expect("request")).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
        (status, value)
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, path, Some(token), Some(body)).await
    }

    /// Register a customer and return `(token, user_id)`.
    pub async fn customer(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .call(Method::POST, "/auth/register", None, Some(json!({
                "first_name": "Test", "last_name": "User", "email": email, "password": "password1"
            })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (body["token"].as_str().expect("token").to_string(), body["user"]["id"].as_str().expect("id").to_string())
    }

    /// Seed an admin and log in as them.
    pub async fn admin(&self) -> String {
        self.state.services.auth.ensure_admin("Root", "Admin", "root@example.com", "rootpass").await.expect("seed admin");
        let (status, body) = self
            .call(Method::POST, "/auth/login", None, Some(json!({ "email": "root@example.com", "password": "rootpass" })))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().expect("token").to_string()
    }

    /// Create an active product and return its id.
    pub async fn product(&self, admin: &str, name: &str, price: &str, stock: i64) -> String {
        let (status, body) = self.post("/products", admin, json!({ "name": name, "price": price, "stock": stock })).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().expect("id").to_string()
    }
}

pub fn shipping() -> Value {
    json!({
        "full_name": "Ada Lovelace",
        "street": "12 St James's Square",
        "city": "London",
        "state": "Greater London",
        "postal_code": "SW1Y 4JH",
        "country": "UK",
        "phone": "+44 20 7946 0000"
    })
}
