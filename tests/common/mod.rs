#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use foodgram::config::Config;
use foodgram::db::{NewUser, Store, User};
use foodgram::state::SharedState;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// 1x1 transparent PNG
pub const PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

pub struct TestApp {
    pub router: Router,
    pub store: Store,
    pub config: Config,
    root: PathBuf,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let root = std::env::temp_dir().join(format!("foodgram-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root).expect("create test dir");

        let mut config = Config::default();
        config.general.database_path = format!("sqlite:{}", root.join("test.db").display());
        config.media.root_path = root.join("media").display().to_string();
        config.security.argon2_memory_cost_kib = 1024;
        config.security.argon2_time_cost = 1;
        config.observability.metrics_enabled = false;
        adjust(&mut config);

        let shared = Arc::new(
            SharedState::new(config.clone())
                .await
                .expect("Failed to create shared state"),
        );
        let store = shared.store.clone();
        let state = foodgram::api::create_app_state(shared, None);
        let router = foodgram::api::router(state).await;

        Self {
            router,
            store,
            config,
            root,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.store
            .create_user(
                NewUser {
                    email: format!("{username}@example.com"),
                    username: username.to_string(),
                    first_name: "Test".to_string(),
                    last_name: username.to_string(),
                    password: "password123".to_string(),
                },
                &self.config.security,
            )
            .await
            .expect("create user")
    }

    pub async fn tag(&self, name: &str, color: &str, slug: &str) -> i32 {
        self.store.add_tag(name, color, slug).await.expect("add tag").id
    }

    pub async fn ingredient(&self, name: &str, unit: &str) -> i32 {
        self.store
            .add_ingredient(name, unit)
            .await
            .expect("add ingredient")
            .id
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("send");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes()
            .to_vec();
        (status, bytes)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, token, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.json(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(token), body).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.json(Method::DELETE, uri, Some(token), None).await
    }

    /// Create a recipe through the API and return its id.
    pub async fn recipe(
        &self,
        token: &str,
        name: &str,
        tags: &[i32],
        ingredients: &[(i32, i32)],
    ) -> i64 {
        let (status, body) = self
            .post("/api/recipes/", token, Some(recipe_body(name, tags, ingredients)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create recipe: {body}");
        body["id"].as_i64().expect("recipe id")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

pub fn recipe_body(name: &str, tags: &[i32], ingredients: &[(i32, i32)]) -> Value {
    serde_json::json!({
        "tags": tags,
        "ingredients": ingredients
            .iter()
            .map(|(id, amount)| serde_json::json!({"id": id, "amount": amount}))
            .collect::<Vec<_>>(),
        "image": PNG,
        "name": name,
        "text": "Mix everything.",
        "cooking_time": 10,
    })
}

pub fn ids(page: &Value) -> Vec<i64> {
    page["results"]
        .as_array()
        .map(|items| items.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default()
}
