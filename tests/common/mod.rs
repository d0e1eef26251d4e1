#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use city_style_back::{
    AppConfig, AppState, app,
    models::Product,
    store::{MemoryStore, Store},
    utils::jwt,
};

pub const JWT_SECRET: &str = "test-secret";
pub const ADMIN_EMAIL: &str = "admin@citystyle.example";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn config(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("STORAGE_BACKEND".to_string(), "memory".to_string()),
        ("FRONTEND_URL".to_string(), "http://localhost:5173".to_string()),
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ("ADMIN_EMAILS".to_string(), ADMIN_EMAIL.to_string()),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    AppConfig::from_map(&vars).unwrap()
}

pub async fn spawn() -> TestApp {
    spawn_with(&[]).await
}

pub async fn spawn_with(extra: &[(&str, &str)]) -> TestApp {
    let config = config(extra);
    let store = Arc::new(MemoryStore::new());
    store.insert_product(product("hoodie", "Classic Hoodie", 60, &["M", "L"])).await;
    store.insert_product(product("tee", "Everyday Tee", 25, &["S", "M", "L"])).await;
    store.insert_product(product("cap", "Logo Cap", 15, &[])).await;

    let shared: Arc<dyn Store> = store.clone();
    let router = app::router(AppState::new(shared, &config), &config).unwrap();

    TestApp { router, store }
}

pub fn product(slug: &str, name: &str, price: i64, sizes: &[&str]) -> Product {
    let now = Utc::now();
    Product {
        slug: slug.to_string(),
        name: name.to_string(),
        category: "men".to_string(),
        image: format!("/images/{}.webp", slug),
        price: Decimal::from(price),
        original_price: None,
        badge: None,
        rating: Decimal::new(45, 1),
        reviews: 10,
        description: format!("{} in soft cotton", name),
        sizes: sizes.iter().map(|s| s.to_string()).collect(),
        colors: Vec::new(),
        features: Vec::new(),
        care_instructions: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

pub fn token(owner_id: &str, email: &str) -> String {
    jwt::generate_token(JWT_SECRET, owner_id, email).unwrap()
}

pub fn alice() -> String {
    token("uid-alice", "alice@example.com")
}

pub fn bob() -> String {
    token("uid-bob", "bob@example.com")
}

pub fn admin() -> String {
    token("uid-admin", ADMIN_EMAIL)
}

pub fn address() -> Value {
    serde_json::json!({
        "fullName": "Alice Rao",
        "phone": "9876543210",
        "line1": "12 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "pincode": "560001"
    })
}

pub struct Call<'a> {
    method: Method,
    uri: &'a str,
    token: Option<&'a str>,
    body: Option<Value>,
    headers: Vec<(&'a str, &'a str)>,
}

impl<'a> Call<'a> {
    pub fn new(method: Method, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            token: None,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn auth(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'a str, value: &'a str) -> Self {
        self.headers.push((name, value));
        self
    }

    pub async fn send(self, router: &Router) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        let request = match self.body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }
}

pub fn get(uri: &str) -> Call<'_> {
    Call::new(Method::GET, uri)
}

pub fn post(uri: &str) -> Call<'_> {
    Call::new(Method::POST, uri)
}

pub fn put(uri: &str) -> Call<'_> {
    Call::new(Method::PUT, uri)
}

pub fn patch(uri: &str) -> Call<'_> {
    Call::new(Method::PATCH, uri)
}

pub fn delete(uri: &str) -> Call<'_> {
    Call::new(Method::DELETE, uri)
}

pub fn money(value: &Value) -> f64 {
    value.as_f64().unwrap()
}
