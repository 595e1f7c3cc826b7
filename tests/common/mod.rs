#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use pricelist_api::{
    config::AppConfig,
    db,
    services::{catalog::ProductInput, customers::CustomerInput},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

/// Helper harness for spinning up an application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.company_name = "Promocionales de Prueba".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = pricelist_api::app(state.clone());

        Self { router, state }
    }

    /// Send a request against the router, JSON-encoding `body` when present.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("router error")
    }

    /// Send a raw body without any content type.
    pub async fn request_raw(&self, method: Method, uri: &str, body: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body.to_string()))
                    .expect("failed to build request"),
            )
            .await
            .expect("router error")
    }

    /// Send a request and decode the JSON response.
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn create_product(&self, clave: &str, precio: Decimal) -> pricelist_api::entities::product::Model {
        self.state
            .services
            .catalog
            .create(product_input(clave, precio))
            .await
            .expect("create product")
    }

    pub async fn create_customer(&self, nombre_empresa: &str) -> pricelist_api::entities::customer::Model {
        self.state
            .services
            .customers
            .create(CustomerInput {
                nombre_empresa: Some(nombre_empresa.to_string()),
                ..Default::default()
            })
            .await
            .expect("create customer")
    }
}

/// A valid product form using seeded reference-list labels.
pub fn product_input(clave: &str, precio: Decimal) -> ProductInput {
    ProductInput {
        clave_producto: clave.to_string(),
        tipo_producto: format!("Producto {}", clave),
        impresion: "Serigrafia".to_string(),
        colores: "Rojo".to_string(),
        precio_unitario: Some(precio),
        available: true,
        ..Default::default()
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    }
}

pub async fn response_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}
