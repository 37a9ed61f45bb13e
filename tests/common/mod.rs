// tests/common/mod.rs
#![allow(dead_code)]

use reqwest::{Client, Response};
use serde_json::Value;
use std::sync::Arc;
use stock_portfolio::api;
use stock_portfolio::prices::FixedPriceFeed;
use stock_portfolio::store::StockStore;
use stock_portfolio::AppState;
use tokio::sync::oneshot;

/// Points the contract suite at an already-running service instead of an
/// in-process one, e.g. `STOCKS_BASE_URL=http://localhost:5001`.
pub const BASE_URL_ENV: &str = "STOCKS_BASE_URL";

pub fn fixture_stocks() -> Vec<Value> {
    serde_json::from_str(include_str!("../fixtures/stocks.json")).expect("valid stocks fixture")
}

pub fn fixture_prices() -> FixedPriceFeed {
    FixedPriceFeed::from_json(include_str!("../fixtures/prices.json"))
        .expect("valid prices fixture")
}

pub struct TestServer {
    base_url: String,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Starts a fresh service on an ephemeral port, priced from the fixture table.
    pub async fn spawn() -> Self {
        let state = AppState::new(Arc::new(StockStore::new()), Arc::new(fixture_prices()));
        let (tx, rx) = oneshot::channel::<()>();
        let (addr, server) = api::bind(state, ([127, 0, 0, 1], 0).into(), async move {
            let _ = rx.await;
        })
        .expect("bind test server");
        tokio::spawn(server);

        TestServer {
            base_url: format!("http://{}", addr),
            client: Client::new(),
            shutdown: Some(tx),
        }
    }

    pub async fn from_env_or_spawn() -> Self {
        match std::env::var(BASE_URL_ENV) {
            Ok(base_url) => TestServer {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: Client::new(),
                shutdown: None,
            },
            Err(_) => Self::spawn().await,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE request")
    }

    /// Creates a stock and returns its id, failing the test on any other status.
    pub async fn create_stock(&self, stock: &Value) -> String {
        let response = self.post_json("/stocks", stock).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("JSON body");
        body["id"].as_str().expect("string id").to_string()
    }

    pub async fn list_stocks(&self) -> Vec<Value> {
        let response = self.get("/stocks").await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.expect("JSON array")
    }

    pub async fn portfolio_value(&self) -> f64 {
        let response = self.get("/portfolio-value").await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("JSON body");
        body["portfolio value"].as_f64().expect("numeric portfolio value")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
