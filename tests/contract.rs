// tests/contract.rs
//! Ordered walk through the stock service contract. Runs against an
//! in-process server unless `STOCKS_BASE_URL` names a running one, which is
//! expected to hold none of the fixture symbols.

mod common;

use common::{fixture_stocks, TestServer};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const SYMBOLS: [&str; 3] = ["NVDA", "AAPL", "GOOG"];

#[tokio::test]
async fn stock_portfolio_contract() {
    let server = TestServer::from_env_or_spawn().await;
    let stocks = fixture_stocks();
    let baseline_count = server.list_stocks().await.len();
    let baseline_value = server.portfolio_value().await;

    // Posting the first three fixture stocks yields distinct ids.
    let mut ids: HashMap<String, String> = HashMap::new();
    let mut seen = HashSet::new();
    for stock in &stocks[..3] {
        let id = server.create_stock(stock).await;
        assert!(seen.insert(id.clone()), "id {} was handed out twice", id);
        ids.insert(stock["symbol"].as_str().unwrap().to_string(), id);
    }

    let response = server.get(&format!("/stocks/{}", ids["NVDA"])).await;
    assert_eq!(response.status(), StatusCode::OK);
    let nvda: Value = response.json().await.unwrap();
    assert_eq!(nvda["symbol"], "NVDA");
    assert_eq!(nvda["id"], ids["NVDA"].as_str());

    assert_eq!(server.list_stocks().await.len(), baseline_count + 3);

    let mut stock_values = HashMap::new();
    for symbol in SYMBOLS {
        let response = server.get(&format!("/stock-value/{}", ids[symbol])).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["symbol"], symbol);
        stock_values.insert(symbol, body["stock_value"].as_f64().unwrap());
    }

    // Live feeds may drift between the two queries, hence the tolerance.
    let portfolio_value = server.portfolio_value().await;
    let stocks_value: f64 = baseline_value + stock_values.values().sum::<f64>();
    assert!(
        portfolio_value * 0.97 <= stocks_value && stocks_value <= portfolio_value * 1.03,
        "sum of stock values {} is not within 3% of portfolio value {}",
        stocks_value,
        portfolio_value
    );

    let missing_symbol = &stocks[6];
    assert!(missing_symbol.get("symbol").is_none());
    let response = server.post_json("/stocks", missing_symbol).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.delete(&format!("/stocks/{}", ids["AAPL"])).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server.get(&format!("/stocks/{}", ids["AAPL"])).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(server.list_stocks().await.len(), baseline_count + 2);

    let bad_date = &stocks[7];
    let response = server.post_json("/stocks", bad_date).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Leave an external service as we found it.
    for symbol in ["NVDA", "GOOG"] {
        let response = server.delete(&format!("/stocks/{}", ids[symbol])).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
    assert_eq!(server.list_stocks().await.len(), baseline_count);
}
