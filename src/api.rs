// src/api.rs
use crate::error::{handle_rejection, ApiError};
use crate::models::{round_cents, PortfolioValue, StockFilter, StockPayload, StockValue};
use crate::prices::PriceFeed;
use crate::store::StockStore;
use chrono::Local;
use log::{error, info};
use serde_json::json;
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<StockStore>,
    pub prices: Arc<dyn PriceFeed>,
}

impl AppState {
    pub fn new(store: Arc<StockStore>, prices: Arc<dyn PriceFeed>) -> Self {
        AppState { store, prices }
    }
}

pub fn routes(state: AppState) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let list = warp::path!("stocks")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(list_stocks_handler);

    let create = warp::path!("stocks")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_stock_handler);

    let get = warp::path!("stocks" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_stock_handler);

    let replace = warp::path!("stocks" / String)
        .and(warp::put())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(replace_stock_handler);

    let delete = warp::path!("stocks" / String)
        .and(warp::delete())
        .and(with_state(state.clone()))
        .and_then(delete_stock_handler);

    let stock_value = warp::path!("stock-value" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(stock_value_handler);

    let portfolio_value = warp::path!("portfolio-value")
        .and(warp::get())
        .and(with_state(state))
        .and_then(portfolio_value_handler);

    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({"status": "ok"})));

    list.or(create)
        .or(get)
        .or(replace)
        .or(delete)
        .or(stock_value)
        .or(portfolio_value)
        .or(health)
        .recover(handle_rejection)
        .with(warp::log("stock_portfolio::api"))
}

/// Binds the service to `addr` and returns the bound address together with
/// the server future, which resolves once `shutdown` completes.
pub fn bind(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(SocketAddr, impl Future<Output = ()> + Send + 'static), warp::Error> {
    warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, shutdown)
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body() -> impl Filter<Extract = (StockPayload,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

async fn list_stocks_handler(
    query: HashMap<String, String>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = StockFilter::from_query(&query).map_err(warp::reject::custom)?;
    let stocks = state.store.list(&filter).await;
    info!("Listed {} stocks.", stocks.len());
    Ok(warp::reply::json(&stocks))
}

async fn create_stock_handler(
    payload: StockPayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let new_stock = match payload.into_new_stock() {
        Ok(new_stock) => new_stock,
        Err(e) => {
            error!("Rejected stock: {}", e);
            return Err(warp::reject::custom(e));
        }
    };
    match state.store.insert(new_stock).await {
        Ok(stock) => {
            info!("Stock {} added with id {}.", stock.symbol, stock.id);
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({ "id": stock.id })),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Failed to add stock: {}", e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn get_stock_handler(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    match state.store.get(&id).await {
        Some(stock) => {
            info!("Stock {} retrieved.", id);
            Ok(warp::reply::json(&stock))
        }
        None => {
            error!("Stock {} not found.", id);
            Err(warp::reject::custom(ApiError::NotFound(id)))
        }
    }
}

async fn replace_stock_handler(
    id: String,
    payload: StockPayload,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let new_stock = match payload.into_replacement(&id) {
        Ok(new_stock) => new_stock,
        Err(e) => {
            error!("Rejected update of stock {}: {}", id, e);
            return Err(warp::reject::custom(e));
        }
    };
    match state.store.replace(&id, new_stock).await {
        Ok(stock) => {
            info!("Stock {} updated.", stock.id);
            Ok(warp::reply::json(&json!({ "id": stock.id })))
        }
        Err(e) => {
            error!("Failed to update stock {}: {}", id, e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn delete_stock_handler(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    match state.store.remove(&id).await {
        Ok(_) => {
            info!("Stock {} deleted.", id);
            Ok(warp::reply::with_status(
                warp::reply(),
                StatusCode::NO_CONTENT,
            ))
        }
        Err(e) => {
            error!("Failed to delete stock {}: {}", id, e);
            Err(warp::reject::custom(e))
        }
    }
}

async fn stock_value_handler(id: String, state: AppState) -> Result<impl Reply, Rejection> {
    let stock = match state.store.get(&id).await {
        Some(stock) => stock,
        None => {
            error!("Stock {} not found.", id);
            return Err(warp::reject::custom(ApiError::NotFound(id)));
        }
    };
    match state.prices.latest_price(&stock.symbol).await {
        Ok(price) => {
            let value = StockValue::new(&stock, price);
            info!("Stock {} valued at {}.", value.symbol, value.stock_value);
            Ok(warp::reply::json(&value))
        }
        Err(e) => {
            error!(
                "Failed to price {} via {}: {}",
                stock.symbol,
                state.prices.id(),
                e
            );
            Err(warp::reject::custom(ApiError::from(e)))
        }
    }
}

async fn portfolio_value_handler(state: AppState) -> Result<impl Reply, Rejection> {
    // Records are cloned out so the store lock is not held across price lookups.
    let stocks = state.store.list(&StockFilter::default()).await;
    let mut total = 0.0;
    for stock in &stocks {
        match state.prices.latest_price(&stock.symbol).await {
            Ok(price) => total += StockValue::new(stock, price).stock_value,
            Err(e) => {
                error!(
                    "Failed to price {} via {}: {}",
                    stock.symbol,
                    state.prices.id(),
                    e
                );
                return Err(warp::reject::custom(ApiError::from(e)));
            }
        }
    }
    let value = PortfolioValue {
        date: Local::now().date_naive(),
        portfolio_value: round_cents(total),
    };
    info!(
        "Portfolio of {} stocks valued at {}.",
        stocks.len(),
        value.portfolio_value
    );
    Ok(warp::reply::json(&value))
}
