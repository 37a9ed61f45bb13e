// src/main.rs
use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info};
use stock_portfolio::api;
use stock_portfolio::config::Config;
use stock_portfolio::store::StockStore;
use stock_portfolio::AppState;
use std::sync::Arc;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = Config::parse();
    let prices = match config.price_feed() {
        Ok(prices) => prices,
        Err(e) => {
            error!("Failed to configure price feed: {}", e);
            return Err(e.into());
        }
    };

    info!("Starting the stock portfolio service...");
    let state = AppState::new(Arc::new(StockStore::new()), prices);
    let (addr, server) = api::bind(state, config.socket_addr(), shutdown_signal())?;

    info!("Server running on http://{}", addr);
    server.await;
    info!("Server stopped.");
    Ok(())
}
