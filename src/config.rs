// src/config.rs
use crate::prices::{AlphaVantageFeed, FixedPriceFeed, PriceFeed};
use clap::Parser;
use log::info;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Parser)]
#[command(name = "stock_portfolio", version, about = "Stock portfolio REST service")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "STOCKS_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "STOCKS_PORT", default_value_t = 5001)]
    pub port: u16,

    /// Alpha Vantage API key for live prices.
    #[arg(long, env = "ALPHA_VANTAGE_API_KEY", hide_env_values = true)]
    pub alpha_vantage_key: Option<String>,

    /// JSON file of fixed prices, e.g. {"NVDA": 140.15}.
    #[arg(
        long,
        env = "STOCKS_PRICES_FILE",
        conflicts_with = "alpha_vantage_key"
    )]
    pub prices_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no price source configured: pass --alpha-vantage-key or --prices-file")]
    NoPriceSource,

    #[error("failed to read prices file {path}: {source}")]
    ReadPrices {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("prices file {0} lists no symbols")]
    EmptyPrices(PathBuf),

    #[error("failed to parse prices file {path}: {source}")]
    ParsePrices {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn price_feed(&self) -> Result<Arc<dyn PriceFeed>, ConfigError> {
        if let Some(key) = &self.alpha_vantage_key {
            info!("Using Alpha Vantage price feed.");
            return Ok(Arc::new(AlphaVantageFeed::new(key.clone())));
        }
        let path = self.prices_file.as_ref().ok_or(ConfigError::NoPriceSource)?;
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadPrices {
            path: path.clone(),
            source,
        })?;
        let feed = FixedPriceFeed::from_json(&raw).map_err(|source| ConfigError::ParsePrices {
            path: path.clone(),
            source,
        })?;
        if feed.is_empty() {
            return Err(ConfigError::EmptyPrices(path.clone()));
        }
        info!(
            "Using fixed prices for {} symbols from {}.",
            feed.len(),
            path.display()
        );
        Ok(Arc::new(feed))
    }
}
