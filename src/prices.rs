// src/prices.rs
//! Market price feeds used to value holdings.
//!
//! [`AlphaVantageFeed`] asks Alpha Vantage for the latest quote on every
//! lookup. [`FixedPriceFeed`] serves prices from a static table and is what
//! local runs and the test-suite use.

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("no price available for symbol {0}")]
    UnknownSymbol(String),

    #[error("rate limited by {provider}")]
    RateLimited { provider: &'static str },

    #[error("{provider}: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
}

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &'static str;

    /// Latest price per share for `symbol`.
    async fn latest_price(&self, symbol: &str) -> Result<f64, PriceError>;
}

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

pub struct AlphaVantageFeed {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageFeed {
    const PROVIDER: &'static str = "alpha_vantage";

    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, ALPHA_VANTAGE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        AlphaVantageFeed {
            client,
            api_key,
            base_url,
        }
    }

    fn provider_error(message: impl ToString) -> PriceError {
        PriceError::Provider {
            provider: Self::PROVIDER,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl PriceFeed for AlphaVantageFeed {
    fn id(&self) -> &'static str {
        Self::PROVIDER
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, PriceError> {
        let params = [
            ("function", "GLOBAL_QUOTE"),
            ("symbol", symbol),
            ("apikey", self.api_key.as_str()),
        ];
        debug!("Requesting quote for {} from {}", symbol, self.base_url);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(Self::provider_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited {
                provider: Self::PROVIDER,
            });
        }
        if !status.is_success() {
            return Err(Self::provider_error(format!("HTTP {}", status)));
        }

        let body: GlobalQuoteResponse = response.json().await.map_err(Self::provider_error)?;

        if let Some(message) = body.error_message {
            debug!("Alpha Vantage rejected {}: {}", symbol, message);
            return Err(PriceError::UnknownSymbol(symbol.to_string()));
        }
        // Alpha Vantage reports throttling in-band with a 200 status. The
        // Information field also carries invalid or premium key messages.
        if body.note.is_some() {
            return Err(PriceError::RateLimited {
                provider: Self::PROVIDER,
            });
        }
        if let Some(message) = body.information {
            if is_rate_limit_message(&message) {
                return Err(PriceError::RateLimited {
                    provider: Self::PROVIDER,
                });
            }
            return Err(Self::provider_error(message));
        }

        let raw = body
            .quote
            .and_then(|q| q.price)
            .ok_or_else(|| PriceError::UnknownSymbol(symbol.to_string()))?;
        let price: f64 = raw
            .parse()
            .map_err(|_| Self::provider_error(format!("unparseable price {:?}", raw)))?;
        info!("Fetched price {} for {}", price, symbol);
        Ok(price)
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("rate limit") || message.contains("requests per")
}

/// Prices served from a static symbol table. Symbols are matched
/// case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct FixedPriceFeed {
    prices: HashMap<String, f64>,
}

impl FixedPriceFeed {
    pub fn new<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        FixedPriceFeed {
            prices: prices
                .into_iter()
                .map(|(symbol, price)| (symbol.as_ref().to_ascii_uppercase(), price))
                .collect(),
        }
    }

    /// Parses a JSON object of the form `{"NVDA": 140.15, ...}`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let prices: HashMap<String, f64> = serde_json::from_str(raw)?;
        Ok(Self::new(prices))
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    fn id(&self) -> &'static str {
        "fixed"
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64, PriceError> {
        self.prices
            .get(&symbol.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| PriceError::UnknownSymbol(symbol.to_string()))
    }
}
