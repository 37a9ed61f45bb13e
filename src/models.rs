// src/models.rs
use crate::error::ApiError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical `purchase date` format, e.g. `18-06-2024`.
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Value stored for `name` when the client leaves it out.
pub const DEFAULT_NAME: &str = "NA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: String,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "purchase price")]
    pub purchase_price: f64,
    #[serde(rename = "purchase date", with = "purchase_date")]
    pub purchase_date: NaiveDate,
    pub shares: u32,
}

/// A validated stock record that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStock {
    pub name: String,
    pub symbol: String,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
    pub shares: u32,
}

impl NewStock {
    pub fn with_id(self, id: String) -> Stock {
        Stock {
            id,
            name: self.name,
            symbol: self.symbol,
            purchase_price: self.purchase_price,
            purchase_date: self.purchase_date,
            shares: self.shares,
        }
    }
}

/// Request body of `POST /stocks` and `PUT /stocks/{id}`.
///
/// Every field is optional here so that a missing field turns into a
/// validation error with a readable message instead of a bare
/// deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct StockPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    #[serde(rename = "purchase price")]
    pub purchase_price: Option<f64>,
    #[serde(rename = "purchase date")]
    pub purchase_date: Option<String>,
    pub shares: Option<f64>,
}

impl StockPayload {
    /// Validates a creation request. The server assigns ids, so a client
    /// supplied `id` is rejected.
    pub fn into_new_stock(self) -> Result<NewStock, ApiError> {
        if self.id.is_some() {
            return Err(ApiError::Validation(
                "id is assigned by the server and must not be supplied".to_string(),
            ));
        }
        self.validate()
    }

    /// Validates a full replacement of the record stored under `path_id`.
    pub fn into_replacement(self, path_id: &str) -> Result<NewStock, ApiError> {
        match self.id.as_deref() {
            None => Err(ApiError::Validation("id is required".to_string())),
            Some(id) if id != path_id => Err(ApiError::Validation(format!(
                "id {} in body does not match id {} in path",
                id, path_id
            ))),
            Some(_) => self.validate(),
        }
    }

    fn validate(self) -> Result<NewStock, ApiError> {
        let symbol = match self.symbol.map(|s| s.trim().to_string()) {
            Some(symbol) if !symbol.is_empty() => symbol,
            _ => return Err(ApiError::Validation("symbol is required".to_string())),
        };

        let purchase_date = match self.purchase_date {
            Some(raw) => parse_purchase_date(&raw)?,
            None => return Err(ApiError::Validation("purchase date is required".to_string())),
        };

        // Stored prices are whole cents, so anything rounding to zero is rejected.
        let purchase_price = match self.purchase_price {
            Some(price) if price.is_finite() && round_cents(price) > 0.0 => round_cents(price),
            Some(price) => {
                return Err(ApiError::Validation(format!(
                    "purchase price must be at least 0.01, got {}",
                    price
                )))
            }
            None => {
                return Err(ApiError::Validation(
                    "purchase price is required".to_string(),
                ))
            }
        };

        let shares = match self.shares {
            Some(shares) if shares.fract() == 0.0 && shares >= 1.0 && shares <= u32::MAX as f64 => {
                shares as u32
            }
            Some(shares) => {
                return Err(ApiError::Validation(format!(
                    "shares must be a positive integer, got {}",
                    shares
                )))
            }
            None => return Err(ApiError::Validation("shares is required".to_string())),
        };

        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string());

        Ok(NewStock {
            name,
            symbol,
            purchase_price,
            purchase_date,
            shares,
        })
    }
}

/// Parses a purchase date, accepting only the canonical `DD-MM-YYYY` form.
///
/// chrono tolerates single-digit days and months, so the parsed date is
/// formatted back and compared with the input to reject `1-6-2024` and the like.
pub fn parse_purchase_date(raw: &str) -> Result<NaiveDate, ApiError> {
    let invalid = || {
        ApiError::Validation(format!(
            "purchase date {:?} is not in DD-MM-YYYY format",
            raw
        ))
    };
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| invalid())?;
    if date.format(DATE_FORMAT).to_string() != raw {
        return Err(invalid());
    }
    Ok(date)
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Response body of `GET /stock-value/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockValue {
    pub symbol: String,
    pub ticker: f64,
    pub stock_value: f64,
}

impl StockValue {
    pub fn new(stock: &Stock, ticker: f64) -> Self {
        StockValue {
            symbol: stock.symbol.clone(),
            ticker,
            stock_value: round_cents(ticker * stock.shares as f64),
        }
    }
}

/// Response body of `GET /portfolio-value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValue {
    #[serde(with = "purchase_date")]
    pub date: NaiveDate,
    #[serde(rename = "portfolio value")]
    pub portfolio_value: f64,
}

/// Query-string filter for `GET /stocks`. All present fields must match.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StockFilter {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub shares: Option<u32>,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
}

impl StockFilter {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut filter = StockFilter::default();
        for (key, value) in query {
            match key.as_str() {
                "symbol" => filter.symbol = Some(value.clone()),
                "name" => filter.name = Some(value.clone()),
                "shares" => {
                    filter.shares = Some(value.parse().map_err(|_| {
                        ApiError::Validation(format!("invalid shares filter {:?}", value))
                    })?)
                }
                "purchase date" => filter.purchase_date = Some(parse_purchase_date(value)?),
                "purchase price" => {
                    filter.purchase_price = Some(value.parse().map_err(|_| {
                        ApiError::Validation(format!("invalid purchase price filter {:?}", value))
                    })?)
                }
                other => {
                    return Err(ApiError::Validation(format!(
                        "unknown filter field {:?}",
                        other
                    )))
                }
            }
        }
        Ok(filter)
    }

    pub fn matches(&self, stock: &Stock) -> bool {
        self.symbol
            .as_ref()
            .map_or(true, |s| s.eq_ignore_ascii_case(&stock.symbol))
            && self.name.as_ref().map_or(true, |n| *n == stock.name)
            && self.shares.map_or(true, |s| s == stock.shares)
            && self.purchase_date.map_or(true, |d| d == stock.purchase_date)
            && self
                .purchase_price
                .map_or(true, |p| round_cents(p) == stock.purchase_price)
    }
}

mod purchase_date {
    use super::{parse_purchase_date, DATE_FORMAT};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_purchase_date(&raw).map_err(serde::de::Error::custom)
    }
}
