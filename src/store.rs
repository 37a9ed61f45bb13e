// src/store.rs
use crate::error::ApiError;
use crate::models::{NewStock, Stock, StockFilter};
use log::info;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Live stock records in creation order.
///
/// Symbol uniqueness is checked under the same write lock that inserts the
/// record, so two concurrent creations of one symbol cannot both succeed.
#[derive(Debug, Default)]
pub struct StockStore {
    stocks: RwLock<Vec<Stock>>,
}

impl StockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, new_stock: NewStock) -> Result<Stock, ApiError> {
        let mut stocks = self.stocks.write().await;
        if stocks
            .iter()
            .any(|s| s.symbol.eq_ignore_ascii_case(&new_stock.symbol))
        {
            return Err(ApiError::DuplicateSymbol(new_stock.symbol));
        }
        let stock = new_stock.with_id(Uuid::new_v4().to_string());
        info!("Stored stock {} ({})", stock.symbol, stock.id);
        stocks.push(stock.clone());
        Ok(stock)
    }

    pub async fn get(&self, id: &str) -> Option<Stock> {
        self.stocks.read().await.iter().find(|s| s.id == id).cloned()
    }

    pub async fn list(&self, filter: &StockFilter) -> Vec<Stock> {
        self.stocks
            .read()
            .await
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect()
    }

    pub async fn replace(&self, id: &str, new_stock: NewStock) -> Result<Stock, ApiError> {
        let mut stocks = self.stocks.write().await;
        let position = stocks
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        if stocks
            .iter()
            .any(|s| s.id != id && s.symbol.eq_ignore_ascii_case(&new_stock.symbol))
        {
            return Err(ApiError::DuplicateSymbol(new_stock.symbol));
        }
        let stock = new_stock.with_id(id.to_string());
        info!("Replaced stock {} ({})", stock.symbol, stock.id);
        stocks[position] = stock.clone();
        Ok(stock)
    }

    pub async fn remove(&self, id: &str) -> Result<Stock, ApiError> {
        let mut stocks = self.stocks.write().await;
        let position = stocks
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let removed = stocks.remove(position);
        info!("Removed stock {} ({})", removed.symbol, removed.id);
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        self.stocks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stocks.read().await.is_empty()
    }
}
