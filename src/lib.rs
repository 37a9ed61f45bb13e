// src/lib.rs
//! Stock portfolio REST service: tracks stock holdings in memory and values
//! them against a market price feed.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod prices;
pub mod store;

pub use api::AppState;
