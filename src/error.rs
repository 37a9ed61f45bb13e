// src/error.rs
use crate::prices::PriceError;
use log::{error, warn};
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use warp::http::StatusCode;
use warp::reject::Reject;
use warp::{Rejection, Reply};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("stock {0} not found")]
    NotFound(String),

    #[error("a stock with symbol {0} already exists")]
    DuplicateSymbol(String),

    #[error("price lookup failed: {0}")]
    PriceFeed(#[from] PriceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::DuplicateSymbol(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PriceFeed(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl Reject for ApiError {}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Turns every rejection into a JSON `{"error": ...}` body with a matching status.
///
/// Custom errors are checked before warp's built-in rejections: when routes are
/// combined with `or`, a handler failure travels together with the
/// method-not-allowed rejections of the sibling routes.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "resource not found".to_string())
    } else if let Some(e) = err.find::<ApiError>() {
        (e.status(), e.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("malformed request body: {}", e))
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "content-length header required".to_string(),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "request body too large".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    if status.is_server_error() {
        error!("{} {}", status, message);
    } else {
        warn!("{} {}", status, message);
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { error: message }),
        status,
    ))
}
