pub mod card;
pub mod check_payment;
pub mod error;
pub mod metrics;
pub mod pix;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::error;

use crate::services::ServiceError;

pub const INVALID_BODY: &str = "Corpo da requisição inválido.";

/// Turns the raw JSON body into a form; malformed bodies become validation errors.
fn parse_form<T: DeserializeOwned>(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<T, ServiceError> {
    let Json(value) = payload.map_err(|e| {
        error!("Invalid request body: {}", e);
        ServiceError::validation(INVALID_BODY)
    })?;

    serde_json::from_value(value).map_err(|e| {
        error!("Invalid request body: {}", e);
        ServiceError::validation(INVALID_BODY)
    })
}

pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}
