use axum::{extract::rejection::JsonRejection, extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, Operation};
use super::parse_form;
use crate::models::payment::CardForm;
use crate::services::PaymentService;

pub async fn process_card(
    State(service): State<Arc<PaymentService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let fail = |e| ApiError::new(Operation::ProcessCard, e);

    let form: CardForm = parse_form(payload).map_err(fail)?;
    info!("Received card payment request");

    let result = service.process_card(form).await.map_err(fail)?;
    Ok(Json(json!({
        "success": true,
        "data": result.payload
    })))
}
