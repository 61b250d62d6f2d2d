use axum::{extract::rejection::JsonRejection, extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, Operation};
use super::parse_form;
use crate::models::payment::PixForm;
use crate::services::PaymentService;

pub async fn generate_pix(
    State(service): State<Arc<PaymentService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let fail = |e| ApiError::new(Operation::GeneratePix, e);

    let form: PixForm = parse_form(payload).map_err(fail)?;
    info!("Received PIX request");

    let result = service.generate_pix(form).await.map_err(fail)?;
    Ok(Json(json!({ "data": result })))
}
