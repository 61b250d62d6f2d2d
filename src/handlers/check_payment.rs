use axum::{extract::rejection::JsonRejection, extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::{ApiError, Operation};
use super::parse_form;
use crate::models::payment::CheckPaymentForm;
use crate::services::PaymentService;

/// Relays the provider's status payload as-is; the page decides what it means.
pub async fn check_payment(
    State(service): State<Arc<PaymentService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let fail = |e| ApiError::new(Operation::CheckPayment, e);

    let form: CheckPaymentForm = parse_form(payload).map_err(fail)?;
    let report = service.check_payment(form).await.map_err(fail)?;

    Ok(Json(json!({
        "success": true,
        "data": report.raw
    })))
}
