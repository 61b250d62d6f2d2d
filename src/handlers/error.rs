use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GeneratePix,
    CheckPayment,
    ProcessCard,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Operation::GeneratePix => {
                "Erro ao gerar o PIX. Verifique as chaves de API e os dados enviados."
            }
            Operation::CheckPayment => "Erro ao verificar status do pagamento.",
            Operation::ProcessCard => "Erro ao processar pagamento com cartão.",
        }
    }

    fn contract_message(self) -> &'static str {
        match self {
            Operation::GeneratePix => "Resposta da API inválida: QR Code não encontrado.",
            Operation::CheckPayment | Operation::ProcessCard => "Resposta da API inválida.",
        }
    }
}

/// A `ServiceError` tagged with the route it happened on, rendered as `{error, details}`.
#[derive(Debug)]
pub struct ApiError {
    operation: Operation,
    error: ServiceError,
}

impl ApiError {
    pub fn new(operation: Operation, error: ServiceError) -> Self {
        Self { operation, error }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::GatewayContract { .. } => StatusCode::BAD_GATEWAY,
            ServiceError::Auth { .. } | ServiceError::Gateway { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self.error {
            ServiceError::Validation(message) => json!({ "error": message }),
            ServiceError::GatewayContract { .. } => json!({
                "error": self.operation.contract_message(),
                "details": self.error.details(),
            }),
            ServiceError::Auth { .. } | ServiceError::Gateway { .. } => {
                error!(operation = ?self.operation, error = %self.error, "Request failed");
                json!({
                    "error": self.operation.failure_message(),
                    "details": self.error.details(),
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (ServiceError::validation("x"), StatusCode::BAD_REQUEST),
            (
                ServiceError::GatewayContract { body: json!({}) },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServiceError::Auth {
                    status: Some(401),
                    body: json!({}),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::Gateway {
                    status: None,
                    body: json!("timeout"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::new(Operation::GeneratePix, error).status_code(), expected);
        }
    }
}
