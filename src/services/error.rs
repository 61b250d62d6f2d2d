use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Incomplete or invalid input; no gateway was contacted.
    #[error("{0}")]
    Validation(String),

    /// The card provider refused the client-credentials exchange.
    #[error("card provider authentication failed (status {status:?})")]
    Auth { status: Option<u16>, body: Value },

    /// Non-2xx answer or transport failure. `status` is `None` when no response arrived.
    #[error("gateway request failed (status {status:?})")]
    Gateway { status: Option<u16>, body: Value },

    /// 2xx answer that lacks the fields we rely on.
    #[error("gateway response is missing required fields")]
    GatewayContract { body: Value },
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn transport(err: reqwest::Error) -> Self {
        ServiceError::Gateway {
            status: err.status().map(|s| s.as_u16()),
            body: Value::String(err.to_string()),
        }
    }

    /// Raw provider payload, or our own message when there is none.
    pub fn details(&self) -> Value {
        match self {
            ServiceError::Validation(message) => Value::String(message.clone()),
            ServiceError::Auth { body, .. }
            | ServiceError::Gateway { body, .. }
            | ServiceError::GatewayContract { body } => {
                if body.is_null() {
                    Value::String(self.to_string())
                } else {
                    body.clone()
                }
            }
        }
    }
}
