use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::models::payment::{PaymentStatus, StatusPolicy};
use crate::services::confirmation_poller::StatusCheck;
use crate::services::error::ServiceError;
use crate::services::http_client::read_body;

/// Talks to a running relay's `/check-payment`, the way the checkout page does.
pub struct CheckoutApiClient {
    client: Client,
    check_url: Url,
    policy: StatusPolicy,
}

impl CheckoutApiClient {
    pub fn new(client: Client, server: &Url, policy: StatusPolicy) -> Self {
        let mut check_url = server.clone();
        if let Ok(mut path) = check_url.path_segments_mut() {
            path.pop_if_empty().push("check-payment");
        }

        Self {
            client,
            check_url,
            policy,
        }
    }
}

#[async_trait]
impl StatusCheck for CheckoutApiClient {
    async fn check(&self, transaction_id: &str) -> Result<PaymentStatus, ServiceError> {
        let response = self
            .client
            .post(self.check_url.clone())
            .json(&json!({ "transactionId": transaction_id }))
            .send()
            .await
            .map_err(ServiceError::transport)?;

        let status = response.status();
        let body = read_body(response).await;
        debug!(status = status.as_u16(), %body, "check-payment answered");

        if !status.is_success() {
            return Err(ServiceError::Gateway {
                status: Some(status.as_u16()),
                body,
            });
        }

        // Só `success: true` com `data` conta; o resto é "ainda aguardando"
        let confirmed_payload = body
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false)
            .then(|| body.get("data"))
            .flatten();

        Ok(match confirmed_payload {
            Some(data) => self.policy.classify(data),
            None => PaymentStatus::Pending,
        })
    }
}
