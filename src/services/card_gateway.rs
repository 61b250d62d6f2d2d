use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

use crate::app::config::CardSettings;
use crate::models::payment::{
    CardChargePayload, CardCustomer, CardDetails, CardPayload, ChargeResult, CheckoutRequest,
};
use crate::services::error::ServiceError;
use crate::services::http_client::read_body;
use crate::services::token_cache::{ClientCredentials, TokenCache};
use crate::utils::money::format_currency;
use crate::utils::normalize::digits_only;

#[async_trait]
pub trait CardGateway: Send + Sync {
    async fn charge_card(
        &self,
        request: &CheckoutRequest,
        card: &CardDetails,
    ) -> Result<ChargeResult, ServiceError>;
}

/// Card provider behind an OAuth2 bearer token.
pub struct CardGatewayClient {
    client: Client,
    payments_url: Url,
    description: String,
    tokens: Arc<TokenCache>,
}

impl CardGatewayClient {
    pub fn new(client: Client, settings: &CardSettings, tokens: Arc<TokenCache>) -> Self {
        let mut payments_url = settings.api_url.clone();
        if let Ok(mut path) = payments_url.path_segments_mut() {
            path.pop_if_empty().push("payments");
        }

        Self {
            client,
            payments_url,
            description: settings.description.clone(),
            tokens,
        }
    }

    /// Wires the client-credentials exchange and its cache from settings.
    pub fn from_settings(client: Client, settings: &CardSettings) -> Self {
        let source = ClientCredentials::new(
            client.clone(),
            &settings.api_url,
            settings.client_id.clone(),
            settings.client_secret.clone(),
        );
        let tokens = Arc::new(TokenCache::new(Arc::new(source), settings.token_lifetime()));
        Self::new(client, settings, tokens)
    }

    fn payload(&self, request: &CheckoutRequest, card: &CardDetails) -> CardChargePayload {
        CardChargePayload {
            amount: request.amount,
            customer: CardCustomer {
                name: request.name.clone(),
                email: request.email.clone(),
                document: digits_only(&request.tax_id),
                phone: digits_only(&request.phone),
            },
            card: CardPayload {
                number: digits_only(&card.number),
                holder_name: card.holder_name.clone(),
                exp_month: card.expiry_month.clone(),
                exp_year: card.expiry_year.clone(),
                cvv: card.cvv.clone(),
            },
            installments: 1,
            description: self.description.clone(),
        }
    }
}

#[async_trait]
impl CardGateway for CardGatewayClient {
    async fn charge_card(
        &self,
        request: &CheckoutRequest,
        card: &CardDetails,
    ) -> Result<ChargeResult, ServiceError> {
        // Sem token válido não há cobrança
        let token = self.tokens.get_access_token().await?;
        let payload = self.payload(request, card);

        info!(amount = %format_currency(request.amount), "Sending card charge to gateway");

        let response = self
            .client
            .post(self.payments_url.clone())
            .bearer_auth(token.value.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Card gateway unreachable");
                ServiceError::transport(e)
            })?;

        let status = response.status();
        let body = read_body(response).await;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "Card gateway rejected charge");
            return Err(ServiceError::Gateway {
                status: Some(status.as_u16()),
                body,
            });
        }

        info!(status = status.as_u16(), "Card charge accepted");
        Ok(ChargeResult { payload: body })
    }
}
