use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::app::config::PixSettings;
use crate::models::payment::{
    CheckoutRequest, PixChargePayload, PixClient, PixMetadata, PixPaymentResult, StatusPolicy,
    StatusReport,
};
use crate::services::error::ServiceError;
use crate::services::http_client::read_body;
use crate::utils::money::format_currency;
use crate::utils::normalize::digits_only;

const RECEIVE_PATH: [&str; 3] = ["gateway", "pix", "receive"];

#[async_trait]
pub trait PixGateway: Send + Sync {
    async fn create_pix_charge(
        &self,
        request: &CheckoutRequest,
    ) -> Result<PixPaymentResult, ServiceError>;

    async fn check_pix_status(&self, transaction_id: &str) -> Result<StatusReport, ServiceError>;
}

/// PIX provider authenticated by a public/secret key header pair.
pub struct PixGatewayClient {
    client: Client,
    api_root: Url,
    public_key: SecretString,
    secret_key: SecretString,
    policy: StatusPolicy,
}

impl PixGatewayClient {
    pub fn new(client: Client, settings: &PixSettings, policy: StatusPolicy) -> Self {
        Self {
            client,
            api_root: api_root(&settings.api_url),
            public_key: settings.public_key.clone(),
            secret_key: settings.secret_key.clone(),
            policy,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Public-Key", self.public_key.expose_secret())
            .header("X-Secret-Key", self.secret_key.expose_secret())
    }
}

/// The receive URL is sometimes configured whole; status lives next to it.
fn api_root(configured: &Url) -> Url {
    let mut root = configured.clone();
    let path = configured.path().trim_end_matches('/');
    let suffix = format!("/{}", RECEIVE_PATH.join("/"));
    if let Some(stripped) = path.strip_suffix(&suffix) {
        root.set_path(stripped);
    }
    root
}

fn new_identifier() -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!("txid-{}-{}", Utc::now().timestamp_millis(), &nonce[..8])
}

/// Pulls `pix.base64`, `pix.code` and `transactionId` out of a 2xx body.
fn extract_pix_result(body: Value) -> Result<PixPaymentResult, ServiceError> {
    let text = |pointer: &str| {
        body.pointer(pointer)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let transaction_id = match body.get("transactionId") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };

    match (text("/pix/base64"), text("/pix/code")) {
        (Some(qr_code_base64), Some(qr_code_text)) => Ok(PixPaymentResult {
            qr_code_base64,
            qr_code_text,
            transaction_id,
        }),
        _ => {
            error!(body = %body, "PIX response has no QR code");
            Err(ServiceError::GatewayContract { body })
        }
    }
}

#[async_trait]
impl PixGateway for PixGatewayClient {
    async fn create_pix_charge(
        &self,
        request: &CheckoutRequest,
    ) -> Result<PixPaymentResult, ServiceError> {
        let payload = PixChargePayload {
            identifier: new_identifier(),
            amount: request.amount,
            client: PixClient {
                name: request.name.clone(),
                email: request.email.clone(),
                phone: digits_only(&request.phone),
                document: digits_only(&request.tax_id),
            },
            metadata: PixMetadata {
                description: format!("Pagamento PIX para {}", request.name),
            },
        };

        info!(
            identifier = %payload.identifier,
            amount = %format_currency(request.amount),
            "Sending PIX charge to gateway"
        );

        let response = self
            .authenticated(self.client.post(self.endpoint(&RECEIVE_PATH)))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "PIX gateway unreachable");
                ServiceError::transport(e)
            })?;

        let status = response.status();
        let body = read_body(response).await;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "PIX gateway rejected charge");
            return Err(ServiceError::Gateway {
                status: Some(status.as_u16()),
                body,
            });
        }

        let result = extract_pix_result(body)?;
        info!(transaction_id = ?result.transaction_id, "PIX charge created");
        Ok(result)
    }

    async fn check_pix_status(&self, transaction_id: &str) -> Result<StatusReport, ServiceError> {
        let url = self.endpoint(&["gateway", "pix", "status", transaction_id]);
        debug!(transaction_id, "Checking PIX status");

        let response = self
            .authenticated(self.client.get(url))
            .send()
            .await
            .map_err(|e| {
                warn!(transaction_id, error = %e, "PIX status check failed");
                ServiceError::transport(e)
            })?;

        let status = response.status();
        let raw = read_body(response).await;

        if !status.is_success() {
            warn!(transaction_id, status = status.as_u16(), "PIX status check rejected");
            return Err(ServiceError::Gateway {
                status: Some(status.as_u16()),
                body: raw,
            });
        }

        let payment_status = self.policy.classify(&raw);
        info!(transaction_id, status = ?payment_status, "PIX status received");

        Ok(StatusReport {
            status: payment_status,
            raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment::PaymentStatus;
    use mockito::Matcher;
    use serde_json::json;

    fn settings(url: &str) -> PixSettings {
        PixSettings {
            api_url: Url::parse(url).unwrap(),
            public_key: SecretString::new("pk_test".into()),
            secret_key: SecretString::new("sk_test".into()),
        }
    }

    fn gateway(url: &str) -> PixGatewayClient {
        PixGatewayClient::new(Client::new(), &settings(url), StatusPolicy::default())
    }

    fn ana() -> CheckoutRequest {
        CheckoutRequest {
            name: "Ana".into(),
            email: "a@b.com".into(),
            phone: "(44) 99999-9999".into(),
            tax_id: "123.456.789-00".into(),
            amount: "19.90".parse().unwrap(),
        }
    }

    #[test]
    fn api_root_strips_receive_suffix() {
        let root = api_root(&Url::parse("https://pix.test/api/v1/gateway/pix/receive").unwrap());
        assert_eq!(root.as_str(), "https://pix.test/api/v1");

        let root = api_root(&Url::parse("https://pix.test/api/v1/").unwrap());
        assert_eq!(root.as_str(), "https://pix.test/api/v1/");
    }

    #[test]
    fn endpoint_encodes_transaction_id() {
        let gateway = gateway("https://pix.test/api/v1/");
        let url = gateway.endpoint(&["gateway", "pix", "status", "a/b c"]);
        assert_eq!(url.as_str(), "https://pix.test/api/v1/gateway/pix/status/a%2Fb%20c");
    }

    #[test]
    fn identifiers_are_unique() {
        let a = new_identifier();
        let b = new_identifier();
        assert!(a.starts_with("txid-"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn create_pix_charge_returns_qr_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/gateway/pix/receive")
            .match_header("X-Public-Key", "pk_test")
            .match_header("X-Secret-Key", "sk_test")
            .match_body(Matcher::PartialJson(json!({
                "amount": 19.9,
                "client": {
                    "name": "Ana",
                    "phone": "44999999999",
                    "document": "12345678900"
                },
                "metadata": { "description": "Pagamento PIX para Ana" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"transactionId":"T1","pix":{"base64":"X","code":"Y"}}"#)
            .expect(1)
            .create_async()
            .await;

        let result = gateway(&format!("{}/api/v1", server.url()))
            .create_pix_charge(&ana())
            .await
            .unwrap();

        assert_eq!(
            result,
            PixPaymentResult {
                qr_code_base64: "X".into(),
                qr_code_text: "Y".into(),
                transaction_id: Some("T1".into()),
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_pix_charge_without_code_is_contract_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gateway/pix/receive")
            .with_status(201)
            .with_body(r#"{"transactionId":"T1","pix":{"base64":"X"}}"#)
            .create_async()
            .await;

        let err = gateway(&server.url()).create_pix_charge(&ana()).await.unwrap_err();

        match err {
            ServiceError::GatewayContract { body } => {
                assert_eq!(body, json!({"transactionId": "T1", "pix": {"base64": "X"}}));
            }
            other => panic!("expected contract error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_pix_charge_surfaces_gateway_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gateway/pix/receive")
            .with_status(401)
            .with_body(r#"{"message":"invalid credentials"}"#)
            .create_async()
            .await;

        let err = gateway(&server.url()).create_pix_charge(&ana()).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Gateway { status: Some(401), ref body } if body["message"] == "invalid credentials"
        ));
    }

    #[tokio::test]
    async fn check_pix_status_classifies_payload() {
        let mut server = mockito::Server::new_async().await;
        let _paid = server
            .mock("GET", "/gateway/pix/status/T1")
            .match_header("X-Secret-Key", "sk_test")
            .with_status(200)
            .with_body(r#"{"status":"PAID"}"#)
            .create_async()
            .await;
        let _unknown = server
            .mock("GET", "/gateway/pix/status/T2")
            .with_status(200)
            .with_body(r#"{"id":"T2"}"#)
            .create_async()
            .await;

        let gateway = gateway(&server.url());

        let report = gateway.check_pix_status("T1").await.unwrap();
        assert_eq!(report.status, PaymentStatus::Paid("PAID".into()));
        assert_eq!(report.raw, json!({"status": "PAID"}));

        let report = gateway.check_pix_status("T2").await.unwrap();
        assert_eq!(report.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn check_pix_status_http_failure_is_gateway_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/gateway/pix/status/T1")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let err = gateway(&server.url()).check_pix_status("T1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Gateway { status: Some(404), .. }));
    }
}
