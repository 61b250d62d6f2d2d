use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use url::Url;

use crate::services::error::ServiceError;
use crate::services::http_client::read_body;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Performs one credential exchange. No caching, no retry.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn exchange(&self) -> Result<SecretString, ServiceError>;
}

/// OAuth2 client-credentials exchange against `{api}/oauth/token`.
pub struct ClientCredentials {
    client: Client,
    token_url: Url,
    client_id: String,
    client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client: Client, api_url: &Url, client_id: String, client_secret: SecretString) -> Self {
        let mut token_url = api_url.clone();
        if let Ok(mut path) = token_url.path_segments_mut() {
            path.pop_if_empty().extend(["oauth", "token"]);
        }

        Self {
            client,
            token_url,
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn exchange(&self) -> Result<SecretString, ServiceError> {
        info!(url = %self.token_url, "Requesting card provider access token");

        let response = self
            .client
            .post(self.token_url.clone())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret().as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Token endpoint unreachable");
                ServiceError::Auth {
                    status: None,
                    body: Value::String(e.to_string()),
                }
            })?;

        let status = response.status();
        let body = read_body(response).await;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "Token exchange rejected");
            return Err(ServiceError::Auth {
                status: Some(status.as_u16()),
                body,
            });
        }

        match body.get("access_token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(SecretString::new(token.to_string())),
            _ => {
                error!("Token response has no access_token");
                Err(ServiceError::Auth {
                    status: Some(status.as_u16()),
                    body,
                })
            }
        }
    }
}

/// Single-slot bearer token cache.
///
/// The slot lock is held across the exchange, so callers racing an expired
/// token wait for one refresh instead of each starting their own.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    lifetime: chrono::Duration,
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    /// `lifetime` is the provider's validity window minus the safety margin.
    pub fn new(source: Arc<dyn TokenSource>, lifetime: Duration) -> Self {
        Self {
            source,
            lifetime: chrono::Duration::from_std(lifetime)
                .unwrap_or_else(|_| chrono::Duration::days(365 * 100)),
            slot: Mutex::new(None),
        }
    }

    pub async fn get_access_token(&self) -> Result<AccessToken, ServiceError> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_valid_at(Utc::now()) {
                debug!(expires_at = %token.expires_at, "Reusing cached access token");
                return Ok(token.clone());
            }
        }

        let issued_at = Utc::now();
        let value = self.source.exchange().await?;
        let token = AccessToken {
            value,
            expires_at: issued_at
                .checked_add_signed(self.lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        info!(expires_at = %token.expires_at, "Access token refreshed");
        *slot = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl CountingSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn exchange(&self) -> Result<SecretString, ServiceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            Ok(SecretString::new(format!("token-{n}")))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        async fn exchange(&self) -> Result<SecretString, ServiceError> {
            Err(ServiceError::Auth {
                status: Some(401),
                body: serde_json::json!({"error": "invalid_client"}),
            })
        }
    }

    #[tokio::test]
    async fn reuses_token_within_validity_window() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = TokenCache::new(source.clone(), Duration::from_secs(23 * 60 * 60));

        let first = cache.get_access_token().await.unwrap();
        let second = cache.get_access_token().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first.value.expose_secret(), second.value.expose_secret());
        assert_eq!(first.expires_at, second.expires_at);
    }

    #[tokio::test]
    async fn refreshes_once_after_expiry() {
        let source = CountingSource::new(Duration::ZERO);
        let cache = TokenCache::new(source.clone(), Duration::from_millis(50));

        let first = cache.get_access_token().await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        let second = cache.get_access_token().await.unwrap();
        let third = cache.get_access_token().await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(first.value.expose_secret(), "token-1");
        assert_eq!(second.value.expose_secret(), "token-2");
        assert_eq!(third.value.expose_secret(), "token-2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_refresh() {
        let source = CountingSource::new(Duration::from_millis(50));
        let cache = Arc::new(TokenCache::new(source.clone(), Duration::from_secs(3600)));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_access_token().await })
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            let token = result.unwrap().unwrap();
            assert_eq!(token.value.expose_secret(), "token-1");
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn exchange_failure_is_not_cached() {
        let cache = TokenCache::new(Arc::new(FailingSource), Duration::from_secs(3600));

        let err = cache.get_access_token().await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth { status: Some(401), .. }));
        assert!(cache.slot.lock().await.is_none());
    }

    #[tokio::test]
    async fn client_credentials_posts_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/oauth/token")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client".into()),
                Matcher::UrlEncoded("client_secret".into(), "secret".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"abc","expires_in":86400}"#)
            .expect(1)
            .create_async()
            .await;

        let source = ClientCredentials::new(
            Client::new(),
            &Url::parse(&format!("{}/v1", server.url())).unwrap(),
            "client".into(),
            SecretString::new("secret".into()),
        );

        let token = source.exchange().await.unwrap();
        assert_eq!(token.expose_secret(), "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn client_credentials_rejection_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let source = ClientCredentials::new(
            Client::new(),
            &Url::parse(&server.url()).unwrap(),
            "client".into(),
            SecretString::new("wrong".into()),
        );

        let err = source.exchange().await.unwrap_err();
        assert!(matches!(err, ServiceError::Auth { status: Some(400), ref body } if body["error"] == "invalid_client"));
    }
}
