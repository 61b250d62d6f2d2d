use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// Shared client for all gateway calls; reqwest pools connections per host.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(20) // Mantém conexões vivas
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// Reads a provider body as JSON, keeping it as a plain string when it is not.
pub async fn read_body(response: Response) -> Value {
    match response.text().await {
        Ok(text) => parse_body(&text),
        Err(e) => Value::String(e.to_string()),
    }
}

pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
