use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::app::config::Config;
use crate::handlers::{self, card, check_payment, metrics, pix};
use crate::models::payment::StatusPolicy;
use crate::services::http_client::build_client;
use crate::services::{CardGatewayClient, PaymentService, PixGatewayClient};

/// Wires both gateways around one shared HTTP client.
pub fn build_service(config: &Config) -> Result<Arc<PaymentService>, reqwest::Error> {
    let client = build_client(config.http_timeout)?;
    let policy = StatusPolicy::new(&config.paid_statuses);

    let pix = Arc::new(PixGatewayClient::new(client.clone(), &config.pix, policy));
    let card = Arc::new(CardGatewayClient::from_settings(client, &config.card));

    Ok(Arc::new(PaymentService::new(pix, card)))
}

pub fn build_router(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/generate-pix", post(pix::generate_pix))
        .route("/check-payment", post(check_payment::check_payment))
        .route("/process-card", post(card::process_card))
        .route("/metrics", get(metrics::get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
