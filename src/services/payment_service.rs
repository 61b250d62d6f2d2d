use std::sync::Arc;
use tracing::{info, warn};

use crate::models::payment::{
    CardDetails, CardForm, ChargeResult, CheckPaymentForm, CheckoutRequest, PixForm,
    PixPaymentResult, StatusReport,
};
use crate::services::atomic_metrics::{AtomicMetrics, MetricsSnapshot};
use crate::services::card_gateway::CardGateway;
use crate::services::error::ServiceError;
use crate::services::pix_gateway::PixGateway;
use crate::utils::money::{format_currency, parse_amount};
use crate::utils::normalize::split_card_expiry;

pub const MISSING_PIX_FIELDS: &str =
    "Todos os campos (nome, email, telefone, cpf, valor) são obrigatórios.";
pub const INVALID_AMOUNT: &str = "O valor deve ser um número positivo.";
pub const MISSING_TRANSACTION_ID: &str = "Transaction ID é obrigatório.";
pub const INVALID_TRANSACTION_ID: &str = "Transaction ID inválido.";
pub const MISSING_CUSTOMER_FIELDS: &str = "Dados do cliente são obrigatórios.";
pub const MISSING_CARD_FIELDS: &str = "Dados do cartão são obrigatórios.";
pub const INVALID_CARD_EXPIRY: &str = "Validade do cartão inválida. Use o formato MM/AA.";

/// Validates checkout forms and dispatches them to the matching gateway.
///
/// Each call walks `received -> validated -> dispatched -> succeeded | failed`
/// and keeps no state between calls. Nothing here retries.
pub struct PaymentService {
    pix: Arc<dyn PixGateway>,
    card: Arc<dyn CardGateway>,
    metrics: Arc<AtomicMetrics>,
}

impl PaymentService {
    pub fn new(pix: Arc<dyn PixGateway>, card: Arc<dyn CardGateway>) -> Self {
        Self {
            pix,
            card,
            metrics: Arc::new(AtomicMetrics::new()),
        }
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn generate_pix(&self, form: PixForm) -> Result<PixPaymentResult, ServiceError> {
        let request = self.validated(validate_pix_form(form))?;
        info!(stage = "dispatched", method = "pix", amount = %format_currency(request.amount));

        let result = self.pix.create_pix_charge(&request).await;
        self.record(&result);
        if result.is_ok() {
            self.metrics.increment_pix_charges();
        }
        result
    }

    pub async fn check_payment(&self, form: CheckPaymentForm) -> Result<StatusReport, ServiceError> {
        let transaction_id = self.validated(validate_transaction_id(form.transaction_id))?;

        self.metrics.increment_status_checks();
        let result = self.pix.check_pix_status(&transaction_id).await;
        self.record(&result);

        if let Ok(report) = &result {
            if report.status.is_confirmed() {
                info!(%transaction_id, status = ?report.status, "Payment confirmed");
                self.metrics.increment_confirmations();
            }
        }
        result
    }

    pub async fn process_card(&self, form: CardForm) -> Result<ChargeResult, ServiceError> {
        let (request, card) = self.validated(validate_card_form(form))?;
        info!(stage = "dispatched", method = "card", amount = %format_currency(request.amount));

        let result = self.card.charge_card(&request, &card).await;
        self.record(&result);
        if result.is_ok() {
            self.metrics.increment_card_charges();
        }
        result
    }

    fn validated<T>(&self, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
        if let Err(e) = &result {
            warn!(stage = "received", error = %e, "Checkout rejected");
            self.metrics.increment_validation_rejections();
        }
        result
    }

    fn record<T>(&self, result: &Result<T, ServiceError>) {
        match result {
            Ok(_) => info!(stage = "succeeded"),
            Err(e) => {
                warn!(stage = "failed", error = %e);
                self.metrics.increment_gateway_failures();
            }
        }
    }
}

/// Present and not blank.
fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The id becomes a URL path segment, where `.` and `..` would be collapsed away.
pub fn validate_transaction_id(raw: Option<String>) -> Result<String, ServiceError> {
    let transaction_id =
        required(raw).ok_or_else(|| ServiceError::validation(MISSING_TRANSACTION_ID))?;

    if matches!(transaction_id.as_str(), "." | "..") {
        return Err(ServiceError::validation(INVALID_TRANSACTION_ID));
    }
    Ok(transaction_id)
}

pub fn validate_pix_form(form: PixForm) -> Result<CheckoutRequest, ServiceError> {
    let missing = || ServiceError::validation(MISSING_PIX_FIELDS);

    let name = required(form.nome).ok_or_else(missing)?;
    let email = required(form.email).ok_or_else(missing)?;
    let phone = required(form.telefone).ok_or_else(missing)?;
    let tax_id = required(form.cpf).ok_or_else(missing)?;
    let raw_amount = form.amount.filter(|v| !v.is_null()).ok_or_else(missing)?;
    let amount = parse_amount(&raw_amount).map_err(|_| ServiceError::validation(INVALID_AMOUNT))?;

    Ok(CheckoutRequest {
        name,
        email,
        phone,
        tax_id,
        amount,
    })
}

pub fn validate_card_form(form: CardForm) -> Result<(CheckoutRequest, CardDetails), ServiceError> {
    let missing_customer = || ServiceError::validation(MISSING_CUSTOMER_FIELDS);
    let missing_card = || ServiceError::validation(MISSING_CARD_FIELDS);

    let name = required(form.nome).ok_or_else(missing_customer)?;
    let email = required(form.email).ok_or_else(missing_customer)?;
    let tax_id = required(form.cpf).ok_or_else(missing_customer)?;
    let phone = required(form.telefone).ok_or_else(missing_customer)?;
    let raw_amount = form
        .amount
        .filter(|v| !v.is_null())
        .ok_or_else(missing_customer)?;

    let number = required(form.card_number).ok_or_else(missing_card)?;
    let holder_name = required(form.card_name).ok_or_else(missing_card)?;
    let expiry = required(form.card_expiry).ok_or_else(missing_card)?;
    let cvv = required(form.card_cvv).ok_or_else(missing_card)?;

    let amount = parse_amount(&raw_amount).map_err(|_| ServiceError::validation(INVALID_AMOUNT))?;
    let (expiry_month, expiry_year) =
        split_card_expiry(&expiry).ok_or_else(|| ServiceError::validation(INVALID_CARD_EXPIRY))?;

    Ok((
        CheckoutRequest {
            name,
            email,
            phone,
            tax_id,
            amount,
        },
        CardDetails {
            number,
            holder_name,
            expiry_month,
            expiry_year,
            cvv,
        },
    ))
}
