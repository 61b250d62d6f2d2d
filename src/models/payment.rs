use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Terminal-success statuses used when none are configured.
pub const DEFAULT_PAID_STATUSES: [&str; 3] = ["PAID", "CONFIRMED", "APPROVED"];

// Formulários enviados pelo front end (nomes de campo em português)

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PixForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub telefone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cpf: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckPaymentForm {
    #[serde(rename = "transactionId", default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub telefone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub card_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub card_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub card_expiry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub card_cvv: Option<String>,
    #[serde(default)]
    pub amount: Option<Value>,
}

/// Accepts a JSON string or number; anything else counts as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Customer data that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardDetails {
    pub number: String,
    pub holder_name: String,
    pub expiry_month: String,
    /// Four digits, already prefixed with "20".
    pub expiry_year: String,
    pub cvv: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixPaymentResult {
    #[serde(rename = "qrCodeBase64")]
    pub qr_code_base64: String,
    #[serde(rename = "qrCodeText")]
    pub qr_code_text: String,
    /// Absent when the provider omits it; the QR code is still payable.
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
}

/// Raw card-provider answer; relayed to the caller untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResult {
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid(String),
    /// Anything the provider reports that is neither pending nor paid.
    Other(String),
}

impl PaymentStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PaymentStatus::Paid(_))
    }
}

/// A status check: the classification plus the payload it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub status: PaymentStatus,
    pub raw: Value,
}

/// Which provider status values end the wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    paid: Vec<String>,
}

impl StatusPolicy {
    pub fn new<I, S>(paid: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paid: paid
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn paid_statuses(&self) -> &[String] {
        &self.paid
    }

    /// Reads `status`, falling back to `paymentStatus`. A missing field is pending, never an error.
    pub fn classify(&self, payload: &Value) -> PaymentStatus {
        let field = |name: &str| {
            payload
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let Some(raw) = field("status").or_else(|| field("paymentStatus")) else {
            return PaymentStatus::Pending;
        };

        let normalized = raw.to_ascii_uppercase();
        if self.paid.iter().any(|paid| *paid == normalized) {
            PaymentStatus::Paid(raw.to_string())
        } else if normalized == "PENDING" {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Other(raw.to_string())
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PAID_STATUSES)
    }
}

// Payloads enviados aos gateways

#[derive(Debug, Clone, Serialize)]
pub struct PixChargePayload {
    pub identifier: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub client: PixClient,
    pub metadata: PixMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct PixClient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PixMetadata {
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardChargePayload {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub customer: CardCustomer,
    pub card: CardPayload,
    pub installments: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardCustomer {
    pub name: String,
    pub email: String,
    pub document: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardPayload {
    pub number: String,
    pub holder_name: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_reads_status_then_payment_status() {
        let policy = StatusPolicy::default();

        assert_eq!(
            policy.classify(&json!({"status": "PAID"})),
            PaymentStatus::Paid("PAID".into())
        );
        assert_eq!(
            policy.classify(&json!({"paymentStatus": "PENDING"})),
            PaymentStatus::Pending
        );
        assert_eq!(
            policy.classify(&json!({"status": "", "paymentStatus": "APPROVED"})),
            PaymentStatus::Paid("APPROVED".into())
        );
    }

    #[test]
    fn classify_missing_status_is_pending() {
        let policy = StatusPolicy::default();
        assert_eq!(policy.classify(&json!({})), PaymentStatus::Pending);
        assert_eq!(policy.classify(&json!({"status": 3})), PaymentStatus::Pending);
        assert_eq!(policy.classify(&json!("PAID")), PaymentStatus::Pending);
    }

    #[test]
    fn classify_unknown_status_keeps_waiting() {
        let status = StatusPolicy::default().classify(&json!({"status": "EXPIRED"}));
        assert_eq!(status, PaymentStatus::Other("EXPIRED".into()));
        assert!(!status.is_confirmed());
    }

    #[test]
    fn policy_is_configurable_and_case_insensitive() {
        let policy = StatusPolicy::new(["settled", " "]);
        assert_eq!(policy.paid_statuses(), ["SETTLED".to_string()]);
        assert!(policy.classify(&json!({"status": "Settled"})).is_confirmed());
        assert!(!policy.classify(&json!({"status": "PAID"})).is_confirmed());
    }

    #[test]
    fn forms_accept_numbers_for_text_fields() {
        let form: PixForm = serde_json::from_value(json!({
            "nome": "Ana",
            "telefone": 44999999999u64,
            "cpf": "123.456.789-00",
            "amount": 19.90
        }))
        .unwrap();

        assert_eq!(form.telefone.as_deref(), Some("44999999999"));
        assert_eq!(form.email, None);
        assert_eq!(form.amount, Some(json!(19.90)));
    }

    #[test]
    fn pix_payload_serializes_amount_as_number() {
        let payload = PixChargePayload {
            identifier: "txid-1".into(),
            amount: "19.90".parse().unwrap(),
            client: PixClient {
                name: "Ana".into(),
                email: "a@b.com".into(),
                phone: "44999999999".into(),
                document: "12345678900".into(),
            },
            metadata: PixMetadata {
                description: "Pagamento PIX para Ana".into(),
            },
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["amount"], json!(19.9));
        assert_eq!(value["client"]["document"], json!("12345678900"));
    }
}
