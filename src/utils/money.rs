// Utilitários para manipulação de valores monetários

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is not a number")]
    NotANumber,
    #[error("amount must be greater than zero")]
    NotPositive,
}

/// Parses a checkout amount from a JSON number or a numeric string.
///
/// Strings may use a comma as the decimal separator ("19,90").
pub fn parse_amount(raw: &Value) -> Result<Decimal, AmountError> {
    let amount = match raw {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .map_err(|_| AmountError::NotANumber)?,
        Value::String(s) => {
            let cleaned = s.trim().replace(',', ".");
            Decimal::from_str(&cleaned).map_err(|_| AmountError::NotANumber)?
        }
        _ => return Err(AmountError::NotANumber),
    };

    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive);
    }

    Ok(amount.normalize())
}

pub fn format_currency(amount: Decimal) -> String {
    format!("R$ {:.2}", amount).replace('.', ",")
}
