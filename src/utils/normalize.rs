/// Keeps only ASCII digits: "(44) 99999-9999" -> "44999999999".
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Card expiry typed as `MM/YY`, expanded to the provider's `("MM", "20YY")`.
pub fn split_card_expiry(expiry: &str) -> Option<(String, String)> {
    let (month, year) = expiry.trim().split_once('/')?;
    let (month, year) = (month.trim(), year.trim());

    if month.len() != 2 || year.len() != 2 {
        return None;
    }
    if !month.bytes().chain(year.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let month_number: u8 = month.parse().ok()?;
    if !(1..=12).contains(&month_number) {
        return None;
    }

    Some((month.to_string(), format!("20{}", year)))
}
