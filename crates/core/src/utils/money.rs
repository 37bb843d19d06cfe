//! Currency code checks shared by the portfolio, transaction and catalogue models.

/// Validates an ISO-4217 style three letter currency code.
pub fn is_valid_currency_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}
