//! Validation utilities

use bigdecimal::BigDecimal;
use std::str::FromStr;

use crate::types::{round2, LedgerError, LedgerResult};

/// Validate that an account code is valid
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 20 {
        return Err(LedgerError::Validation(
            "account code cannot exceed 20 characters".to_string(),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LedgerError::Validation(
            "account code can only contain alphanumeric characters, dashes, and underscores"
                .to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(LedgerError::Validation(
            "account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Parse a monetary amount from its decimal string representation.
///
/// Floating-point style inputs (exponent notation, nan/inf) are rejected at
/// this boundary; amounts are fixed-point with two fraction digits.
pub fn parse_amount(raw: &str) -> LedgerResult<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation(
            "amount cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().any(|c| c == 'e' || c == 'E') {
        return Err(LedgerError::Validation(format!(
            "amount '{trimmed}' must be a plain decimal, not scientific notation"
        )));
    }

    let amount = BigDecimal::from_str(trimmed)
        .map_err(|_| LedgerError::Validation(format!("amount '{trimmed}' is not a valid decimal")))?;
    Ok(round2(&amount))
}
