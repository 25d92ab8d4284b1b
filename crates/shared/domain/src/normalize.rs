//! Input normalisation shared by every write path.
//!
//! Values are normalised before they reach a repository so that the
//! unique columns (category name, SKU, email) compare byte-for-byte.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{MAX_EMAIL_LENGTH, MAX_SKU_LENGTH, MIN_EMAIL_LENGTH, MIN_SKU_LENGTH};
use crate::error::{DomainError, DomainResult};

static SKU_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9-]+$").expect("valid SKU regex"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("valid email regex")
});

/// Trim and collapse interior whitespace runs to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Validate a raw SKU and return its canonical (upper-case) form.
///
/// The canonical form is `[A-Z0-9-]`, between 3 and 50 characters.
pub fn normalize_sku(raw: &str) -> DomainResult<String> {
    let sku = raw.trim().to_uppercase();

    if sku.len() < MIN_SKU_LENGTH || sku.len() > MAX_SKU_LENGTH {
        return Err(DomainError::validation(format!(
            "SKU must be between {} and {} characters",
            MIN_SKU_LENGTH, MAX_SKU_LENGTH
        )));
    }

    if !SKU_PATTERN.is_match(&sku) {
        return Err(DomainError::validation(
            "SKU may only contain A-Z, 0-9 and '-'",
        ));
    }

    Ok(sku)
}

/// Lower-case and validate an email address.
pub fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim().to_lowercase();

    if email.len() < MIN_EMAIL_LENGTH || email.len() > MAX_EMAIL_LENGTH {
        return Err(DomainError::validation("Invalid email address"));
    }
    if !EMAIL_PATTERN.is_match(&email) {
        return Err(DomainError::validation("Invalid email address"));
    }

    Ok(email)
}

/// Collapse whitespace and reject an empty result.
pub fn required_text(field: &str, raw: &str) -> DomainResult<String> {
    let value = collapse_whitespace(raw);
    if value.is_empty() {
        return Err(DomainError::validation(format!("{} is required", field)));
    }
    Ok(value)
}
