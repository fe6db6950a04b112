//! Field validation for item payloads.

use crate::error::{CoreError, Result};
use crate::item::NewItem;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%^&*{}|`'=?~._+-]+@([A-Za-z0-9-]+\.)+[A-Za-z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// Check an address against the accepted email format.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Validate a payload before it is persisted.
///
/// # Errors
/// Returns `CoreError::BlankField` for empty name, description or status, and
/// `CoreError::InvalidEmail` when the email is malformed.
pub fn validate(item: &NewItem) -> Result<()> {
    for (field, value) in [
        ("name", &item.name),
        ("description", &item.description),
        ("status", &item.status),
    ] {
        if value.trim().is_empty() {
            return Err(CoreError::BlankField(field));
        }
    }

    if !is_valid_email(&item.email) {
        return Err(CoreError::InvalidEmail(item.email.clone()));
    }

    Ok(())
}
