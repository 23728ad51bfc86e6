//! Local input checks run before any request is made.

use crate::error::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*$")
        .expect("email pattern is valid")
});

pub fn required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "Required"));
    }
    Ok(())
}

/// Validate an email address the way a form `email` validator does: a local
/// part, an `@`, and a domain. A top-level domain is not required.
pub fn email(field: &str, value: &str) -> Result<(), ValidationError> {
    required(field, value)?;
    if !EMAIL_RE.is_match(value.trim()) {
        return Err(ValidationError::new(field, "Must be a valid email address"));
    }
    Ok(())
}

/// Password strength: length, lowercase, uppercase, digit and a
/// non-alphanumeric character. Reports every missing class at once.
pub fn password_strength(field: &str, value: &str) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if value.chars().count() < MIN_PASSWORD_LEN {
        missing.push(format!("at least {} characters", MIN_PASSWORD_LEN));
    }
    if !value.chars().any(|c| c.is_lowercase()) {
        missing.push("a lowercase letter".to_string());
    }
    if !value.chars().any(|c| c.is_uppercase()) {
        missing.push("an uppercase letter".to_string());
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit".to_string());
    }
    if !value.chars().any(|c| !c.is_alphanumeric()) {
        missing.push("a special character".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("Password needs {}", missing.join(", ")),
        ))
    }
}
