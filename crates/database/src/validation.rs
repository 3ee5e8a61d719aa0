//! Input validation applied before writes.

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Invalid email format.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),
    /// Value too long.
    #[error("{field} is too long ({actual} chars, max {max})")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    /// Numeric value outside its allowed range.
    #[error("{field} must be between {min} and {max} (got {actual})")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },
    /// Empty value where one is required.
    #[error("{0} cannot be empty")]
    Empty(String),
    /// Unknown tag type.
    #[error("Invalid tag type: {0}")]
    InvalidTagType(String),
}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for a device identifier.
pub const MAX_DEVICE_ID_LENGTH: usize = 128;

/// Maximum LED brightness, in percent.
pub const MAX_BRIGHTNESS: i32 = 100;

/// Validate an email address (basic RFC 5322 format check).
///
/// This is a basic validation that checks:
/// - Contains exactly one @
/// - Has at least one character before @
/// - Has at least one character after @
/// - Has at least one dot after @
/// - Is not too long
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    }

    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing local part (before @)".to_string(),
        ));
    }

    if domain.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing domain (after @)".to_string(),
        ));
    }

    if !domain.contains('.') {
        return Err(ValidationError::InvalidEmail(
            "domain must contain at least one dot".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::InvalidEmail(
            "domain cannot start or end with a dot".to_string(),
        ));
    }

    if domain.contains("..") {
        return Err(ValidationError::InvalidEmail(
            "domain cannot contain consecutive dots".to_string(),
        ));
    }

    Ok(())
}

/// Validate a hardware device identifier.
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    validate_required("deviceId", device_id)?;

    if device_id.len() > MAX_DEVICE_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "deviceId".to_string(),
            max: MAX_DEVICE_ID_LENGTH,
            actual: device_id.len(),
        });
    }

    Ok(())
}

/// Reject empty or whitespace-only strings.
pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }
    Ok(())
}

/// Check that `value` lies in `min..=max`.
pub fn validate_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            actual: value,
        });
    }
    Ok(())
}

/// Validate an optional RGB colour component.
pub fn validate_color(field: &str, value: Option<i32>) -> Result<(), ValidationError> {
    match value {
        Some(v) => validate_range(field, i64::from(v), 0, 255),
        None => Ok(()),
    }
}

/// Validate an optional brightness percentage.
pub fn validate_brightness(field: &str, value: Option<i32>) -> Result<(), ValidationError> {
    match value {
        Some(v) => validate_range(field, i64::from(v), 0, i64::from(MAX_BRIGHTNESS)),
        None => Ok(()),
    }
}

/// Validate a schedule entry time of day.
pub fn validate_time_of_day(hour: i32, minute: i32) -> Result<(), ValidationError> {
    validate_range("hour", i64::from(hour), 0, 23)?;
    validate_range("minute", i64::from(minute), 0, 59)
}
