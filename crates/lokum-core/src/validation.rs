//! # Validation Module
//!
//! Input validation for the storefront, applied before any business rule.
//!
//! Everything here checks shape only. Whether a product exists, has
//! stock, or a coupon is still redeemable is decided by the rules in
//! [`crate::cart`], [`crate::coupon`] and [`crate::types::Product`]; the
//! database adds NOT NULL, CHECK and UNIQUE constraints underneath.
//!
//! | input              | validator                | normalizes       |
//! |--------------------|--------------------------|------------------|
//! | product SKU        | `validate_sku`           | trims            |
//! | product name       | `validate_product_name`  | trims            |
//! | coupon code        | `validate_coupon_code`   | trims, uppercase |
//! | guest session id   | `validate_session_id`    |                  |
//! | checkout email     | `validate_email`         |                  |
//! | order note         | `validate_order_note`    | trims            |
//! | cart quantity      | `validate_quantity`      |                  |
//! | price              | `validate_price_cents`   |                  |
//! | tax / coupon rate  | `validate_rate_bps`      |                  |
//!
//! ## Usage
//! ```rust,no_run
//! use lokum_core::validation::{validate_coupon_code, validate_quantity};
//!
//! let code = validate_coupon_code(" hosgeldin10 ").unwrap();
//! assert_eq!(code, "HOSGELDIN10");
//!
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use lokum_core::validation::validate_sku;
///
/// assert!(validate_sku("LOKUM-GUL-250").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("has space").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name: required, at most 200 characters.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    // chars, not bytes: Turkish names are mostly multi-byte
    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an order note (required, at most 2000 characters) and returns
/// it trimmed.
pub fn validate_order_note(note: &str) -> ValidationResult<String> {
    let note = note.trim();

    if note.is_empty() {
        return Err(ValidationError::Required {
            field: "note".to_string(),
        });
    }
    if note.chars().count() > 2000 {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: 2000,
        });
    }

    Ok(note.to_string())
}

/// Validates and normalizes a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 32 characters
/// - ASCII letters, digits, hyphens and underscores
///
/// ## Returns
/// The trimmed, upper-cased code as stored in the coupon table.
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon_code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "coupon_code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates an anonymous session identifier (1-128 characters, no whitespace).
pub fn validate_session_id(session_id: &str) -> ValidationResult<()> {
    if session_id.is_empty() {
        return Err(ValidationError::Required {
            field: "session_id".to_string(),
        });
    }

    if session_id.len() > 128 {
        return Err(ValidationError::TooLong {
            field: "session_id".to_string(),
            max: 128,
        });
    }

    if session_id.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "session_id".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Only the shape is checked (`local@domain.tld`); deliverability is not.
///
/// ## Example
/// ```rust
/// use lokum_core::validation::validate_email;
///
/// assert!(validate_email("ayse@example.com").is_ok());
/// assert!(validate_email("ayse@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let domain_ok = domain
        .split_once('.')
        .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
        .unwrap_or(false);

    if local.is_empty() || !domain_ok || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity requested for one cart line.
///
/// Applies to what the customer asks for in a single add or update. The
/// merged quantity of a line is bounded again by [`crate::cart::Cart`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in kuruş. Zero is allowed, negative is not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a rate in basis points (0% to 100%).
///
/// Used for the tax rate and for percentage coupons.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
