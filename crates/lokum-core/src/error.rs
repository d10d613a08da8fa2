//! # Rule Violations
//!
//! What the storefront rules reject, and why.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Who Raises What                                     │
//! │                                                                         │
//! │  lokum-core errors (this file)                                         │
//! │  ├── CoreError        - Cart / stock / order rule violations           │
//! │  ├── CouponError      - Coupon eligibility failures                    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  lokum-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures (wraps CoreError)  │
//! │                                                                         │
//! │  Flow: ValidationError / CouponError → CoreError → DbError → caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pricing engine itself never fails; these errors come from the
//! collaborators around it (cart mutation, coupon checks, checkout).

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// A cart, stock or order rule said no.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is not active (hidden from the storefront).
    #[error("Product {0} is not available")]
    ProductUnavailable(String),

    /// Requested weight variant is not offered for the product.
    #[error("Product {product_id} has no {variant} variant")]
    VariantNotFound { product_id: String, variant: String },

    /// Raised twice for the same line: once when it is added to the cart,
    /// and again at checkout, since stock may have sold out in between.
    ///
    /// `product` is the display label, e.g. `"Güllü Lokum 500g"`.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Cart line id does not belong to the cart.
    #[error("Cart item not found: {0}")]
    CartItemNotFound(String),

    /// Checkout attempted on an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order is past the point where it can be cancelled.
    #[error("Order {order_id} is {status}, cannot be cancelled")]
    OrderNotCancellable { order_id: String, status: String },

    /// Coupon could not be applied.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Coupon Error
// =============================================================================

/// Reasons a coupon is rejected before it reaches the pricing engine.
///
/// Variants are listed in the order the checks run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Coupon {0} not found")]
    NotFound(String),

    #[error("Coupon is not active")]
    Inactive,

    #[error("Coupon is not valid until {starts_at}")]
    NotStarted { starts_at: DateTime<Utc> },

    #[error("Coupon expired at {ended_at}")]
    Expired { ended_at: DateTime<Utc> },

    #[error("Minimum cart amount for this coupon is {minimum}")]
    BelowMinimum { minimum: Money },

    #[error("Coupon usage limit reached")]
    UsageLimitReached,

    #[error("You cannot use this coupon again")]
    PerUserLimitReached,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements and are raised
/// before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
