//! # Coupons
//!
//! Coupon records, their discount formula, and the eligibility check that
//! runs before a coupon is attached to a cart.
//!
//! ## Two Separate Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply coupon "HOSGELDIN10"                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Coupon::validate(CouponCheck)   ← eligibility (status, dates, limits) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cart.coupon = Some(coupon)                                             │
//! │       │                                                                 │
//! │       ▼  (every summary request)                                        │
//! │  Coupon::discount_for(subtotal)  ← formula only, never re-validates    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CouponError;
use crate::money::Money;
use crate::types::Rate;

// =============================================================================
// Kinds
// =============================================================================

/// Discount kind as stored alongside the coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    Percentage,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Active,
    Inactive,
}

/// The kind-specific part of a coupon.
///
/// `max_discount` exists only on percentage coupons; a fixed coupon is
/// already bounded by its own amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CouponDiscount {
    Percentage {
        rate: Rate,
        max_discount: Option<Money>,
    },
    Fixed {
        amount: Money,
    },
}

impl CouponDiscount {
    pub fn kind(&self) -> CouponKind {
        match self {
            CouponDiscount::Percentage { .. } => CouponKind::Percentage,
            CouponDiscount::Fixed { .. } => CouponKind::Fixed,
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A coupon as fetched from the coupon store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    /// Unique, stored upper-case.
    pub code: String,
    pub discount: CouponDiscount,
    /// Minimum cart subtotal required to apply the coupon.
    pub min_amount: Option<Money>,
    /// Total redemptions allowed across all customers.
    pub usage_limit: Option<u32>,
    pub usage_count: u32,
    /// Redemptions allowed per registered customer.
    pub per_user_limit: Option<u32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: CouponStatus,
}

/// Facts the eligibility check needs besides the coupon itself.
#[derive(Debug, Clone, Copy)]
pub struct CouponCheck {
    pub now: DateTime<Utc>,
    pub cart_subtotal: Money,
    /// Prior redemptions by the customer; `None` for guest carts.
    pub user_usage_count: Option<u32>,
}

impl Coupon {
    pub fn kind(&self) -> CouponKind {
        self.discount.kind()
    }

    /// Discount this coupon grants on `subtotal`.
    ///
    /// ## Formula
    /// - percentage: `round(subtotal × rate, 2)`, capped at `max_discount`
    ///   when that is set and positive
    /// - fixed: `min(amount, subtotal)`
    ///
    /// The result is always within `[0, subtotal]`.
    ///
    /// ## Example
    /// ```rust
    /// use lokum_core::coupon::{Coupon, CouponDiscount, CouponStatus};
    /// use lokum_core::money::Money;
    /// use lokum_core::types::Rate;
    ///
    /// let coupon = Coupon {
    ///     id: "c-1".into(),
    ///     code: "YUZDE20".into(),
    ///     discount: CouponDiscount::Percentage {
    ///         rate: Rate::percent(20),
    ///         max_discount: Some(Money::from_cents(1_500)),
    ///     },
    ///     min_amount: None,
    ///     usage_limit: None,
    ///     usage_count: 0,
    ///     per_user_limit: None,
    ///     start_date: None,
    ///     end_date: None,
    ///     status: CouponStatus::Active,
    /// };
    ///
    /// // 20% of ₺100.00 is ₺20.00, capped to ₺15.00
    /// assert_eq!(coupon.discount_for(Money::from_cents(10_000)).cents(), 1_500);
    /// ```
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.discount {
            CouponDiscount::Percentage { rate, max_discount } => {
                let discount = subtotal.apply_rate(rate);
                match max_discount {
                    Some(max) if max.is_positive() && discount > max => max,
                    _ => discount,
                }
            }
            CouponDiscount::Fixed { amount } => amount.min(subtotal),
        };

        raw.min(subtotal).non_negative()
    }

    /// Checks whether the coupon may be attached to a cart.
    ///
    /// ## Order of Checks
    /// ```text
    /// status active?           → Inactive
    /// start_date <= now?       → NotStarted
    /// end_date >= now?         → Expired
    /// subtotal >= min_amount?  → BelowMinimum      (only if min_amount > 0)
    /// usage_count < limit?     → UsageLimitReached (only if limit > 0)
    /// user usage < per-user?   → PerUserLimitReached (registered users only)
    /// ```
    pub fn validate(&self, check: &CouponCheck) -> Result<(), CouponError> {
        if self.status != CouponStatus::Active {
            return Err(CouponError::Inactive);
        }

        if let Some(starts_at) = self.start_date {
            if starts_at > check.now {
                return Err(CouponError::NotStarted { starts_at });
            }
        }

        if let Some(ended_at) = self.end_date {
            if ended_at < check.now {
                return Err(CouponError::Expired { ended_at });
            }
        }

        if let Some(minimum) = self.min_amount.filter(Money::is_positive) {
            if check.cart_subtotal < minimum {
                return Err(CouponError::BelowMinimum { minimum });
            }
        }

        if let Some(limit) = self.usage_limit.filter(|l| *l > 0) {
            if self.usage_count >= limit {
                return Err(CouponError::UsageLimitReached);
            }
        }

        if let (Some(limit), Some(used)) = (self.per_user_limit.filter(|l| *l > 0), check.user_usage_count) {
            if used >= limit {
                return Err(CouponError::PerUserLimitReached);
            }
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
