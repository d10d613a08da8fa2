//! # Pricing Engine
//!
//! Turns cart lines and an optional coupon into a [`CartSummary`].
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► subtotal = Σ unit_price × quantity                           │
//! │               │                                                         │
//! │               ├──► tax      = round(subtotal × tax_rate)     (8%)       │
//! │               ├──► discount = coupon formula, within [0, subtotal]      │
//! │               └──► shipping = 0 if subtotal ≥ threshold else cost       │
//! │                                                                         │
//! │  total = (subtotal − discount) + tax + shipping                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax is charged on the subtotal before the discount. The engine is a total
//! function: no I/O, no errors, same input gives the same output. Coupon
//! eligibility is decided before the engine runs.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::CartLine;
use crate::coupon::Coupon;
use crate::money::Money;
use crate::types::Rate;

// =============================================================================
// Configuration
// =============================================================================

/// Storefront pricing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingConfig {
    pub tax_rate: Rate,
    /// Subtotals at or above this ship for free.
    pub free_shipping_threshold: Money,
    pub shipping_cost: Money,
    /// When set, an empty cart is charged the flat shipping cost instead of
    /// producing an all-zero summary.
    pub charge_shipping_on_empty_cart: bool,
}

impl PricingConfig {
    pub const DEFAULT_TAX_RATE: Rate = Rate::percent(8);
    pub const DEFAULT_FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(20_000);
    pub const DEFAULT_SHIPPING_COST: Money = Money::from_cents(3_000);

    /// Computes the summary for `lines` with an optional, already validated,
    /// coupon.
    ///
    /// ## Example
    /// ```rust
    /// use lokum_core::cart::CartLine;
    /// use lokum_core::money::Money;
    /// use lokum_core::pricing::PricingConfig;
    ///
    /// let lines = vec![CartLine {
    ///     id: "l-1".into(),
    ///     product_id: "p-1".into(),
    ///     name: "Rose Lokum".into(),
    ///     variant: None,
    ///     quantity: 2,
    ///     unit_price: Money::from_cents(12_000),
    /// }];
    ///
    /// let summary = PricingConfig::default().compute_summary(&lines, None);
    /// assert_eq!(summary.subtotal.cents(), 24_000);
    /// assert_eq!(summary.tax.cents(), 1_920);
    /// assert_eq!(summary.shipping.cents(), 0);
    /// assert_eq!(summary.total.cents(), 25_920);
    /// ```
    pub fn compute_summary(&self, lines: &[CartLine], coupon: Option<&Coupon>) -> CartSummary {
        if lines.is_empty() {
            return self.empty_summary();
        }

        let subtotal: Money = lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal.apply_rate(self.tax_rate);
        let discount = coupon
            .map(|c| c.discount_for(subtotal))
            .unwrap_or_default();
        let shipping = self.shipping_for(subtotal);

        CartSummary {
            subtotal,
            discount,
            tax,
            shipping,
            total: (subtotal - discount) + tax + shipping,
        }
    }

    /// Shipping charged for a non-empty cart with this subtotal.
    pub fn shipping_for(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_shipping_threshold {
            Money::zero()
        } else {
            self.shipping_cost
        }
    }

    fn empty_summary(&self) -> CartSummary {
        if self.charge_shipping_on_empty_cart {
            CartSummary {
                shipping: self.shipping_cost,
                total: self.shipping_cost,
                ..CartSummary::default()
            }
        } else {
            CartSummary::default()
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            tax_rate: Self::DEFAULT_TAX_RATE,
            free_shipping_threshold: Self::DEFAULT_FREE_SHIPPING_THRESHOLD,
            shipping_cost: Self::DEFAULT_SHIPPING_COST,
            charge_shipping_on_empty_cart: false,
        }
    }
}

/// [`PricingConfig::compute_summary`] with the default storefront config.
pub fn compute_summary(lines: &[CartLine], coupon: Option<&Coupon>) -> CartSummary {
    PricingConfig::default().compute_summary(lines, coupon)
}

// =============================================================================
// Summary
// =============================================================================

/// The priced cart. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartSummary {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

impl CartSummary {
    /// `total == subtotal − discount + tax + shipping` and
    /// `0 ≤ discount ≤ max(subtotal, 0)`.
    pub fn is_consistent(&self) -> bool {
        let total_ok = self.total == (self.subtotal - self.discount) + self.tax + self.shipping;
        let discount_ok = !self.discount.is_negative() && self.discount <= self.subtotal.non_negative();
        total_ok && discount_ok
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
