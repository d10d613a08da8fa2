//! # Money
//!
//! Every price, discount, tax and total in the storefront is a `Money`:
//! a whole number of kuruş.
//!
//! ## Kuruş, Not Floats
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ROUNDING DRIFT                                                         │
//! │                                                                         │
//! │  With binary floats:                                                    │
//! │    240 * 0.08 = 19.2 but 0.1 + 0.2 = 0.30000000000000004              │
//! │                                                                         │
//! │  A storefront that rounds tax in floats drifts by a kuruş here and     │
//! │  there, and the order total no longer matches what the cart showed.    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (kuruş)                              │
//! │    24000 kuruş × 800 bps = 1920 kuruş, exactly                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use lokum_core::money::Money;
//!
//! let price = Money::from_cents(12_000); // ₺120.00
//! let line_total = price.multiply_quantity(2);
//! assert_eq!(line_total.cents(), 24_000);
//!
//! let shipping: Money = "30.00".parse().unwrap();
//! assert_eq!(shipping, Money::from_major_minor(30, 0));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (kuruş for TRY).
///
/// ## Representation
/// - **i64 (signed)**: subtraction of a discount never wraps
/// - **Newtype over i64**: copies like an integer, compares like one
/// - **Serialized as the bare integer**: `12000`, never `"120.00"`
///
/// ## Where Money Flows
/// ```text
/// Product.price ──► CartLine.unit_price ──► CartLine.line_total
///                                               │
///                                               ▼
///                 CartSummary { subtotal, discount, tax, shipping, total }
///                                               │
///                                               ▼
///                                Order.{subtotal, tax, ..., total}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from kuruş (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use lokum_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // ₺10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from lira and kuruş.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -₺5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in kuruş.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (lira) portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is greater than zero.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is less than zero.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Applies a rate and rounds the result half-up to the nearest kuruş.
    ///
    /// This is the single rounding primitive of the pricing engine: tax
    /// (`subtotal × 8%`) and percentage coupons (`subtotal × 20%`) both go
    /// through it, so every implementation agrees to the kuruş.
    ///
    /// ## Implementation
    /// Integer math: `(amount × bps + 5000) / 10000`. Negative amounts are
    /// rounded on their magnitude so that rounding is symmetric.
    ///
    /// ## Example
    /// ```rust
    /// use lokum_core::money::Money;
    /// use lokum_core::types::Rate;
    ///
    /// let subtotal = Money::from_cents(24_000); // ₺240.00
    /// let tax = subtotal.apply_rate(Rate::percent(8));
    /// assert_eq!(tax.cents(), 1_920); // ₺19.20
    ///
    /// // ₺0.05 × 50% = 2.5 kuruş → 3 (half-up)
    /// assert_eq!(Money::from_cents(5).apply_rate(Rate::percent(50)).cents(), 3);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        // i128 keeps large subtotals from overflowing the multiplication
        let magnitude = (self.0.unsigned_abs() as i128 * rate.bps() as i128 + 5000) / 10000;
        let cents = magnitude as i64;
        if self.0 < 0 {
            Money(-cents)
        } else {
            Money(cents)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use lokum_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(4_500); // ₺45.00
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 13_500);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        self.max(Money::zero())
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses a decimal amount such as `"30"`, `"30.5"` or `"200.00"`.
///
/// At most two fractional digits are accepted; anything finer than a kuruş
/// is rejected rather than silently rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() || !major_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number like 30.00"));
        }
        if minor_str.len() > 2 || !minor_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places are allowed"));
        }

        let major: i64 = major_str
            .parse()
            .map_err(|_| invalid("amount is too large"))?;
        let minor: i64 = match minor_str.len() {
            0 => 0,
            1 => minor_str.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => minor_str.parse().map_err(|_| invalid("bad fraction"))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows lira with two decimals, e.g. `₺259.20`.
///
/// ## Note
/// For logs and error messages. Storefront formatting is localized elsewhere.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₺{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
