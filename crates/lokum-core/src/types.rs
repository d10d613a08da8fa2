//! # Domain Types
//!
//! Catalog types shared by the cart, coupon and order modules.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  WeightVariant  │   │      Rate       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  250g           │   │  bps (u32)      │       │
//! │  │  sku            │   │  500g           │   │  800 = 8%       │       │
//! │  │  price          │   │  1kg            │   └─────────────────┘       │
//! │  │  discounted     │   └─────────────────┘                              │
//! │  │  base_weight    │                                                    │
//! │  │  stock/variants │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A rate in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 800 bps = 8% (storefront tax), 1250 bps = a 12.5% coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a whole percentage: `Rate::percent(8)` is 8%.
    #[inline]
    pub const fn percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    /// Creates a rate from a fractional percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Weight Variant
// =============================================================================

/// Package weights a confectionery product can be sold in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum WeightVariant {
    #[serde(rename = "250g")]
    G250,
    #[serde(rename = "500g")]
    G500,
    #[serde(rename = "1kg")]
    Kg1,
}

impl WeightVariant {
    pub const ALL: [WeightVariant; 3] = [WeightVariant::G250, WeightVariant::G500, WeightVariant::Kg1];

    /// Weight in grams.
    pub const fn grams(&self) -> i64 {
        match self {
            WeightVariant::G250 => 250,
            WeightVariant::G500 => 500,
            WeightVariant::Kg1 => 1000,
        }
    }

    /// Storage/label form: `"250g"`, `"500g"`, `"1kg"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            WeightVariant::G250 => "250g",
            WeightVariant::G500 => "500g",
            WeightVariant::Kg1 => "1kg",
        }
    }

    /// Price multiplier when a product listed at `base` is sold as `self`.
    ///
    /// Only heavier packages change the price (250g→500g ×2, 250g→1kg ×4,
    /// 500g→1kg ×2). Lighter or equal selections keep the listed price.
    pub const fn multiplier_over(&self, base: WeightVariant) -> i64 {
        if self.grams() > base.grams() {
            self.grams() / base.grams()
        } else {
            1
        }
    }
}

impl fmt::Display for WeightVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightVariant {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "250g" => Ok(WeightVariant::G250),
            "500g" => Ok(WeightVariant::G500),
            "1kg" | "1000g" => Ok(WeightVariant::Kg1),
            _ => Err(ValidationError::InvalidFormat {
                field: "variant".to_string(),
                reason: "must be one of 250g, 500g, 1kg".to_string(),
            }),
        }
    }
}

// =============================================================================
// Unit Price Resolution
// =============================================================================

/// Resolves the unit price a cart line is charged.
///
/// ## Rules
/// 1. A discounted price wins when it is set and lower than the list price.
/// 2. A selected variant heavier than the product's base weight multiplies
///    the price by the weight ratio.
///
/// ## Example
/// ```rust
/// use lokum_core::money::Money;
/// use lokum_core::types::{resolve_unit_price, WeightVariant};
///
/// let price = resolve_unit_price(
///     Money::from_cents(10_000),
///     Some(Money::from_cents(8_000)),
///     Some(WeightVariant::G250),
///     Some(WeightVariant::Kg1),
/// );
/// assert_eq!(price.cents(), 32_000); // ₺80.00 × 4
/// ```
pub fn resolve_unit_price(
    price: Money,
    discounted_price: Option<Money>,
    base_weight: Option<WeightVariant>,
    variant: Option<WeightVariant>,
) -> Money {
    let mut unit_price = match discounted_price {
        Some(discounted) if discounted.is_positive() && discounted < price => discounted,
        _ => price,
    };

    if let (Some(selected), Some(base)) = (variant, base_weight) {
        unit_price = unit_price.multiply_quantity(selected.multiplier_over(base));
    }

    unit_price
}

// =============================================================================
// Product
// =============================================================================

/// Whether a product is visible and sellable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
}

impl Default for ProductStatus {
    fn default() -> Self {
        ProductStatus::Active
    }
}

/// Stock held for one weight variant of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStock {
    pub variant: WeightVariant,
    pub stock: i64,
}

/// A product available in the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// List price.
    pub price: Money,

    /// Sale price, applied when lower than `price`.
    pub discounted_price: Option<Money>,

    /// Weight the list price refers to.
    pub base_weight: Option<WeightVariant>,

    /// Stock for purchases without a weight variant.
    pub stock: i64,

    /// Per-variant stock. Empty when the product has no weight options.
    pub variants: Vec<VariantStock>,

    pub status: ProductStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price for the given variant selection.
    #[inline]
    pub fn unit_price(&self, variant: Option<WeightVariant>) -> Money {
        resolve_unit_price(self.price, self.discounted_price, self.base_weight, variant)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Stock available for the selection.
    ///
    /// ## Errors
    /// `VariantNotFound` when a variant is requested that this product
    /// does not offer.
    pub fn available_stock(&self, variant: Option<WeightVariant>) -> CoreResult<i64> {
        match variant {
            None => Ok(self.stock),
            Some(v) => self
                .variants
                .iter()
                .find(|vs| vs.variant == v)
                .map(|vs| vs.stock)
                .ok_or_else(|| CoreError::VariantNotFound {
                    product_id: self.id.clone(),
                    variant: v.to_string(),
                }),
        }
    }

    /// Checks the product can be sold in the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// add to cart / place order
    ///      │
    ///      ├── inactive?          → ProductUnavailable
    ///      ├── unknown variant?   → VariantNotFound
    ///      ├── stock < quantity?  → InsufficientStock
    ///      └── OK
    /// ```
    pub fn ensure_can_sell(&self, variant: Option<WeightVariant>, quantity: i64) -> CoreResult<()> {
        if !self.is_active() {
            return Err(CoreError::ProductUnavailable(self.name.clone()));
        }

        let available = self.available_stock(variant)?;
        if available < quantity {
            let product = match variant {
                Some(v) => format!("{} ({})", self.name, v),
                None => self.name.clone(),
            };
            return Err(CoreError::InsufficientStock {
                product,
                available,
                requested: quantity,
            });
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lokum() -> Product {
        Product {
            id: "p-1".to_string(),
            sku: "LOKUM-GUL".to_string(),
            name: "Rose Lokum".to_string(),
            price: Money::from_cents(10_000),
            discounted_price: None,
            base_weight: Some(WeightVariant::G250),
            stock: 10,
            variants: vec![
                VariantStock { variant: WeightVariant::G250, stock: 5 },
                VariantStock { variant: WeightVariant::Kg1, stock: 1 },
            ],
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rate_constructors() {
        assert_eq!(Rate::percent(8).bps(), 800);
        assert_eq!(Rate::from_percentage(12.5).bps(), 1250);
        assert!((Rate::from_bps(825).percentage() - 8.25).abs() < 0.001);
        assert!(Rate::default().is_zero());
    }

    #[test]
    fn test_weight_multipliers() {
        use WeightVariant::*;
        assert_eq!(G500.multiplier_over(G250), 2);
        assert_eq!(Kg1.multiplier_over(G250), 4);
        assert_eq!(Kg1.multiplier_over(G500), 2);
        assert_eq!(G250.multiplier_over(G500), 1);
        assert_eq!(G500.multiplier_over(G500), 1);
    }

    #[test]
    fn test_weight_variant_parse_and_serde() {
        assert_eq!("500G".parse::<WeightVariant>().unwrap(), WeightVariant::G500);
        assert_eq!("1kg".parse::<WeightVariant>().unwrap(), WeightVariant::Kg1);
        assert!("2kg".parse::<WeightVariant>().is_err());

        let json = serde_json::to_string(&WeightVariant::Kg1).unwrap();
        assert_eq!(json, "\"1kg\"");
    }

    #[test]
    fn test_discounted_price_only_when_lower() {
        let list = Money::from_cents(10_000);
        assert_eq!(resolve_unit_price(list, Some(Money::from_cents(9_000)), None, None).cents(), 9_000);
        assert_eq!(resolve_unit_price(list, Some(Money::from_cents(12_000)), None, None).cents(), 10_000);
        assert_eq!(resolve_unit_price(list, Some(Money::zero()), None, None).cents(), 10_000);
    }

    #[test]
    fn test_variant_without_base_weight_keeps_price() {
        let price = resolve_unit_price(Money::from_cents(5_000), None, None, Some(WeightVariant::Kg1));
        assert_eq!(price.cents(), 5_000);
    }

    #[test]
    fn test_product_unit_price() {
        let product = lokum();
        assert_eq!(product.unit_price(None).cents(), 10_000);
        assert_eq!(product.unit_price(Some(WeightVariant::G500)).cents(), 20_000);
        assert_eq!(product.unit_price(Some(WeightVariant::Kg1)).cents(), 40_000);
    }

    #[test]
    fn test_ensure_can_sell() {
        let product = lokum();
        assert!(product.ensure_can_sell(None, 10).is_ok());
        assert!(matches!(
            product.ensure_can_sell(None, 11),
            Err(CoreError::InsufficientStock { available: 10, requested: 11, .. })
        ));
        assert!(matches!(
            product.ensure_can_sell(Some(WeightVariant::Kg1), 2),
            Err(CoreError::InsufficientStock { available: 1, .. })
        ));
        assert!(matches!(
            product.ensure_can_sell(Some(WeightVariant::G500), 1),
            Err(CoreError::VariantNotFound { .. })
        ));

        let mut inactive = lokum();
        inactive.status = ProductStatus::Inactive;
        assert!(matches!(
            inactive.ensure_can_sell(None, 1),
            Err(CoreError::ProductUnavailable(_))
        ));
    }
}
