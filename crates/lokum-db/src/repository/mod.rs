//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Handler                                                               │
//! │       │  db.carts().add_item(&owner, "p-1", Some(G500), 2)             │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── load rows  ───────────► lokum_core::Cart                          │
//! │  ├── apply the rule ───────► cart.add_product(..)   (pure)             │
//! │  └── write back the diff ──► INSERT / UPDATE cart_items                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each repository is a cheap `Clone` over the shared pool. Helpers that
//! must run inside another repository's transaction take a
//! `&mut SqliteConnection` and are `pub(crate)`.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock
//! - [`CouponRepository`](coupon::CouponRepository) - Coupons and usage
//! - [`CartRepository`](cart::CartRepository) - Carts, lines, coupon on cart
//! - [`OrderRepository`](order::OrderRepository) - Checkout and order lifecycle

pub mod cart;
pub mod coupon;
pub mod order;
pub mod product;

use lokum_core::WeightVariant;

use crate::error::{DbError, DbResult};

/// Parses a stored weight variant label (`'250g'`, `'500g'`, `'1kg'`).
pub(crate) fn parse_variant(raw: Option<String>) -> DbResult<Option<WeightVariant>> {
    raw.map(|label| {
        label
            .parse::<WeightVariant>()
            .map_err(|e| DbError::corrupt("variant", e))
    })
    .transpose()
}

/// Storage label for an optional weight variant.
pub(crate) fn variant_label(variant: Option<WeightVariant>) -> Option<&'static str> {
    variant.map(|v| v.as_str())
}

/// Converts a stored non-negative counter to `u32`.
pub(crate) fn to_u32(column: &str, value: i64) -> DbResult<u32> {
    u32::try_from(value).map_err(|e| DbError::corrupt(column, e))
}
