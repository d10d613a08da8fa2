//! # lokum-core: Pricing and Cart Rules for the Lokum Storefront
//!
//! Everything the storefront decides about money lives here: resolving a
//! unit price, pricing a cart, checking a coupon, deciding what an order
//! looks like when it is placed, cancelled or paid. No I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lokum Storefront                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Storefront / Admin handlers                        │   │
//! │  │    add to cart, apply coupon, checkout, order tracking          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    lokum-db (Database Layer)                    │   │
//! │  │        SQLite repositories: products, carts, coupons, orders    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ lokum-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ pricing │ │  cart   │ │ coupon  │ │  order  │  │   │
//! │  │   │  Money  │ │ Summary │ │  Cart   │ │ Coupon  │ │  Order  │  │   │
//! │  │   │  Rate   │ │ Config  │ │CartLine │ │  Check  │ │ Status  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money in kuruş with half-up rate application
//! - [`types`] - Product, weight variants, rates
//! - [`pricing`] - The cart summary computation
//! - [`cart`] - Cart aggregate and its mutation rules
//! - [`coupon`] - Coupon records and eligibility
//! - [`order`] - Order records and lifecycle rules
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use lokum_core::cart::{Cart, CartOwner};
//! use lokum_core::money::Money;
//! use lokum_core::pricing::PricingConfig;
//!
//! let mut cart = Cart::new(CartOwner::Session("guest-42".into()));
//! cart.add_item("p-1", "Rose Lokum", None, 1, Money::from_cents(5_000)).unwrap();
//!
//! let summary = cart.summary(&PricingConfig::default());
//! assert_eq!(summary.tax.cents(), 400);
//! assert_eq!(summary.shipping.cents(), 3_000); // below the ₺200.00 threshold
//! assert_eq!(summary.total.cents(), 8_400);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod coupon;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartOwner};
pub use coupon::{Coupon, CouponCheck, CouponDiscount, CouponKind, CouponStatus};
pub use error::{CoreError, CoreResult, CouponError, ValidationError};
pub use money::Money;
pub use order::{Invoice, Order, OrderItem, OrderNote, OrderStatus, PaymentMethod, PaymentStatus};
pub use pricing::{compute_summary, CartSummary, PricingConfig};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Catches typos like 1000 instead of 10 before they reach stock checks.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Currency every order is recorded in.
pub const DEFAULT_CURRENCY: &str = "TRY";
