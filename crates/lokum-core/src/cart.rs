//! # Cart
//!
//! The cart aggregate: lines with already-resolved unit prices, at most one
//! applied coupon, and the mutation rules that keep both consistent.
//!
//! ## Line Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(product, variant, qty)                                        │
//! │       │                                                                 │
//! │       ├── same product AND same variant already in cart?                │
//! │       │        yes → quantity += qty   (line keeps its id)              │
//! │       │        no  → new line appended                                  │
//! │       ▼                                                                 │
//! │  update_quantity(line, q)                                               │
//! │       ├── q <= 0 → line removed                                         │
//! │       └── q > 0  → quantity = q                                         │
//! │       ▼                                                                 │
//! │  remove_item(line) / clear()   (clear also drops the coupon)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence lives in `lokum-db`; this module only decides what the cart
//! should look like after each operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::coupon::Coupon;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{CartSummary, PricingConfig};
use crate::types::{Product, WeightVariant};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One product/variant pair in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub id: String,
    pub product_id: String,
    /// Product name at load time, for display and order snapshots.
    pub name: String,
    pub variant: Option<WeightVariant>,
    pub quantity: i64,
    /// Unit price with sale price and weight multiplier already applied.
    pub unit_price: Money,
}

impl CartLine {
    /// `unit_price × quantity`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    fn matches(&self, product_id: &str, variant: Option<WeightVariant>) -> bool {
        self.product_id == product_id && self.variant == variant
    }
}

// =============================================================================
// Owner
// =============================================================================

/// Who a cart belongs to: a registered user or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    User(String),
    Session(String),
}

impl CartOwner {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            CartOwner::User(id) => Some(id),
            CartOwner::Session(_) => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            CartOwner::User(_) => None,
            CartOwner::Session(id) => Some(id),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub owner: CartOwner,
    pub lines: Vec<CartLine>,
    pub coupon: Option<Coupon>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart for `owner`.
    pub fn new(owner: CartOwner) -> Self {
        let now = Utc::now();
        Cart {
            id: Uuid::new_v4().to_string(),
            owner,
            lines: Vec::new(),
            coupon: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Adds `quantity` units of a product/variant, merging with an existing
    /// line for the same pair.
    ///
    /// Returns the resulting line (new or merged).
    ///
    /// ## Errors
    /// - `Validation` if `quantity` is not positive
    /// - `QuantityTooLarge` if the merged quantity exceeds [`MAX_ITEM_QUANTITY`]
    /// - `CartTooLarge` if a new line would exceed [`MAX_CART_ITEMS`]
    pub fn add_item(
        &mut self,
        product_id: &str,
        name: &str,
        variant: Option<WeightVariant>,
        quantity: i64,
        unit_price: Money,
    ) -> CoreResult<CartLine> {
        crate::validation::validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.matches(product_id, variant)) {
            let merged = line.quantity + quantity;
            if merged > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.quantity = merged;
            let line = line.clone();
            self.touch();
            return Ok(line);
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        }

        let line = CartLine {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            name: name.to_string(),
            variant,
            quantity,
            unit_price,
        };
        self.lines.push(line.clone());
        self.touch();
        Ok(line)
    }

    /// Adds a catalog product, resolving its unit price for `variant`.
    ///
    /// Stock is checked against the quantity the line will hold after the
    /// merge, not just the units being added.
    pub fn add_product(
        &mut self,
        product: &Product,
        variant: Option<WeightVariant>,
        quantity: i64,
    ) -> CoreResult<CartLine> {
        let already = self
            .lines
            .iter()
            .find(|l| l.matches(&product.id, variant))
            .map(|l| l.quantity)
            .unwrap_or(0);
        product.ensure_can_sell(variant, already + quantity)?;

        self.add_item(
            &product.id,
            &product.name,
            variant,
            quantity,
            product.unit_price(variant),
        )
    }

    /// Sets a line's quantity. A quantity of zero or less removes the line.
    ///
    /// Returns the updated line, or `None` when it was removed.
    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> CoreResult<Option<CartLine>> {
        if quantity <= 0 {
            self.remove_item(line_id)?;
            return Ok(None);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::CartItemNotFound(line_id.to_string()))?;
        line.quantity = quantity;
        let line = line.clone();
        self.touch();
        Ok(Some(line))
    }

    /// Removes a line and returns it.
    pub fn remove_item(&mut self, line_id: &str) -> CoreResult<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::CartItemNotFound(line_id.to_string()))?;
        let line = self.lines.remove(index);
        self.touch();
        Ok(line)
    }

    /// Empties the cart and drops any applied coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon = None;
        self.touch();
    }

    /// Attaches a coupon, replacing any previous one.
    ///
    /// Eligibility is the caller's job (see [`Coupon::validate`]).
    pub fn apply_coupon(&mut self, coupon: Coupon) {
        self.coupon = Some(coupon);
        self.touch();
    }

    pub fn remove_coupon(&mut self) -> Option<Coupon> {
        let coupon = self.coupon.take();
        self.touch();
        coupon
    }

    /// Moves a guest cart's contents into this cart.
    ///
    /// Guest lines are added one by one (merging with matching lines). The
    /// guest coupon is adopted only when this cart has none. The guest cart
    /// is left empty.
    ///
    /// Lines that would break a cart limit are skipped and returned so the
    /// caller can report them.
    pub fn merge_from(&mut self, guest: &mut Cart) -> Vec<(CartLine, CoreError)> {
        let mut rejected = Vec::new();

        for line in guest.lines.drain(..) {
            if let Err(err) = self.add_item(
                &line.product_id,
                &line.name,
                line.variant,
                line.quantity,
                line.unit_price,
            ) {
                rejected.push((line, err));
            }
        }

        if let Some(coupon) = guest.coupon.take() {
            if self.coupon.is_none() {
                self.coupon = Some(coupon);
            }
        }

        guest.touch();
        self.touch();
        rejected
    }

    /// Prices the cart with `config`.
    pub fn summary(&self, config: &PricingConfig) -> CartSummary {
        config.compute_summary(&self.lines, self.coupon.as_ref())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
