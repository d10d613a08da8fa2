//! # Cart Repository
//!
//! Persistent carts keyed by [`CartOwner`]. Every operation loads the cart
//! into a [`lokum_core::Cart`], applies the rule there, writes back what
//! changed and returns the reloaded cart.
//!
//! ## Price Freshness
//! ```text
//! cart_items stores:    product_id, variant, quantity
//! loaded from products: name, price, discounted price, base weight
//!                       └──► resolve_unit_price(..) on every load
//! ```
//! A price change in the catalog is reflected in every open cart.
//!
//! ## Guest → User Merge
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  login(user, session)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  merge(user_id, session_id)                                             │
//! │   ├── guest lines added to the user cart (same product+variant merge)   │
//! │   ├── guest coupon adopted only if the user cart has none AND it is     │
//! │   │   still valid for the merged cart (otherwise logged and dropped)    │
//! │   └── guest cart emptied                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::DbResult;
use crate::repository::coupon::{count_user_usage, load_coupon_by_code, load_coupon_by_id};
use crate::repository::product::load_product;
use crate::repository::{parse_variant, variant_label};
use lokum_core::validation::{validate_coupon_code, validate_session_id};
use lokum_core::{
    resolve_unit_price, Cart, CartLine, CartOwner, CartSummary, CoreError, Coupon, CouponCheck,
    CouponError, Money, PricingConfig, ValidationError, WeightVariant,
};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: String,
    coupon_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: String,
    product_id: String,
    variant: Option<String>,
    quantity: i64,
    name: String,
    price_cents: i64,
    discounted_price_cents: Option<i64>,
    base_weight: Option<String>,
}

impl CartLineRow {
    fn into_line(self) -> DbResult<CartLine> {
        let variant = parse_variant(self.variant)?;
        let unit_price = resolve_unit_price(
            Money::from_cents(self.price_cents),
            self.discounted_price_cents.map(Money::from_cents),
            parse_variant(self.base_weight)?,
            variant,
        );

        Ok(CartLine {
            id: self.id,
            product_id: self.product_id,
            name: self.name,
            variant,
            quantity: self.quantity,
            unit_price,
        })
    }
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

fn validate_owner(owner: &CartOwner) -> DbResult<()> {
    match owner {
        CartOwner::Session(id) => validate_session_id(id)?,
        CartOwner::User(id) => {
            if id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "user_id".to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}

async fn find_cart_row(conn: &mut SqliteConnection, owner: &CartOwner) -> DbResult<Option<CartRow>> {
    let (column, key) = match owner {
        CartOwner::User(id) => ("user_id", id),
        CartOwner::Session(id) => ("session_id", id),
    };

    let row = sqlx::query_as::<_, CartRow>(&format!(
        "SELECT id, coupon_id, created_at, updated_at FROM carts WHERE {column} = ?1"
    ))
    .bind(key)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}

async fn hydrate(conn: &mut SqliteConnection, owner: &CartOwner, row: CartRow) -> DbResult<Cart> {
    let line_rows = sqlx::query_as::<_, CartLineRow>(
        r#"
        SELECT
            ci.id, ci.product_id, ci.variant, ci.quantity,
            p.name, p.price_cents, p.discounted_price_cents, p.base_weight
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = ?1
        ORDER BY ci.created_at, ci.rowid
        "#,
    )
    .bind(&row.id)
    .fetch_all(&mut *conn)
    .await?;

    let lines = line_rows
        .into_iter()
        .map(CartLineRow::into_line)
        .collect::<DbResult<Vec<_>>>()?;

    let coupon = match &row.coupon_id {
        Some(coupon_id) => load_coupon_by_id(conn, coupon_id).await?,
        None => None,
    };

    Ok(Cart {
        id: row.id,
        owner: owner.clone(),
        lines,
        coupon,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Loads the owner's cart without creating one.
pub(crate) async fn load_cart(conn: &mut SqliteConnection, owner: &CartOwner) -> DbResult<Option<Cart>> {
    match find_cart_row(conn, owner).await? {
        Some(row) => Ok(Some(hydrate(conn, owner, row).await?)),
        None => Ok(None),
    }
}

/// Loads the owner's cart, creating an empty one on first access.
pub(crate) async fn load_or_create(conn: &mut SqliteConnection, owner: &CartOwner) -> DbResult<Cart> {
    if let Some(cart) = load_cart(conn, owner).await? {
        return Ok(cart);
    }

    let cart = Cart::new(owner.clone());
    sqlx::query(
        r#"
        INSERT INTO carts (id, user_id, session_id, coupon_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, NULL, ?4, ?5)
        "#,
    )
    .bind(&cart.id)
    .bind(owner.user_id())
    .bind(owner.session_id())
    .bind(cart.created_at)
    .bind(cart.updated_at)
    .execute(&mut *conn)
    .await?;

    debug!(cart_id = %cart.id, owner = ?owner, "Cart created");
    Ok(cart)
}

async fn save_line(conn: &mut SqliteConnection, cart_id: &str, line: &CartLine) -> DbResult<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO cart_items (id, cart_id, product_id, variant, quantity, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ON CONFLICT (id) DO UPDATE SET
            quantity = excluded.quantity,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&line.id)
    .bind(cart_id)
    .bind(&line.product_id)
    .bind(variant_label(line.variant))
    .bind(line.quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn delete_line(conn: &mut SqliteConnection, cart_id: &str, line_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = ?1 AND cart_id = ?2")
        .bind(line_id)
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn set_coupon(conn: &mut SqliteConnection, cart_id: &str, coupon_id: Option<&str>) -> DbResult<()> {
    sqlx::query("UPDATE carts SET coupon_id = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(cart_id)
        .bind(coupon_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn touch(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE carts SET updated_at = ?2 WHERE id = ?1")
        .bind(cart_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Removes every line and the applied coupon.
pub(crate) async fn clear_cart(conn: &mut SqliteConnection, cart_id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = ?1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await?;
    set_coupon(conn, cart_id, None).await
}

/// Runs the coupon eligibility check for `cart`.
pub(crate) async fn check_coupon(conn: &mut SqliteConnection, cart: &Cart, coupon: &Coupon) -> DbResult<()> {
    let user_usage_count = match cart.owner.user_id() {
        Some(user_id) => Some(count_user_usage(conn, &coupon.id, user_id).await?),
        None => None,
    };

    coupon.validate(&CouponCheck {
        now: Utc::now(),
        cart_subtotal: cart.subtotal(),
        user_usage_count,
    })?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Returns the owner's cart, creating it on first access.
    pub async fn get_or_create(&self, owner: &CartOwner) -> DbResult<Cart> {
        validate_owner(owner)?;
        let mut conn = self.pool.acquire().await?;
        load_or_create(&mut conn, owner).await
    }

    /// Adds a product to the cart, merging with a line for the same
    /// product and variant.
    ///
    /// ## Errors
    /// - `ProductNotFound` / `ProductUnavailable`
    /// - `VariantNotFound` when the product doesn't offer `variant`
    /// - `InsufficientStock` when the merged quantity exceeds stock
    /// - `QuantityTooLarge` / `CartTooLarge`
    pub async fn add_item(
        &self,
        owner: &CartOwner,
        product_id: &str,
        variant: Option<WeightVariant>,
        quantity: i64,
    ) -> DbResult<Cart> {
        validate_owner(owner)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = load_or_create(&mut tx, owner).await?;

        let product = load_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        let line = cart.add_product(&product, variant, quantity)?;

        save_line(&mut tx, &cart.id, &line).await?;
        touch(&mut tx, &cart.id).await?;
        let cart = load_or_create(&mut tx, owner).await?;
        tx.commit().await?;

        debug!(
            cart_id = %cart.id,
            product_id = %product_id,
            variant = ?variant_label(variant),
            quantity = line.quantity,
            "Cart line saved"
        );
        Ok(cart)
    }

    /// Sets a line's quantity; zero or less removes the line.
    pub async fn update_item(&self, owner: &CartOwner, line_id: &str, quantity: i64) -> DbResult<Cart> {
        validate_owner(owner)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = load_or_create(&mut tx, owner).await?;

        if quantity > 0 {
            if let Some(line) = cart.line(line_id) {
                let product = load_product(&mut tx, &line.product_id)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
                product.ensure_can_sell(line.variant, quantity)?;
            }
        }

        match cart.update_quantity(line_id, quantity)? {
            Some(line) => save_line(&mut tx, &cart.id, &line).await?,
            None => delete_line(&mut tx, &cart.id, line_id).await?,
        }
        touch(&mut tx, &cart.id).await?;

        let cart = load_or_create(&mut tx, owner).await?;
        tx.commit().await?;

        debug!(cart_id = %cart.id, line_id = %line_id, quantity, "Cart line updated");
        Ok(cart)
    }

    /// Removes a line.
    pub async fn remove_item(&self, owner: &CartOwner, line_id: &str) -> DbResult<Cart> {
        validate_owner(owner)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = load_or_create(&mut tx, owner).await?;

        cart.remove_item(line_id)?;
        delete_line(&mut tx, &cart.id, line_id).await?;
        touch(&mut tx, &cart.id).await?;

        let cart = load_or_create(&mut tx, owner).await?;
        tx.commit().await?;

        debug!(cart_id = %cart.id, line_id = %line_id, "Cart line removed");
        Ok(cart)
    }

    /// Empties the cart and drops the applied coupon.
    pub async fn clear(&self, owner: &CartOwner) -> DbResult<Cart> {
        validate_owner(owner)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = load_or_create(&mut tx, owner).await?;
        clear_cart(&mut tx, &cart.id).await?;
        tx.commit().await?;

        cart.clear();
        debug!(cart_id = %cart.id, "Cart cleared");
        Ok(cart)
    }

    /// Validates a coupon against the cart and attaches it.
    ///
    /// ## Errors
    /// `Core(Coupon(..))` with the first failed check: not found, inactive,
    /// not started, expired, below minimum, usage limit, per-user limit.
    pub async fn apply_coupon(&self, owner: &CartOwner, code: &str) -> DbResult<Cart> {
        validate_owner(owner)?;
        let code = validate_coupon_code(code)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = load_or_create(&mut tx, owner).await?;

        let coupon = load_coupon_by_code(&mut tx, &code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.clone()))?;
        check_coupon(&mut tx, &cart, &coupon).await?;

        set_coupon(&mut tx, &cart.id, Some(&coupon.id)).await?;
        tx.commit().await?;

        info!(cart_id = %cart.id, code = %code, "Coupon applied");
        cart.apply_coupon(coupon);
        Ok(cart)
    }

    /// Detaches the applied coupon, if any.
    pub async fn remove_coupon(&self, owner: &CartOwner) -> DbResult<Cart> {
        validate_owner(owner)?;

        let mut tx = self.pool.begin().await?;
        let mut cart = load_or_create(&mut tx, owner).await?;
        set_coupon(&mut tx, &cart.id, None).await?;
        tx.commit().await?;

        if let Some(coupon) = cart.remove_coupon() {
            debug!(cart_id = %cart.id, code = %coupon.code, "Coupon removed");
        }
        Ok(cart)
    }

    /// Moves the session's guest cart into the user's cart.
    ///
    /// Lines or a coupon that can't be carried over are logged and skipped;
    /// the merge itself never fails on them.
    pub async fn merge(&self, user_id: &str, session_id: &str) -> DbResult<Cart> {
        let user_owner = CartOwner::User(user_id.to_string());
        let guest_owner = CartOwner::Session(session_id.to_string());
        validate_owner(&user_owner)?;
        validate_owner(&guest_owner)?;

        let mut tx = self.pool.begin().await?;

        let Some(mut guest) = load_cart(&mut tx, &guest_owner).await? else {
            let cart = load_or_create(&mut tx, &user_owner).await?;
            tx.commit().await?;
            return Ok(cart);
        };

        let mut cart = load_or_create(&mut tx, &user_owner).await?;
        let had_coupon = cart.coupon.is_some();
        let moved_lines = guest.lines.len();

        for (line, err) in cart.merge_from(&mut guest) {
            warn!(
                user_id = %user_id,
                product_id = %line.product_id,
                quantity = line.quantity,
                error = %err,
                "Guest cart line not merged"
            );
        }

        // An adopted guest coupon must still hold for the merged cart
        if !had_coupon {
            if let Some(coupon) = cart.coupon.clone() {
                if let Err(err) = check_coupon(&mut tx, &cart, &coupon).await {
                    warn!(user_id = %user_id, code = %coupon.code, error = %err, "Guest coupon not carried over");
                    cart.remove_coupon();
                }
            }
        }

        clear_cart(&mut tx, &guest.id).await?;
        for line in &cart.lines {
            save_line(&mut tx, &cart.id, line).await?;
        }
        set_coupon(&mut tx, &cart.id, cart.coupon.as_ref().map(|c| c.id.as_str())).await?;

        let cart = load_or_create(&mut tx, &user_owner).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            cart_id = %cart.id,
            moved_lines,
            "Guest cart merged"
        );
        Ok(cart)
    }

    /// Prices the owner's cart. Read-only: an owner without a cart gets the
    /// empty-cart summary and no cart row is written.
    pub async fn summary(&self, owner: &CartOwner, pricing: &PricingConfig) -> DbResult<CartSummary> {
        validate_owner(owner)?;
        let mut conn = self.pool.acquire().await?;

        Ok(match load_cart(&mut conn, owner).await? {
            Some(cart) => cart.summary(pricing),
            None => pricing.compute_summary(&[], None),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::coupon::tests::{fixed, percentage};
    use crate::repository::product::tests::lokum;
    use lokum_core::{Product, ProductStatus};

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = lokum("GUL", 12_000, 10);
        db.products().insert(&product).await.unwrap();
        (db, product)
    }

    fn guest() -> CartOwner {
        CartOwner::Session("sess-abc".to_string())
    }

    fn user() -> CartOwner {
        CartOwner::User("user-1".to_string())
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let (db, _) = setup().await;
        let first = db.carts().get_or_create(&guest()).await.unwrap();
        let second = db.carts().get_or_create(&guest()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.is_empty());

        let other = db.carts().get_or_create(&user()).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn test_invalid_owner() {
        let (db, _) = setup().await;
        let err = db
            .carts()
            .get_or_create(&CartOwner::Session(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_merges_and_prices_variants() {
        let (db, product) = setup().await;
        let carts = db.carts();

        carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        let cart = carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
        assert_eq!(cart.lines[0].unit_price.cents(), 12_000);

        let cart = carts
            .add_item(&guest(), &product.id, Some(WeightVariant::G500), 1)
            .await
            .unwrap();
        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.lines[1].unit_price.cents(), 24_000);
        assert_eq!(cart.subtotal().cents(), 48_000);
    }

    #[tokio::test]
    async fn test_add_rejections() {
        let (db, product) = setup().await;
        let carts = db.carts();

        let err = carts.add_item(&guest(), "missing", None, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductNotFound(_))));

        let err = carts.add_item(&guest(), &product.id, None, 11).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        let err = carts
            .add_item(&guest(), &product.id, Some(WeightVariant::G250), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::VariantNotFound { .. })));

        let mut hidden = lokum("GIZLI", 1_000, 5);
        hidden.status = ProductStatus::Inactive;
        db.products().insert(&hidden).await.unwrap();
        let err = carts.add_item(&guest(), &hidden.id, None, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::ProductUnavailable(_))));

        // nothing was written
        assert!(carts.get_or_create(&guest()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_price_change_reaches_cart() {
        let (db, product) = setup().await;
        db.carts().add_item(&guest(), &product.id, None, 1).await.unwrap();

        sqlx::query("UPDATE products SET discounted_price_cents = 9000 WHERE id = ?1")
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let cart = db.carts().get_or_create(&guest()).await.unwrap();
        assert_eq!(cart.lines[0].unit_price.cents(), 9_000);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let (db, product) = setup().await;
        let carts = db.carts();
        let cart = carts.add_item(&guest(), &product.id, None, 2).await.unwrap();
        let line_id = cart.lines[0].id.clone();

        let cart = carts.update_item(&guest(), &line_id, 5).await.unwrap();
        assert_eq!(cart.lines[0].quantity, 5);

        let err = carts.update_item(&guest(), &line_id, 50).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::InsufficientStock { .. })));

        let cart = carts.update_item(&guest(), &line_id, 0).await.unwrap();
        assert!(cart.is_empty());

        let cart = carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        let line_id = cart.lines[0].id.clone();
        let cart = carts.remove_item(&guest(), &line_id).await.unwrap();
        assert!(cart.is_empty());

        let err = carts.remove_item(&guest(), &line_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::CartItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_apply_coupon_and_summary() {
        let (db, product) = setup().await;
        db.coupons().insert(&fixed("SEKER20", 2_000)).await.unwrap();
        let carts = db.carts();

        carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        let cart = carts.apply_coupon(&guest(), "seker20").await.unwrap();
        assert_eq!(cart.coupon.as_ref().map(|c| c.code.as_str()), Some("SEKER20"));

        let summary = carts.summary(&guest(), &PricingConfig::default()).await.unwrap();
        assert_eq!(summary.subtotal.cents(), 12_000);
        assert_eq!(summary.discount.cents(), 2_000);
        assert_eq!(summary.tax.cents(), 960);
        assert_eq!(summary.shipping.cents(), 3_000);
        assert_eq!(summary.total.cents(), 13_960);

        let cart = carts.remove_coupon(&guest()).await.unwrap();
        assert!(cart.coupon.is_none());
        let summary = carts.summary(&guest(), &PricingConfig::default()).await.unwrap();
        assert_eq!(summary.discount, Money::zero());
    }

    #[tokio::test]
    async fn test_apply_coupon_rejections() {
        let (db, product) = setup().await;
        let carts = db.carts();
        carts.add_item(&user(), &product.id, None, 1).await.unwrap();

        let err = carts.apply_coupon(&user(), "YOK").await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Coupon(CouponError::NotFound(_)))
        ));

        let mut minimum = fixed("MIN500", 1_000);
        minimum.min_amount = Some(Money::from_cents(50_000));
        db.coupons().insert(&minimum).await.unwrap();
        let err = carts.apply_coupon(&user(), "MIN500").await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Coupon(CouponError::BelowMinimum { .. }))
        ));

        let mut once = fixed("TEKSEFER", 1_000);
        once.per_user_limit = Some(1);
        let once = db.coupons().insert(&once).await.unwrap();
        db.coupons().record_usage(&once.id, Some("user-1"), None).await.unwrap();
        let err = carts.apply_coupon(&user(), "TEKSEFER").await.unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Coupon(CouponError::PerUserLimitReached))
        ));

        // a guest is not subject to the per-user limit
        carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        assert!(carts.apply_coupon(&guest(), "TEKSEFER").await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_drops_coupon() {
        let (db, product) = setup().await;
        db.coupons().insert(&percentage("YUZDE10", 10, None)).await.unwrap();
        let carts = db.carts();

        carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        carts.apply_coupon(&guest(), "YUZDE10").await.unwrap();

        let cart = carts.clear(&guest()).await.unwrap();
        assert!(cart.is_empty());
        assert!(cart.coupon.is_none());

        let reloaded = carts.get_or_create(&guest()).await.unwrap();
        assert!(reloaded.is_empty());
        assert!(reloaded.coupon.is_none());
    }

    #[tokio::test]
    async fn test_merge_guest_into_user() {
        let (db, product) = setup().await;
        let other = lokum("HELVA", 5_000, 10);
        db.products().insert(&other).await.unwrap();
        db.coupons().insert(&fixed("MISAFIR", 1_000)).await.unwrap();
        db.coupons().insert(&fixed("UYE", 500)).await.unwrap();
        let carts = db.carts();

        carts.add_item(&guest(), &product.id, None, 2).await.unwrap();
        carts.add_item(&guest(), &other.id, None, 1).await.unwrap();
        carts.apply_coupon(&guest(), "MISAFIR").await.unwrap();

        carts.add_item(&user(), &product.id, None, 1).await.unwrap();
        carts.apply_coupon(&user(), "UYE").await.unwrap();

        let merged = carts.merge("user-1", "sess-abc").await.unwrap();
        assert_eq!(merged.lines.len(), 2);
        assert_eq!(merged.item_count(), 4);
        assert_eq!(merged.coupon.as_ref().map(|c| c.code.as_str()), Some("UYE"));

        let guest_cart = carts.get_or_create(&guest()).await.unwrap();
        assert!(guest_cart.is_empty());
        assert!(guest_cart.coupon.is_none());
    }

    #[tokio::test]
    async fn test_merge_adopts_guest_coupon() {
        let (db, product) = setup().await;
        db.coupons().insert(&fixed("MISAFIR", 1_000)).await.unwrap();
        let carts = db.carts();

        carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        carts.apply_coupon(&guest(), "MISAFIR").await.unwrap();

        let merged = carts.merge("user-1", "sess-abc").await.unwrap();
        assert_eq!(merged.coupon.map(|c| c.code), Some("MISAFIR".to_string()));
    }

    #[tokio::test]
    async fn test_merge_drops_guest_coupon_user_already_used() {
        let (db, product) = setup().await;
        let mut once = fixed("TEKSEFER", 1_000);
        once.per_user_limit = Some(1);
        let once = db.coupons().insert(&once).await.unwrap();
        db.coupons().record_usage(&once.id, Some("user-1"), None).await.unwrap();
        let carts = db.carts();

        carts.add_item(&guest(), &product.id, None, 1).await.unwrap();
        carts.apply_coupon(&guest(), "TEKSEFER").await.unwrap();

        let merged = carts.merge("user-1", "sess-abc").await.unwrap();
        assert_eq!(merged.item_count(), 1);
        assert!(merged.coupon.is_none());
    }

    #[tokio::test]
    async fn test_merge_without_guest_cart() {
        let (db, _) = setup().await;
        let merged = db.carts().merge("user-1", "sess-none").await.unwrap();
        assert!(merged.is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_summary() {
        let (db, _) = setup().await;
        let summary = db.carts().summary(&guest(), &PricingConfig::default()).await.unwrap();
        assert_eq!(summary, CartSummary::default());
    }

    async fn cart_rows(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM carts")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_summary_does_not_create_cart() {
        let (db, _) = setup().await;

        db.carts().summary(&guest(), &PricingConfig::default()).await.unwrap();
        assert_eq!(cart_rows(&db).await, 0);

        let charged = PricingConfig {
            charge_shipping_on_empty_cart: true,
            ..PricingConfig::default()
        };
        let summary = db.carts().summary(&user(), &charged).await.unwrap();
        assert_eq!(summary.shipping.cents(), 3_000);
        assert_eq!(summary.total.cents(), 3_000);
        assert_eq!(cart_rows(&db).await, 0);
    }
}
