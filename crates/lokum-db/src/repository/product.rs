//! # Product Repository
//!
//! Catalog rows and stock bookkeeping.
//!
//! ## Stock Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock            ← purchases without a weight variant         │
//! │  product_variants.stock    ← one row per offered weight (250g/500g/1kg) │
//! │                                                                         │
//! │  adjust_stock(id, variant, delta)                                       │
//! │     delta < 0 : order placed     (refused if it would go below zero)    │
//! │     delta > 0 : order cancelled  (restock)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{parse_variant, variant_label};
use lokum_core::order::StockMovement;
use lokum_core::validation::{validate_price_cents, validate_product_name, validate_sku};
use lokum_core::{CoreError, Money, Product, ProductStatus, VariantStock, WeightVariant};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    price_cents: i64,
    discounted_price_cents: Option<i64>,
    base_weight: Option<String>,
    stock: i64,
    status: ProductStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    variant: String,
    stock: i64,
}

impl ProductRow {
    fn into_product(self, variants: Vec<VariantStock>) -> DbResult<Product> {
        Ok(Product {
            id: self.id,
            sku: self.sku,
            name: self.name,
            price: Money::from_cents(self.price_cents),
            discounted_price: self.discounted_price_cents.map(Money::from_cents),
            base_weight: parse_variant(self.base_weight)?,
            stock: self.stock,
            variants,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = r#"
    id, sku, name, price_cents, discounted_price_cents, base_weight,
    stock, status, created_at, updated_at
"#;

// =============================================================================
// Connection-Level Helpers
// =============================================================================

async fn load_variants(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Vec<VariantStock>> {
    let rows = sqlx::query_as::<_, VariantRow>(
        r#"
        SELECT variant, stock
        FROM product_variants
        WHERE product_id = ?1
        ORDER BY CASE variant WHEN '250g' THEN 1 WHEN '500g' THEN 2 ELSE 3 END
        "#,
    )
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| {
            let variant = row
                .variant
                .parse::<WeightVariant>()
                .map_err(|e| DbError::corrupt("product_variants.variant", e))?;
            Ok(VariantStock {
                variant,
                stock: row.stock,
            })
        })
        .collect()
}

/// Loads a product with its variant stocks.
pub(crate) async fn load_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let variants = load_variants(conn, &row.id).await?;
            Ok(Some(row.into_product(variants)?))
        }
        None => Ok(None),
    }
}

/// Applies a signed stock change and returns the new stock level.
///
/// Refuses to take stock below zero.
pub(crate) async fn apply_stock_movement(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<i64> {
    let now = Utc::now();

    let updated: Option<i64> = match movement.variant {
        None => {
            sqlx::query_scalar(
                r#"
                UPDATE products
                SET stock = stock + ?2, updated_at = ?3
                WHERE id = ?1 AND stock + ?2 >= 0
                RETURNING stock
                "#,
            )
            .bind(&movement.product_id)
            .bind(movement.delta)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await?
        }
        Some(variant) => {
            let stock: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE product_variants
                SET stock = stock + ?3
                WHERE product_id = ?1 AND variant = ?2 AND stock + ?3 >= 0
                RETURNING stock
                "#,
            )
            .bind(&movement.product_id)
            .bind(variant.as_str())
            .bind(movement.delta)
            .fetch_optional(&mut *conn)
            .await?;

            if stock.is_some() {
                sqlx::query("UPDATE products SET updated_at = ?2 WHERE id = ?1")
                    .bind(&movement.product_id)
                    .bind(now)
                    .execute(&mut *conn)
                    .await?;
            }
            stock
        }
    };

    if let Some(stock) = updated {
        debug!(
            product_id = %movement.product_id,
            variant = ?variant_label(movement.variant),
            delta = movement.delta,
            stock,
            "Stock adjusted"
        );
        return Ok(stock);
    }

    // Nothing updated: either the row is missing or stock would go negative
    let product = load_product(conn, &movement.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(movement.product_id.clone()))?;
    let available = product.available_stock(movement.variant)?;

    Err(CoreError::InsufficientStock {
        product: product.name,
        available,
        requested: -movement.delta,
    }
    .into())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product and its variant stocks.
    ///
    /// ## Errors
    /// - `Core(Validation)` for a bad SKU, name or price
    /// - `UniqueViolation` if the SKU is taken
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_price_cents(product.price.cents())?;
        if let Some(discounted) = product.discounted_price {
            validate_price_cents(discounted.cents())?;
        }

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, price_cents, discounted_price_cents, base_weight,
                stock, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(product.sku.trim())
        .bind(product.name.trim())
        .bind(product.price.cents())
        .bind(product.discounted_price.map(|m| m.cents()))
        .bind(variant_label(product.base_weight))
        .bind(product.stock)
        .bind(product.status)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("sku") => {
                DbError::duplicate("sku", product.sku.clone())
            }
            other => other,
        })?;

        for vs in &product.variants {
            sqlx::query(
                "INSERT INTO product_variants (product_id, variant, stock) VALUES (?1, ?2, ?3)",
            )
            .bind(&product.id)
            .bind(vs.variant.as_str())
            .bind(vs.stock)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %product.id, sku = %product.sku, "Product created");

        Ok(product.clone())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        load_product(&mut conn, id).await
    }

    /// Lists active products, newest first.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        self.list_where("status = 'active'", limit).await
    }

    /// Active products on sale (discounted price below list price), newest first.
    pub async fn list_discounted(&self, limit: u32) -> DbResult<Vec<Product>> {
        self.list_where(
            "status = 'active' AND discounted_price_cents IS NOT NULL \
             AND discounted_price_cents < price_cents",
            limit,
        )
        .await
    }

    async fn list_where(&self, condition: &str, limit: u32) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {condition} ORDER BY created_at DESC, name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            let variants = load_variants(&mut conn, &row.id).await?;
            products.push(row.into_product(variants)?);
        }

        Ok(products)
    }

    /// Rewrites a product's catalog fields: SKU, name, prices, base weight
    /// and status. Stock is left alone; use `set_stock`/`set_variant_stock`.
    ///
    /// Open carts pick up the new price on their next load.
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        validate_sku(&product.sku)?;
        validate_product_name(&product.name)?;
        validate_price_cents(product.price.cents())?;
        if let Some(discounted) = product.discounted_price {
            validate_price_cents(discounted.cents())?;
        }

        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET sku = ?2, name = ?3, price_cents = ?4, discounted_price_cents = ?5,
                base_weight = ?6, status = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.sku.trim())
        .bind(product.name.trim())
        .bind(product.price.cents())
        .bind(product.discounted_price.map(|m| m.cents()))
        .bind(variant_label(product.base_weight))
        .bind(product.status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("sku") => {
                DbError::duplicate("sku", product.sku.clone())
            }
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        info!(id = %product.id, sku = %product.sku, "Product updated");

        load_product(&mut conn, &product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Shows or hides a product. Inactive products stay in carts but can't
    /// be added again or checked out.
    pub async fn update_status(&self, id: &str, status: ProductStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, status = ?status, "Product status changed");
        Ok(())
    }

    /// Sets the stock for purchases without a weight variant.
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<()> {
        if stock < 0 {
            return Err(lokum_core::ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, stock, "Stock set");
        Ok(())
    }

    /// Sets (or creates) the stock row for one weight variant.
    pub async fn set_variant_stock(&self, id: &str, variant: WeightVariant, stock: i64) -> DbResult<()> {
        if stock < 0 {
            return Err(lokum_core::ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let mut conn = self.pool.acquire().await?;
        if load_product(&mut conn, id).await?.is_none() {
            return Err(DbError::not_found("Product", id));
        }

        sqlx::query(
            r#"
            INSERT INTO product_variants (product_id, variant, stock)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (product_id, variant) DO UPDATE SET stock = excluded.stock
            "#,
        )
        .bind(id)
        .bind(variant.as_str())
        .bind(stock)
        .execute(&mut *conn)
        .await?;

        debug!(id = %id, variant = %variant, stock, "Variant stock set");
        Ok(())
    }

    /// Adjusts stock by a signed delta and returns the new level.
    ///
    /// ## Arguments
    /// * `variant` - `None` for the product's own stock
    /// * `delta` - negative for sales, positive for restocking
    pub async fn adjust_stock(&self, id: &str, variant: Option<WeightVariant>, delta: i64) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        apply_stock_movement(
            &mut conn,
            &StockMovement {
                product_id: id.to_string(),
                variant,
                delta,
            },
        )
        .await
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
