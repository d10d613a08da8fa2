//! # Order Repository
//!
//! Checkout and the order lifecycle.
//!
//! ## Order Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  place_order(owner, checkout, pricing)       ONE transaction            │
//! │                                                                         │
//! │  1. checkout.validate()                                                 │
//! │  2. cart empty?                      → EmptyCart                        │
//! │  3. every line: product active, stock (variant stock when chosen)       │
//! │  4. applied coupon still eligible?   → Coupon(..)                       │
//! │  5. summary = pricing.compute_summary(lines, coupon)                    │
//! │  6. INSERT orders        (unique YYMMnnnnn number)                      │
//! │  7. INSERT order_items   (snapshot of each line)                        │
//! │  8. coupon usage_count + 1, coupon_usages row                           │
//! │  9. status history "Order created"                                      │
//! │ 10. stock decremented per item                                          │
//! │ 11. cart cleared                                                        │
//! │                                                                         │
//! │  Any failure rolls the whole thing back.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Lifecycle
//! ```text
//! cash_on_delivery ──► pending ─────────────┐
//! credit_card ─┐                            ├──► processing ──► shipped ──► delivered
//! bank_transfer┴──► awaiting_payment ──paid─┘
//!
//! pending | awaiting_payment | processing ──cancel──► cancelled (restocked)
//! ```
//!
//! ## Numbers
//! Order numbers are `YYMM` plus a random five digit suffix, redrawn on
//! collision. Invoice numbers share the `YYMM` prefix but count up within
//! the month (`250400001`, `250400002`, …).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::cart::{check_coupon, clear_cart, load_cart};
use crate::repository::coupon::insert_usage;
use crate::repository::product::{apply_stock_movement, load_product};
use crate::repository::{parse_variant, variant_label};
use lokum_core::order::{
    ensure_cancellable, generate_order_number, next_invoice_number, number_prefix,
    payment_transition, Address, Checkout, StatusHistoryEntry,
};
use lokum_core::validation::validate_order_note;
use lokum_core::{
    CartOwner, CoreError, Invoice, Money, Order, OrderItem, OrderNote, OrderStatus,
    PaymentMethod, PaymentStatus, PricingConfig, DEFAULT_CURRENCY,
};

/// Attempts at drawing an unused order number before giving up.
///
/// Each `YYMM` prefix has 90 000 suffixes. With `n` orders already placed in
/// the month a draw collides with probability `n / 90 000`, so even at
/// 60 000 orders a month all 64 draws colliding is below one in 10^11.
/// Beyond that the month is effectively full and checkout fails with
/// `Internal`.
const ORDER_NUMBER_ATTEMPTS: usize = 64;

/// Largest page `list_for_user` / `list_all` return.
const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Row Types
// =============================================================================

const ORDER_COLUMNS: &str = "id, order_number, user_id, session_id, email, phone, \
    billing_address, shipping_address, payment_method, payment_status, transaction_id, \
    coupon_code, subtotal_cents, discount_cents, tax_cents, shipping_cents, total_cents, \
    status, currency, notes, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    user_id: Option<String>,
    session_id: Option<String>,
    email: String,
    phone: String,
    billing_address: String,
    shipping_address: String,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    transaction_id: Option<String>,
    coupon_code: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    tax_cents: i64,
    shipping_cents: i64,
    total_cents: i64,
    status: OrderStatus,
    currency: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let billing_address: Address = serde_json::from_str(&row.billing_address)
            .map_err(|e| DbError::corrupt("billing_address", e))?;
        let shipping_address: Address = serde_json::from_str(&row.shipping_address)
            .map_err(|e| DbError::corrupt("shipping_address", e))?;

        Ok(Order {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            session_id: row.session_id,
            email: row.email,
            phone: row.phone,
            billing_address,
            shipping_address,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            transaction_id: row.transaction_id,
            coupon_code: row.coupon_code,
            subtotal: Money::from_cents(row.subtotal_cents),
            discount: Money::from_cents(row.discount_cents),
            tax: Money::from_cents(row.tax_cents),
            shipping: Money::from_cents(row.shipping_cents),
            total: Money::from_cents(row.total_cents),
            status: row.status,
            currency: row.currency,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    name: String,
    variant: Option<String>,
    quantity: i64,
    unit_price_cents: i64,
    total_cents: i64,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = DbError;

    fn try_from(row: OrderItemRow) -> DbResult<Self> {
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name: row.name,
            variant: parse_variant(row.variant)?,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            total: Money::from_cents(row.total_cents),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    order_id: String,
    status: OrderStatus,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for StatusHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        StatusHistoryEntry {
            id: row.id,
            order_id: row.order_id,
            status: row.status,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: String,
    order_id: String,
    user_id: Option<String>,
    note: String,
    is_public: bool,
    created_at: DateTime<Utc>,
}

impl From<NoteRow> for OrderNote {
    fn from(row: NoteRow) -> Self {
        OrderNote {
            id: row.id,
            order_id: row.order_id,
            user_id: row.user_id,
            note: row.note,
            is_public: row.is_public,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    order_id: String,
    invoice_number: String,
    amount_cents: i64,
    tax_cents: i64,
    currency: String,
    billing_name: String,
    billing_address: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> DbResult<Self> {
        let billing_address: Address = serde_json::from_str(&row.billing_address)
            .map_err(|e| DbError::corrupt("invoices.billing_address", e))?;

        Ok(Invoice {
            id: row.id,
            order_id: row.order_id,
            invoice_number: row.invoice_number,
            amount: Money::from_cents(row.amount_cents),
            tax: Money::from_cents(row.tax_cents),
            currency: row.currency,
            billing_name: row.billing_name,
            billing_address,
            created_at: row.created_at,
        })
    }
}

/// Which orders `list_all` returns. Every field left `None` matches all.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<String>,
    pub status: Option<OrderStatus>,
    /// Substring of the order number, email, phone or billing name.
    pub search: Option<String>,
    /// Placed at or after.
    pub created_from: Option<DateTime<Utc>>,
    /// Placed at or before.
    pub created_to: Option<DateTime<Utc>>,
}

/// One page of a customer's order history.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    /// Matching orders across all pages.
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

async fn load_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Order::try_from).transpose()
}

async fn require_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    load_order(conn, id)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(id.to_string()).into())
}

async fn load_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT id, order_id, product_id, name, variant, quantity, unit_price_cents, total_cents
        FROM order_items
        WHERE order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(OrderItem::try_from).collect()
}

async fn insert_history(
    conn: &mut SqliteConnection,
    order_id: &str,
    status: OrderStatus,
    note: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_status_history (id, order_id, status, note, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(order_id)
    .bind(status)
    .bind(note)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn set_status(conn: &mut SqliteConnection, order_id: &str, status: OrderStatus) -> DbResult<()> {
    sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(order_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Draws order numbers until one is unused.
async fn unique_order_number(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<String> {
    draw_order_number(conn, now, || Uuid::new_v4().as_u128()).await
}

async fn draw_order_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
    mut entropy: impl FnMut() -> u128,
) -> DbResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number(now, entropy());
        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE order_number = ?1")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await?;

        if taken == 0 {
            return Ok(candidate);
        }
        debug!(order_number = %candidate, "Order number taken, drawing again");
    }

    Err(DbError::Internal(format!(
        "no free order number for {} after {ORDER_NUMBER_ATTEMPTS} attempts",
        now.format("%y%m")
    )))
}

async fn load_invoice(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Option<Invoice>> {
    let row = sqlx::query_as::<_, InvoiceRow>(
        r#"
        SELECT id, order_id, invoice_number, amount_cents, tax_cents, currency,
               billing_name, billing_address, created_at
        FROM invoices
        WHERE order_id = ?1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Invoice::try_from).transpose()
}

/// Issues the order's invoice, or returns the one already issued.
///
/// Must run inside a transaction. The order row is written first so the
/// transaction holds SQLite's write lock before it reads the month's last
/// invoice number; two concurrent calls can't draw the same sequence.
async fn issue_invoice(
    conn: &mut SqliteConnection,
    order_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Invoice> {
    let locked = sqlx::query("UPDATE orders SET updated_at = updated_at WHERE id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;
    if locked.rows_affected() == 0 {
        return Err(CoreError::OrderNotFound(order_id.to_string()).into());
    }

    if let Some(existing) = load_invoice(conn, order_id).await? {
        return Ok(existing);
    }

    let order = require_order(conn, order_id).await?;

    // longest first, so 2504100000 sorts after 250499999
    let last: Option<String> = sqlx::query_scalar(
        r#"
        SELECT invoice_number
        FROM invoices
        WHERE invoice_number LIKE ?1
        ORDER BY length(invoice_number) DESC, invoice_number DESC
        LIMIT 1
        "#,
    )
    .bind(format!("{}%", number_prefix(now)))
    .fetch_optional(&mut *conn)
    .await?;

    let invoice = Invoice::for_order(&order, next_invoice_number(now, last.as_deref()), now);

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, order_id, invoice_number, amount_cents, tax_cents, currency,
            billing_name, billing_address, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.order_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.amount.cents())
    .bind(invoice.tax.cents())
    .bind(&invoice.currency)
    .bind(&invoice.billing_name)
    .bind(serde_json::to_string(&invoice.billing_address)?)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(invoice)
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(&format!(
        "INSERT INTO orders ({ORDER_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)"
    ))
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(&order.session_id)
    .bind(&order.email)
    .bind(&order.phone)
    .bind(serde_json::to_string(&order.billing_address)?)
    .bind(serde_json::to_string(&order.shipping_address)?)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(&order.transaction_id)
    .bind(&order.coupon_code)
    .bind(order.subtotal.cents())
    .bind(order.discount.cents())
    .bind(order.tax.cents())
    .bind(order.shipping.cents())
    .bind(order.total.cents())
    .bind(order.status)
    .bind(&order.currency)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_item(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, name, variant, quantity, unit_price_cents, total_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.name)
    .bind(variant_label(item.variant))
    .bind(item.quantity)
    .bind(item.unit_price.cents())
    .bind(item.total.cents())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Turns the owner's cart into an order.
    ///
    /// ## Errors
    /// - `Core(Validation(..))` for a bad checkout form
    /// - `Core(EmptyCart)`
    /// - `Core(ProductNotFound | ProductUnavailable | VariantNotFound | InsufficientStock)`
    /// - `Core(Coupon(..))` when the applied coupon is no longer eligible
    pub async fn place_order(
        &self,
        owner: &CartOwner,
        checkout: &Checkout,
        pricing: &PricingConfig,
    ) -> DbResult<Order> {
        checkout.validate()?;

        let mut tx = self.pool.begin().await?;

        let cart = match load_cart(&mut tx, owner).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(CoreError::EmptyCart.into()),
        };

        for line in &cart.lines {
            let product = load_product(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            product.ensure_can_sell(line.variant, line.quantity)?;
        }

        if let Some(coupon) = &cart.coupon {
            check_coupon(&mut tx, &cart, coupon).await?;
        }

        let summary = cart.summary(pricing);
        let now = Utc::now();
        let order_id = Uuid::new_v4().to_string();

        let order = Order {
            id: order_id.clone(),
            order_number: unique_order_number(&mut tx, now).await?,
            user_id: owner.user_id().map(str::to_string),
            session_id: owner.session_id().map(str::to_string),
            email: checkout.email.trim().to_string(),
            phone: checkout.phone.trim().to_string(),
            billing_address: checkout.billing.clone(),
            shipping_address: checkout.shipping_address().clone(),
            payment_method: checkout.payment_method,
            payment_status: PaymentStatus::initial_for(checkout.payment_method),
            transaction_id: None,
            coupon_code: cart.coupon.as_ref().map(|c| c.code.clone()),
            subtotal: summary.subtotal,
            discount: summary.discount,
            tax: summary.tax,
            shipping: summary.shipping,
            total: summary.total,
            status: OrderStatus::initial_for(checkout.payment_method),
            currency: DEFAULT_CURRENCY.to_string(),
            notes: checkout.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        insert_order(&mut tx, &order).await?;

        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                variant: line.variant,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total: line.line_total(),
            })
            .collect();
        for item in &items {
            insert_item(&mut tx, item).await?;
        }

        if let Some(coupon) = &cart.coupon {
            insert_usage(&mut tx, &coupon.id, owner.user_id(), Some(&order_id)).await?;
        }

        insert_history(&mut tx, &order_id, order.status, Some("Order created")).await?;

        for item in &items {
            apply_stock_movement(&mut tx, &item.stock_movement(false)).await?;
        }

        clear_cart(&mut tx, &cart.id).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            items = items.len(),
            total = %order.total,
            status = %order.status,
            "Order placed"
        );
        Ok(order)
    }

    /// Cancels an order that hasn't shipped and puts its items back in stock.
    pub async fn cancel(&self, order_id: &str, reason: Option<&str>) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = require_order(&mut tx, order_id).await?;
        ensure_cancellable(order_id, order.status)?;

        set_status(&mut tx, order_id, OrderStatus::Cancelled).await?;
        insert_history(
            &mut tx,
            order_id,
            OrderStatus::Cancelled,
            Some(reason.unwrap_or("Order cancelled")),
        )
        .await?;

        for item in load_items(&mut tx, order_id).await? {
            apply_stock_movement(&mut tx, &item.stock_movement(true)).await?;
        }

        let order = require_order(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(order_id = %order_id, order_number = %order.order_number, reason = ?reason, "Order cancelled");
        Ok(order)
    }

    /// Moves an order to any status and records it in the history.
    pub async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        note: Option<&str>,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let previous = require_order(&mut tx, order_id).await?.status;
        set_status(&mut tx, order_id, status).await?;
        insert_history(&mut tx, order_id, status, note).await?;

        let order = require_order(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(order_id = %order_id, from = %previous, to = %status, "Order status updated");
        Ok(order)
    }

    /// Records a payment result. A payment confirmed while the order is
    /// awaiting it moves the order to `Processing`.
    pub async fn update_payment_status(
        &self,
        order_id: &str,
        payment_status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = require_order(&mut tx, order_id).await?;

        sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = ?2,
                transaction_id = COALESCE(?3, transaction_id),
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(payment_status)
        .bind(transaction_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if let Some(next) = payment_transition(order.status, payment_status) {
            set_status(&mut tx, order_id, next).await?;
            insert_history(&mut tx, order_id, next, Some("Payment confirmed")).await?;
        } else if payment_status == PaymentStatus::Failed {
            warn!(order_id = %order_id, status = %order.status, "Payment failed");
        }

        let order = require_order(&mut tx, order_id).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            payment_status = ?payment_status,
            status = %order.status,
            "Payment status updated"
        );
        Ok(order)
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, id).await
    }

    /// Gets an order by its customer-facing number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1"
        ))
        .bind(order_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// Guest order lookup: the number and the email must both match.
    pub async fn track(&self, order_number: &str, email: &str) -> DbResult<Option<Order>> {
        let order = self.get_by_number(order_number).await?;
        Ok(order.filter(|o| o.email.eq_ignore_ascii_case(email.trim())))
    }

    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let mut conn = self.pool.acquire().await?;
        load_items(&mut conn, order_id).await
    }

    /// Status changes, oldest first.
    pub async fn status_history(&self, order_id: &str) -> DbResult<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, order_id, status, note, created_at
            FROM order_status_history
            WHERE order_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StatusHistoryEntry::from).collect())
    }

    /// A user's orders, newest first. `page` starts at 1.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: u32,
        per_page: u32,
    ) -> DbResult<OrderPage> {
        let filter = OrderFilter {
            user_id: Some(user_id.to_string()),
            status,
            ..OrderFilter::default()
        };
        self.list_all(&filter, page, per_page).await
    }

    /// Orders across all customers matching `filter`, newest first.
    /// `page` starts at 1; `per_page` is clamped to 1..=100.
    pub async fn list_all(&self, filter: &OrderFilter, page: u32, per_page: u32) -> DbResult<OrderPage> {
        const WHERE: &str = "(?1 IS NULL OR user_id = ?1) \
            AND (?2 IS NULL OR status = ?2) \
            AND (?3 IS NULL OR order_number LIKE ?3 OR email LIKE ?3 OR phone LIKE ?3 \
                 OR json_extract(billing_address, '$.first_name') || ' ' || \
                    json_extract(billing_address, '$.last_name') LIKE ?3) \
            AND (?4 IS NULL OR created_at >= ?4) \
            AND (?5 IS NULL OR created_at <= ?5)";

        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(per_page);
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| format!("%{term}%"));

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {WHERE}"))
            .bind(&filter.user_id)
            .bind(filter.status)
            .bind(&search)
            .bind(filter.created_from)
            .bind(filter.created_to)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE {WHERE} \
             ORDER BY created_at DESC, rowid DESC \
             LIMIT ?6 OFFSET ?7"
        ))
        .bind(&filter.user_id)
        .bind(filter.status)
        .bind(&search)
        .bind(filter.created_from)
        .bind(filter.created_to)
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let orders = rows
            .into_iter()
            .map(Order::try_from)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(OrderPage {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Attaches a note to an order. `user_id` is whoever wrote it; public
    /// notes are shown to the customer.
    pub async fn add_note(
        &self,
        order_id: &str,
        note: &str,
        user_id: Option<&str>,
        is_public: bool,
    ) -> DbResult<OrderNote> {
        let note = validate_order_note(note)?;
        let mut conn = self.pool.acquire().await?;
        require_order(&mut conn, order_id).await?;

        let entry = OrderNote {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            user_id: user_id.map(str::to_string),
            note,
            is_public,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO order_notes (id, order_id, user_id, note, is_public, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.order_id)
        .bind(&entry.user_id)
        .bind(&entry.note)
        .bind(entry.is_public)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        debug!(order_id = %order_id, is_public, "Order note added");
        Ok(entry)
    }

    /// An order's notes, newest first.
    ///
    /// `visibility`: `Some(true)` only public notes (the customer's view),
    /// `Some(false)` only internal ones, `None` all of them.
    pub async fn notes(&self, order_id: &str, visibility: Option<bool>) -> DbResult<Vec<OrderNote>> {
        let rows = sqlx::query_as::<_, NoteRow>(
            r#"
            SELECT id, order_id, user_id, note, is_public, created_at
            FROM order_notes
            WHERE order_id = ?1 AND (?2 IS NULL OR is_public = ?2)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(order_id)
        .bind(visibility)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderNote::from).collect())
    }

    /// Issues the order's invoice. Calling again returns the same invoice.
    ///
    /// Invoice numbers run sequentially within a month: `250400001`,
    /// `250400002`, … and restart at `00001` on the first of the next.
    pub async fn generate_invoice(&self, order_id: &str) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        let invoice = issue_invoice(&mut tx, order_id, Utc::now()).await?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            invoice_number = %invoice.invoice_number,
            amount = %invoice.amount,
            "Invoice issued"
        );
        Ok(invoice)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::coupon::tests::fixed;
    use crate::repository::product::tests::lokum;
    use lokum_core::{CouponError, Product, WeightVariant};

    fn address(city: &str) -> Address {
        Address {
            first_name: "Ayşe".to_string(),
            last_name: "Yılmaz".to_string(),
            address: "Bağdat Cd. 12".to_string(),
            city: city.to_string(),
            state: None,
            postcode: Some("34710".to_string()),
            country: "TR".to_string(),
        }
    }

    fn checkout(method: PaymentMethod) -> Checkout {
        Checkout {
            email: "ayse@example.com".to_string(),
            phone: "+905551112233".to_string(),
            billing: address("İstanbul"),
            shipping: None,
            payment_method: method,
            notes: None,
        }
    }

    fn user() -> CartOwner {
        CartOwner::User("user-1".to_string())
    }

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = lokum("GUL", 12_000, 10);
        db.products().insert(&product).await.unwrap();
        (db, product)
    }

    #[tokio::test]
    async fn test_place_order() {
        let (db, product) = setup().await;
        db.carts().add_item(&user(), &product.id, None, 2).await.unwrap();

        let order = db
            .orders()
            .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &PricingConfig::default())
            .await
            .unwrap();

        assert_eq!(order.order_number.len(), 9);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.user_id.as_deref(), Some("user-1"));
        assert_eq!(order.shipping_address, order.billing_address);
        assert_eq!(order.currency, "TRY");
        assert_eq!(order.subtotal.cents(), 24_000);
        assert_eq!(order.tax.cents(), 1_920);
        assert_eq!(order.shipping, Money::zero());
        assert_eq!(order.total.cents(), 25_920);
        assert!(order.summary().is_consistent());

        let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.order_number, order.order_number);
        assert_eq!(stored.billing_address, order.billing_address);

        let items = db.orders().items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].total.cents(), 24_000);

        let history = db.orders().status_history(&order.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].note.as_deref(), Some("Order created"));

        let product = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 8);
        assert!(db.carts().get_or_create(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_variant_stock_and_shipping_address() {
        let (db, product) = setup().await;
        db.carts()
            .add_item(&user(), &product.id, Some(WeightVariant::Kg1), 3)
            .await
            .unwrap();

        let mut form = checkout(PaymentMethod::CreditCard);
        form.shipping = Some(address("Ankara"));
        let order = db
            .orders()
            .place_order(&user(), &form, &PricingConfig::default())
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.payment_status, PaymentStatus::Awaiting);
        assert_eq!(order.shipping_address.city, "Ankara");
        assert_eq!(order.billing_address.city, "İstanbul");

        let items = db.orders().items(&order.id).await.unwrap();
        assert_eq!(items[0].variant, Some(WeightVariant::Kg1));
        assert_eq!(items[0].unit_price.cents(), 48_000);

        let product = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        assert_eq!(product.available_stock(Some(WeightVariant::Kg1)).unwrap(), 7);
    }

    #[tokio::test]
    async fn test_place_order_records_coupon_usage() {
        let (db, product) = setup().await;
        let coupon = db.coupons().insert(&fixed("SEKER20", 2_000)).await.unwrap();
        db.carts().add_item(&user(), &product.id, None, 1).await.unwrap();
        db.carts().apply_coupon(&user(), "SEKER20").await.unwrap();

        let order = db
            .orders()
            .place_order(&user(), &checkout(PaymentMethod::BankTransfer), &PricingConfig::default())
            .await
            .unwrap();

        assert_eq!(order.coupon_code.as_deref(), Some("SEKER20"));
        assert_eq!(order.discount.cents(), 2_000);
        assert_eq!(order.total.cents(), 12_000 - 2_000 + 960 + 3_000);

        let coupon = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon.usage_count, 1);
        assert_eq!(db.coupons().user_usage_count(&coupon.id, "user-1").await.unwrap(), 1);

        let cart = db.carts().get_or_create(&user()).await.unwrap();
        assert!(cart.coupon.is_none());
    }

    #[tokio::test]
    async fn test_place_order_rejects_exhausted_coupon() {
        let (db, product) = setup().await;
        let mut limited = fixed("SON1", 1_000);
        limited.usage_limit = Some(1);
        let limited = db.coupons().insert(&limited).await.unwrap();
        db.carts().add_item(&user(), &product.id, None, 1).await.unwrap();
        db.carts().apply_coupon(&user(), "SON1").await.unwrap();

        // someone else redeems the last use meanwhile
        db.coupons().record_usage(&limited.id, None, None).await.unwrap();

        let err = db
            .orders()
            .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &PricingConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Coupon(CouponError::UsageLimitReached))
        ));
        assert!(!db.carts().get_or_create(&user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_rejections() {
        let (db, product) = setup().await;
        let orders = db.orders();
        let pricing = PricingConfig::default();

        let err = orders
            .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &pricing)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::EmptyCart)));

        db.carts().add_item(&user(), &product.id, None, 5).await.unwrap();

        let mut bad = checkout(PaymentMethod::CashOnDelivery);
        bad.billing.city = String::new();
        let err = orders.place_order(&user(), &bad, &pricing).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));

        db.products().set_stock(&product.id, 3).await.unwrap();
        let err = orders
            .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &pricing)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));

        // rolled back: cart intact, stock untouched
        assert_eq!(db.carts().get_or_create(&user()).await.unwrap().item_count(), 5);
        let product = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 3);
    }

    #[tokio::test]
    async fn test_cancel_restocks() {
        let (db, product) = setup().await;
        db.carts().add_item(&user(), &product.id, None, 4).await.unwrap();
        let order = db
            .orders()
            .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &PricingConfig::default())
            .await
            .unwrap();

        let cancelled = db.orders().cancel(&order.id, Some("Changed my mind")).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let product = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);

        let history = db.orders().status_history(&order.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status, OrderStatus::Cancelled);
        assert_eq!(history[1].note.as_deref(), Some("Changed my mind"));

        let err = db.orders().cancel(&order.id, None).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OrderNotCancellable { .. })));
    }

    #[tokio::test]
    async fn test_cannot_cancel_shipped() {
        let (db, product) = setup().await;
        db.carts().add_item(&user(), &product.id, None, 1).await.unwrap();
        let order = db
            .orders()
            .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &PricingConfig::default())
            .await
            .unwrap();

        db.orders()
            .update_status(&order.id, OrderStatus::Shipped, Some("Kargoya verildi"))
            .await
            .unwrap();

        let err = db.orders().cancel(&order.id, None).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OrderNotCancellable { .. })));

        let err = db.orders().cancel("missing", None).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_payment_moves_to_processing() {
        let (db, product) = setup().await;
        db.carts().add_item(&user(), &product.id, None, 1).await.unwrap();
        let order = db
            .orders()
            .place_order(&user(), &checkout(PaymentMethod::CreditCard), &PricingConfig::default())
            .await
            .unwrap();

        let failed = db
            .orders()
            .update_payment_status(&order.id, PaymentStatus::Failed, None)
            .await
            .unwrap();
        assert_eq!(failed.status, OrderStatus::AwaitingPayment);
        assert_eq!(failed.payment_status, PaymentStatus::Failed);

        let paid = db
            .orders()
            .update_payment_status(&order.id, PaymentStatus::Paid, Some("txn-42"))
            .await
            .unwrap();
        assert_eq!(paid.status, OrderStatus::Processing);
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.transaction_id.as_deref(), Some("txn-42"));

        let history = db.orders().status_history(&order.id).await.unwrap();
        assert_eq!(history.last().map(|h| h.status), Some(OrderStatus::Processing));
        assert_eq!(
            history.last().and_then(|h| h.note.as_deref()),
            Some("Payment confirmed")
        );
    }

    #[tokio::test]
    async fn test_track_by_number_and_email() {
        let (db, product) = setup().await;
        let guest = CartOwner::Session("sess-xyz".to_string());
        db.carts().add_item(&guest, &product.id, None, 1).await.unwrap();
        let order = db
            .orders()
            .place_order(&guest, &checkout(PaymentMethod::CashOnDelivery), &PricingConfig::default())
            .await
            .unwrap();
        assert_eq!(order.session_id.as_deref(), Some("sess-xyz"));
        assert!(order.user_id.is_none());

        let found = db
            .orders()
            .track(&order.order_number, "AYSE@example.com")
            .await
            .unwrap();
        assert_eq!(found.map(|o| o.id), Some(order.id.clone()));

        assert!(db
            .orders()
            .track(&order.order_number, "someone@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let (db, product) = setup().await;
        let pricing = PricingConfig::default();
        let mut placed = Vec::new();

        for _ in 0..3 {
            db.carts().add_item(&user(), &product.id, None, 1).await.unwrap();
            let order = db
                .orders()
                .place_order(&user(), &checkout(PaymentMethod::CashOnDelivery), &pricing)
                .await
                .unwrap();
            placed.push(order);
        }
        db.orders().cancel(&placed[0].id, None).await.unwrap();

        let page = db.orders().list_for_user("user-1", None, 1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.orders.len(), 2);
        assert_eq!(page.orders[0].id, placed[2].id);

        let page = db.orders().list_for_user("user-1", None, 2, 2).await.unwrap();
        assert_eq!(page.orders.len(), 1);
        assert_eq!(page.orders[0].id, placed[0].id);

        let cancelled = db
            .orders()
            .list_for_user("user-1", Some(OrderStatus::Cancelled), 1, 10)
            .await
            .unwrap();
        assert_eq!(cancelled.total, 1);
        assert_eq!(cancelled.orders[0].id, placed[0].id);

        let none = db.orders().list_for_user("user-2", None, 0, 0).await.unwrap();
        assert_eq!(none.total, 0);
        assert_eq!((none.page, none.per_page), (1, 1));
    }

    async fn place(db: &Database, owner: &CartOwner, product: &Product) -> Order {
        db.carts().add_item(owner, &product.id, None, 1).await.unwrap();
        db.orders()
            .place_order(owner, &checkout(PaymentMethod::CashOnDelivery), &PricingConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_all_filters() {
        let (db, product) = setup().await;
        let first = place(&db, &user(), &product).await;
        let guest = CartOwner::Session("sess-guest".to_string());
        db.carts().add_item(&guest, &product.id, None, 1).await.unwrap();
        let mut form = checkout(PaymentMethod::CreditCard);
        form.email = "mehmet@example.com".to_string();
        form.billing.first_name = "Mehmet".to_string();
        form.billing.last_name = "Demir".to_string();
        let second = db
            .orders()
            .place_order(&guest, &form, &PricingConfig::default())
            .await
            .unwrap();

        let all = db.orders().list_all(&OrderFilter::default(), 1, 20).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.orders[0].id, second.id);

        let awaiting = OrderFilter {
            status: Some(OrderStatus::AwaitingPayment),
            ..OrderFilter::default()
        };
        let page = db.orders().list_all(&awaiting, 1, 20).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.orders[0].id, second.id);

        for term in ["mehmet@", "Mehmet Demir", &second.order_number[3..]] {
            let filter = OrderFilter {
                search: Some(term.to_string()),
                ..OrderFilter::default()
            };
            let page = db.orders().list_all(&filter, 1, 20).await.unwrap();
            assert!(page.orders.iter().any(|o| o.id == second.id), "search {term}");
            if term != &second.order_number[3..] {
                assert_eq!(page.total, 1, "search {term}");
            }
        }

        let blank = OrderFilter {
            search: Some("   ".to_string()),
            ..OrderFilter::default()
        };
        assert_eq!(db.orders().list_all(&blank, 1, 20).await.unwrap().total, 2);

        let future = OrderFilter {
            created_from: Some(Utc::now() + chrono::Duration::hours(1)),
            ..OrderFilter::default()
        };
        assert_eq!(db.orders().list_all(&future, 1, 20).await.unwrap().total, 0);

        let window = OrderFilter {
            created_from: Some(first.created_at),
            created_to: Some(first.created_at),
            ..OrderFilter::default()
        };
        let page = db.orders().list_all(&window, 1, 20).await.unwrap();
        assert_eq!(page.orders.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), [first.id.as_str()]);
    }

    #[tokio::test]
    async fn test_notes_public_and_private() {
        let (db, product) = setup().await;
        let order = place(&db, &user(), &product).await;
        let orders = db.orders();

        orders
            .add_note(&order.id, "Adres teyit edildi", Some("staff-1"), false)
            .await
            .unwrap();
        let public = orders
            .add_note(&order.id, "  Kargoya verildi  ", Some("staff-1"), true)
            .await
            .unwrap();
        assert_eq!(public.note, "Kargoya verildi");

        let all = orders.notes(&order.id, None).await.unwrap();
        assert_eq!(all.len(), 2);
        // newest first
        assert_eq!(all[0].id, public.id);

        let customer_view = orders.notes(&order.id, Some(true)).await.unwrap();
        assert_eq!(customer_view.len(), 1);
        assert!(customer_view[0].is_public);
        assert_eq!(customer_view[0].user_id.as_deref(), Some("staff-1"));

        let internal = orders.notes(&order.id, Some(false)).await.unwrap();
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].note, "Adres teyit edildi");

        let err = orders.add_note(&order.id, "  ", None, false).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::Validation(_))));
        let err = orders.add_note("missing", "hi", None, false).await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_generate_invoice_is_idempotent() {
        let (db, product) = setup().await;
        let order = place(&db, &user(), &product).await;

        let invoice = db.orders().generate_invoice(&order.id).await.unwrap();
        assert_eq!(invoice.order_id, order.id);
        assert_eq!(invoice.amount, order.total);
        assert_eq!(invoice.tax, order.tax);
        assert_eq!(invoice.currency, "TRY");
        assert_eq!(invoice.billing_name, "Ayşe Yılmaz");
        assert_eq!(invoice.billing_address, order.billing_address);
        assert!(invoice.invoice_number.ends_with("00001"));
        assert_eq!(&invoice.invoice_number[..4], &order.order_number[..4]);

        let again = db.orders().generate_invoice(&order.id).await.unwrap();
        assert_eq!(again, invoice);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let err = db.orders().generate_invoice("missing").await.unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_invoice_sequence_per_month() {
        use chrono::TimeZone;

        let (db, product) = setup().await;
        let a = place(&db, &user(), &product).await;
        let b = place(&db, &user(), &product).await;
        let c = place(&db, &user(), &product).await;

        let april = Utc.with_ymd_and_hms(2025, 4, 10, 9, 0, 0).unwrap();
        let may = Utc.with_ymd_and_hms(2025, 5, 2, 9, 0, 0).unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let first = issue_invoice(&mut conn, &a.id, april).await.unwrap();
        let second = issue_invoice(&mut conn, &b.id, april).await.unwrap();
        let third = issue_invoice(&mut conn, &c.id, may).await.unwrap();

        assert_eq!(first.invoice_number, "250400001");
        assert_eq!(second.invoice_number, "250400002");
        assert_eq!(third.invoice_number, "250500001");

        // an already-invoiced order keeps its number in a later month
        let repeat = issue_invoice(&mut conn, &a.id, may).await.unwrap();
        assert_eq!(repeat.invoice_number, "250400001");
    }

    #[tokio::test]
    async fn test_order_number_redraws_on_collision() {
        let (db, product) = setup().await;
        let taken = place(&db, &user(), &product).await;
        let now = taken.created_at;
        let taken_entropy: u128 = taken.order_number[4..].parse::<u128>().unwrap() - 10_000;

        let mut conn = db.pool().acquire().await.unwrap();

        // collides on every draw but the last one allowed
        let mut draws = 0;
        let number = draw_order_number(&mut conn, now, || {
            draws += 1;
            if draws < ORDER_NUMBER_ATTEMPTS {
                taken_entropy
            } else {
                taken_entropy + 1
            }
        })
        .await
        .unwrap();
        assert_ne!(number, taken.order_number);
        assert_eq!(draws, ORDER_NUMBER_ATTEMPTS);

        let err = draw_order_number(&mut conn, now, || taken_entropy)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));
    }
}
