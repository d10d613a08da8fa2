//! # Orders
//!
//! Order records and the lifecycle rules around them. The database crate
//! persists these; the decisions (initial status, who may cancel, what a
//! payment update does) are made here.
//!
//! ## Status Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   cash_on_delivery ──► Pending ─────────┐                               │
//! │                                         ▼                               │
//! │   card / transfer ───► AwaitingPayment ─► Processing ─► Shipped ─►      │
//! │                          │   (paid)        │              Delivered     │
//! │                          │                 │                            │
//! │                          └──── cancel ─────┴──► Cancelled (restock)     │
//! │                                                                         │
//! │   Refunded / OnHold: set explicitly by staff                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::CartSummary;
use crate::types::WeightVariant;
use crate::validation;

// =============================================================================
// Status Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    AwaitingPayment,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
    OnHold,
}

impl OrderStatus {
    /// Status a new order starts in.
    pub fn initial_for(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => OrderStatus::Pending,
            PaymentMethod::CreditCard | PaymentMethod::BankTransfer => OrderStatus::AwaitingPayment,
        }
    }

    /// Only orders that have not left the warehouse can be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::AwaitingPayment | OrderStatus::Processing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
            OrderStatus::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    CashOnDelivery,
    BankTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Collected on delivery.
    Pending,
    /// Waiting for the gateway or a bank transfer.
    Awaiting,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn initial_for(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::CashOnDelivery => PaymentStatus::Pending,
            PaymentMethod::CreditCard | PaymentMethod::BankTransfer => PaymentStatus::Awaiting,
        }
    }
}

/// Order status change triggered by a payment status update, if any.
///
/// A payment confirmed while the order waits for it moves the order on to
/// `Processing`.
pub fn payment_transition(order_status: OrderStatus, payment: PaymentStatus) -> Option<OrderStatus> {
    match (order_status, payment) {
        (OrderStatus::AwaitingPayment, PaymentStatus::Paid) => Some(OrderStatus::Processing),
        _ => None,
    }
}

/// Fails with `OrderNotCancellable` unless the order can still be cancelled.
pub fn ensure_cancellable(order_id: &str, status: OrderStatus) -> CoreResult<()> {
    if status.is_cancellable() {
        Ok(())
    } else {
        Err(CoreError::OrderNotCancellable {
            order_id: order_id.to_string(),
            status: status.to_string(),
        })
    }
}

// =============================================================================
// Checkout Input
// =============================================================================

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: String,
}

impl Address {
    fn validate(&self, prefix: &str) -> Result<(), ValidationError> {
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: format!("{prefix}.{field}"),
                });
            }
        }
        Ok(())
    }
}

/// What the customer submits at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub email: String,
    pub phone: String,
    pub billing: Address,
    /// Falls back to the billing address when absent.
    pub shipping: Option<Address>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

impl Checkout {
    pub fn shipping_address(&self) -> &Address {
        self.shipping.as_ref().unwrap_or(&self.billing)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_email(&self.email)?;
        if self.phone.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "phone".to_string(),
            });
        }
        self.billing.validate("billing")?;
        if let Some(shipping) = &self.shipping {
            shipping.validate("shipping")?;
        }
        Ok(())
    }
}

// =============================================================================
// Order Records
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// `YYMM` followed by five digits, e.g. `250412345`.
    pub order_number: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub email: String,
    pub phone: String,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub coupon_code: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub currency: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The amounts frozen on the order at placement.
    pub fn summary(&self) -> CartSummary {
        CartSummary {
            subtotal: self.subtotal,
            discount: self.discount,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
        }
    }
}

/// Snapshot of a cart line at the time the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub name: String,
    pub variant: Option<WeightVariant>,
    pub quantity: i64,
    pub unit_price: Money,
    pub total: Money,
}

impl OrderItem {
    /// Stock change this item causes: negative on sale, positive on restock.
    pub fn stock_movement(&self, restock: bool) -> StockMovement {
        StockMovement {
            product_id: self.product_id.clone(),
            variant: self.variant,
            delta: if restock { self.quantity } else { -self.quantity },
        }
    }
}

/// A signed stock adjustment for one product/variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMovement {
    pub product_id: String,
    pub variant: Option<WeightVariant>,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatusHistoryEntry {
    pub id: String,
    pub order_id: String,
    pub status: OrderStatus,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A remark attached to an order by staff or the customer.
///
/// Private notes stay internal; public ones are shown on the customer's
/// order page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderNote {
    pub id: String,
    pub order_id: String,
    pub user_id: Option<String>,
    pub note: String,
    pub is_public: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Invoice issued for an order. One per order; issuing again returns the
/// existing invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub order_id: String,
    /// `YYMM` followed by the month's five digit sequence, e.g. `250400017`.
    pub invoice_number: String,
    pub amount: Money,
    pub tax: Money,
    pub currency: String,
    pub billing_name: String,
    pub billing_address: Address,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Copies the billed amounts and the billing party off the order.
    pub fn for_order(order: &Order, invoice_number: String, now: DateTime<Utc>) -> Self {
        let billing = &order.billing_address;
        Invoice {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            invoice_number,
            amount: order.total,
            tax: order.tax,
            currency: order.currency.clone(),
            billing_name: format!("{} {}", billing.first_name, billing.last_name),
            billing_address: billing.clone(),
            created_at: now,
        }
    }
}

// =============================================================================
// Order Number
// =============================================================================

/// Builds an order number: two-digit year, two-digit month, then a five
/// digit number in `10000..=99999` taken from `entropy`.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use lokum_core::order::generate_order_number;
///
/// let now = Utc.with_ymd_and_hms(2025, 4, 9, 12, 0, 0).unwrap();
/// assert_eq!(generate_order_number(now, 2_345), "250412345");
/// ```
pub fn generate_order_number(now: DateTime<Utc>, entropy: u128) -> String {
    let suffix = entropy % 90_000 + 10_000;
    format!("{}{:05}", number_prefix(now), suffix)
}

/// `YYMM` prefix shared by order and invoice numbers issued at `now`.
pub fn number_prefix(now: DateTime<Utc>) -> String {
    format!("{:02}{:02}", now.year() % 100, now.month())
}

/// Next invoice number for the month of `now`.
///
/// Invoices are numbered sequentially within a month: `last` is the highest
/// number issued so far with this month's prefix, or `None` for the first
/// invoice of the month. A `last` from another month restarts the count.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use lokum_core::order::next_invoice_number;
///
/// let now = Utc.with_ymd_and_hms(2025, 4, 9, 12, 0, 0).unwrap();
/// assert_eq!(next_invoice_number(now, None), "250400001");
/// assert_eq!(next_invoice_number(now, Some("250400041")), "250400042");
/// assert_eq!(next_invoice_number(now, Some("250300041")), "250400001");
/// ```
pub fn next_invoice_number(now: DateTime<Utc>, last: Option<&str>) -> String {
    let prefix = number_prefix(now);
    let sequence = last
        .and_then(|number| number.strip_prefix(prefix.as_str()))
        .and_then(|digits| digits.parse::<u64>().ok())
        .map_or(1, |n| n + 1);

    format!("{prefix}{sequence:05}")
}

// =============================================================================
// Unit Tests
// =============================================================================
