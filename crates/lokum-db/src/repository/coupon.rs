//! # Coupon Repository
//!
//! Coupon lookup and usage bookkeeping. Eligibility itself is decided by
//! [`Coupon::validate`](lokum_core::Coupon::validate); this repository only
//! supplies the facts it needs (the coupon row and per-user usage count).
//!
//! ## Storage
//! ```text
//! coupons.kind = 'percentage'  →  amount is basis points (2000 = 20%)
//! coupons.kind = 'fixed'       →  amount is kuruş        (2000 = ₺20.00)
//! coupon_usages                →  one row per redemption, user_id NULL for guests
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::to_u32;
use lokum_core::validation::{validate_coupon_code, validate_rate_bps};
use lokum_core::{Coupon, CouponDiscount, CouponKind, CouponStatus, Money, Rate};

// =============================================================================
// Row Type
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    kind: CouponKind,
    amount: i64,
    min_amount_cents: Option<i64>,
    max_discount_cents: Option<i64>,
    usage_limit: Option<i64>,
    usage_count: i64,
    per_user_limit: Option<i64>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    status: CouponStatus,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> DbResult<Self> {
        let discount = match row.kind {
            CouponKind::Percentage => CouponDiscount::Percentage {
                rate: Rate::from_bps(to_u32("coupons.amount", row.amount)?),
                max_discount: row.max_discount_cents.map(Money::from_cents),
            },
            CouponKind::Fixed => CouponDiscount::Fixed {
                amount: Money::from_cents(row.amount),
            },
        };

        Ok(Coupon {
            id: row.id,
            code: row.code,
            discount,
            min_amount: row.min_amount_cents.map(Money::from_cents),
            usage_limit: row.usage_limit.map(|v| to_u32("coupons.usage_limit", v)).transpose()?,
            usage_count: to_u32("coupons.usage_count", row.usage_count)?,
            per_user_limit: row
                .per_user_limit
                .map(|v| to_u32("coupons.per_user_limit", v))
                .transpose()?,
            start_date: row.start_date,
            end_date: row.end_date,
            status: row.status,
        })
    }
}

const COUPON_COLUMNS: &str = r#"
    id, code, kind, amount, min_amount_cents, max_discount_cents,
    usage_limit, usage_count, per_user_limit, start_date, end_date, status
"#;

// =============================================================================
// Connection-Level Helpers
// =============================================================================

pub(crate) async fn load_coupon_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Coupon>> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Coupon::try_from).transpose()
}

pub(crate) async fn load_coupon_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Coupon::try_from).transpose()
}

/// Redemptions of a coupon by one registered user.
pub(crate) async fn count_user_usage(
    conn: &mut SqliteConnection,
    coupon_id: &str,
    user_id: &str,
) -> DbResult<u32> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = ?1 AND user_id = ?2",
    )
    .bind(coupon_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    to_u32("coupon_usages", count)
}

/// Bumps `usage_count` and records who redeemed the coupon.
pub(crate) async fn insert_usage(
    conn: &mut SqliteConnection,
    coupon_id: &str,
    user_id: Option<&str>,
    order_id: Option<&str>,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE coupons SET usage_count = usage_count + 1, updated_at = ?2 WHERE id = ?1",
    )
    .bind(coupon_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Coupon", coupon_id));
    }

    sqlx::query(
        r#"
        INSERT INTO coupon_usages (id, coupon_id, user_id, order_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(coupon_id)
    .bind(user_id)
    .bind(order_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(coupon_id = %coupon_id, user_id = ?user_id, "Coupon usage recorded");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Inserts a coupon. The code is normalized to upper case.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<Coupon> {
        let code = validate_coupon_code(&coupon.code)?;

        let (amount, max_discount) = match coupon.discount {
            CouponDiscount::Percentage { rate, max_discount } => {
                validate_rate_bps("amount", rate.bps())?;
                (i64::from(rate.bps()), max_discount.map(|m| m.cents()))
            }
            CouponDiscount::Fixed { amount } => (amount.cents(), None),
        };

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, kind, amount, min_amount_cents, max_discount_cents,
                usage_limit, usage_count, per_user_limit, start_date, end_date, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&coupon.id)
        .bind(&code)
        .bind(coupon.kind())
        .bind(amount)
        .bind(coupon.min_amount.map(|m| m.cents()))
        .bind(max_discount)
        .bind(coupon.usage_limit)
        .bind(coupon.usage_count)
        .bind(coupon.per_user_limit)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.status)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } if field.ends_with("code") => {
                DbError::duplicate("coupon code", code.clone())
            }
            other => other,
        })?;

        info!(code = %code, kind = ?coupon.kind(), "Coupon created");

        Ok(Coupon {
            code,
            ..coupon.clone()
        })
    }

    /// Gets a coupon by code (case-insensitive).
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let code = validate_coupon_code(code)?;
        let mut conn = self.pool.acquire().await?;
        load_coupon_by_code(&mut conn, &code).await
    }

    /// Gets a coupon by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let mut conn = self.pool.acquire().await?;
        load_coupon_by_id(&mut conn, id).await
    }

    /// How many times `user_id` has redeemed the coupon.
    pub async fn user_usage_count(&self, coupon_id: &str, user_id: &str) -> DbResult<u32> {
        let mut conn = self.pool.acquire().await?;
        count_user_usage(&mut conn, coupon_id, user_id).await
    }

    /// Records one redemption. Order placement does this itself; this entry
    /// point is for redemptions recorded outside checkout.
    pub async fn record_usage(
        &self,
        coupon_id: &str,
        user_id: Option<&str>,
        order_id: Option<&str>,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_usage(&mut tx, coupon_id, user_id, order_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Activates or deactivates a coupon.
    pub async fn set_status(&self, id: &str, status: CouponStatus) -> DbResult<()> {
        let result = sqlx::query("UPDATE coupons SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }

        info!(id = %id, status = ?status, "Coupon status changed");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    pub(crate) fn fixed(code: &str, cents: i64) -> Coupon {
        Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            discount: CouponDiscount::Fixed {
                amount: Money::from_cents(cents),
            },
            min_amount: None,
            usage_limit: None,
            usage_count: 0,
            per_user_limit: None,
            start_date: None,
            end_date: None,
            status: CouponStatus::Active,
        }
    }

    pub(crate) fn percentage(code: &str, pct: u32, max_cents: Option<i64>) -> Coupon {
        Coupon {
            discount: CouponDiscount::Percentage {
                rate: Rate::percent(pct),
                max_discount: max_cents.map(Money::from_cents),
            },
            ..fixed(code, 0)
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_normalizes_and_round_trips() {
        let db = db().await;
        let mut coupon = percentage("hosgeldin10", 10, Some(5_000));
        coupon.min_amount = Some(Money::from_cents(10_000));
        coupon.per_user_limit = Some(1);
        coupon.end_date = Some(Utc::now() + chrono::Duration::days(30));

        let stored = db.coupons().insert(&coupon).await.unwrap();
        assert_eq!(stored.code, "HOSGELDIN10");

        let loaded = db.coupons().get_by_code("HosGeldin10").await.unwrap().unwrap();
        assert_eq!(loaded.id, coupon.id);
        assert_eq!(loaded.kind(), CouponKind::Percentage);
        assert_eq!(
            loaded.discount,
            CouponDiscount::Percentage {
                rate: Rate::percent(10),
                max_discount: Some(Money::from_cents(5_000)),
            }
        );
        assert_eq!(loaded.min_amount, Some(Money::from_cents(10_000)));
        assert_eq!(loaded.per_user_limit, Some(1));
        assert!(loaded.end_date.is_some());

        let by_id = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "HOSGELDIN10");
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = db().await;
        db.coupons().insert(&fixed("SEKER20", 2_000)).await.unwrap();
        let err = db.coupons().insert(&fixed("seker20", 1_000)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let db = db().await;
        assert!(db.coupons().get_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_usage_recording() {
        let db = db().await;
        let coupon = db.coupons().insert(&fixed("BAYRAM", 1_500)).await.unwrap();
        let repo = db.coupons();

        repo.record_usage(&coupon.id, Some("user-1"), None).await.unwrap();
        repo.record_usage(&coupon.id, Some("user-1"), None).await.unwrap();
        repo.record_usage(&coupon.id, None, None).await.unwrap();

        assert_eq!(repo.user_usage_count(&coupon.id, "user-1").await.unwrap(), 2);
        assert_eq!(repo.user_usage_count(&coupon.id, "user-2").await.unwrap(), 0);

        let loaded = repo.get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(loaded.usage_count, 3);

        assert!(matches!(
            repo.record_usage("missing", None, None).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_status() {
        let db = db().await;
        let coupon = db.coupons().insert(&fixed("KAPALI", 500)).await.unwrap();
        db.coupons().set_status(&coupon.id, CouponStatus::Inactive).await.unwrap();

        let loaded = db.coupons().get_by_id(&coupon.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CouponStatus::Inactive);
    }
}
