//! # Storage Errors
//!
//! One error type for every repository call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Where DbError Comes From                             │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)        Rule violation (CoreError)          │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError ← constraint failures sorted, rule violations kept intact     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Storefront handler ← Maps to an HTTP status / user message            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use lokum_core::CoreError;
use thiserror::Error;

/// Everything a repository call can fail with.
///
/// Rule violations (`OutOfStock`, an expired coupon, a cancelled order)
/// arrive as [`DbError::Core`] and keep their `lokum-core` message; the
/// remaining variants describe the storage itself.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id (or code, or order number).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A `UNIQUE` index rejected the write: a second product with the same
    /// SKU, a reused coupon code.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A row points at something that no longer exists.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite refused the statement for some other reason.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Every pooled connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A stored value could not be turned back into a domain value.
    #[error("Corrupt {column} value: {reason}")]
    Corrupt { column: String, reason: String },

    /// Business rule violation raised while handling the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn corrupt(column: impl Into<String>, reason: impl ToString) -> Self {
        DbError::Corrupt {
            column: column.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the wrapped rule violation, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            DbError::Core(err) => Some(err),
            _ => None,
        }
    }
}

/// Sorts SQLite's error text into the variants above.
///
/// ```text
/// "UNIQUE constraint failed: products.sku"  → UniqueViolation { field: "products.sku" }
/// "FOREIGN KEY constraint failed"           → ForeignKeyViolation
/// any other database message                → QueryFailed
/// ```
fn classify(message: &str) -> DbError {
    const UNIQUE: &str = "UNIQUE constraint failed: ";

    if let Some(idx) = message.find(UNIQUE) {
        let columns = &message[idx + UNIQUE.len()..];
        return DbError::UniqueViolation {
            field: columns.to_string(),
            value: String::new(),
        };
    }
    if message.contains("FOREIGN KEY constraint failed") {
        return DbError::ForeignKeyViolation {
            message: message.to_string(),
        };
    }
    DbError::QueryFailed(message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            // repositories use fetch_optional and name the entity themselves;
            // this only fires on a bare fetch_one
            sqlx::Error::RowNotFound => DbError::not_found("Row", "(fetch_one)"),
            sqlx::Error::Database(db_err) => classify(db_err.message()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::ColumnDecode { index, source } => DbError::corrupt(index, source),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::corrupt("json", err)
    }
}

impl From<lokum_core::CouponError> for DbError {
    fn from(err: lokum_core::CouponError) -> Self {
        DbError::Core(err.into())
    }
}

impl From<lokum_core::ValidationError> for DbError {
    fn from(err: lokum_core::ValidationError) -> Self {
        DbError::Core(err.into())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lokum_core::CouponError;

    #[test]
    fn test_helpers() {
        let err = DbError::not_found("Order", "o-1");
        assert_eq!(err.to_string(), "Order not found: o-1");

        let err = DbError::duplicate("sku", "LOKUM-GUL");
        assert_eq!(err.to_string(), "Duplicate sku: 'LOKUM-GUL' already exists");
    }

    #[test]
    fn test_core_errors_pass_through() {
        let err: DbError = CouponError::UsageLimitReached.into();
        assert_eq!(err.to_string(), "Coupon usage limit reached");
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Coupon(CouponError::UsageLimitReached))
        ));
    }

    #[test]
    fn test_classify_constraint_messages() {
        match classify("UNIQUE constraint failed: coupons.code") {
            DbError::UniqueViolation { field, .. } => assert_eq!(field, "coupons.code"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            classify("FOREIGN KEY constraint failed"),
            DbError::ForeignKeyViolation { .. }
        ));
        assert!(matches!(classify("no such table: carts"), DbError::QueryFailed(_)));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
