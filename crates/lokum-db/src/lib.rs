//! # lokum-db: Database Layer for the Lokum Storefront
//!
//! Persistent carts, coupons, products and orders on SQLite via sqlx.
//! The rules themselves (pricing, coupon eligibility, cart merging) live in
//! `lokum-core`; this crate loads state, hands it to those rules and writes
//! the result back inside a transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Lokum Data Flow                                  │
//! │                                                                         │
//! │  Storefront handler (add to cart, checkout)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     lokum-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CouponRepo    │    │ 001_initial  │  │   │
//! │  │   │ StoreConfig   │    │ CartRepo      │    │ _schema.sql  │  │   │
//! │  │   │               │    │ OrderRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                              │   │
//! │  └────────────────────────────────┼──────────────────────────────┘   │
//! │                                   ▼                                   │
//! │                     lokum-core (pure rules)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lokum_core::{CartOwner, WeightVariant};
//! use lokum_db::{Database, StoreConfig};
//!
//! let config = StoreConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let guest = CartOwner::Session("sess-1".into());
//! db.carts().add_item(&guest, &product_id, Some(WeightVariant::G500), 2).await?;
//! let summary = db.carts().summary(&guest, &config.pricing).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, StoreConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cart::CartRepository;
pub use repository::coupon::CouponRepository;
pub use repository::order::{OrderFilter, OrderPage, OrderRepository};
pub use repository::product::ProductRepository;
