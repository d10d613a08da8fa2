//! # Seed Data Generator
//!
//! Populates the database with a small confectionery catalog and the two
//! launch coupons, then prices a sample guest cart.
//!
//! ## Usage
//! ```bash
//! # Use LOKUM_DATABASE_PATH (default ./lokum.db)
//! cargo run -p lokum-db --bin seed
//!
//! # Specify database path
//! cargo run -p lokum-db --bin seed -- --db ./data/lokum_dev.db
//!
//! # More logging
//! RUST_LOG=lokum_db=debug cargo run -p lokum-db --bin seed
//! ```
//!
//! ## Generated Data
//! - Products priced per 250g with 500g and 1kg options
//! - `HOSGELDIN10`: 10% off, at most ₺50, once per customer
//! - `SEKER20`: ₺20 off orders of ₺100 or more

use std::env;
use std::path::PathBuf;

use chrono::Utc;
use lokum_core::{
    CartOwner, Coupon, CouponDiscount, CouponStatus, Money, Product, ProductStatus, Rate,
    VariantStock, WeightVariant,
};
use lokum_db::{Database, StoreConfig};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// (sku, name, price per 250g in kuruş, sale price, stock per size)
const CATALOG: &[(&str, &str, i64, Option<i64>, i64)] = &[
    ("LKM-GUL", "Güllü Lokum", 12_000, None, 40),
    ("LKM-FST", "Fıstıklı Lokum", 18_500, Some(16_900), 25),
    ("LKM-NAR", "Narlı Lokum", 14_000, None, 30),
    ("LKM-CFT", "Çifte Kavrulmuş Lokum", 21_000, None, 15),
    ("HLV-TAH", "Tahin Helvası", 9_500, Some(8_500), 50),
    ("CKL-FND", "Fındıklı Çikolata", 16_000, None, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = StoreConfig::load()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lokum Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $LOKUM_DATABASE_PATH or ./lokum.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lokum Seed Data Generator");
    println!("============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut products = Vec::new();
    for &(sku, name, price_cents, sale_cents, stock) in CATALOG {
        let product = confection(sku, name, price_cents, sale_cents, stock);
        match db.products().insert(&product).await {
            Ok(product) => {
                println!("  {} {} ({} / 250g)", product.sku, product.name, product.unit_price(None));
                products.push(product);
            }
            Err(e) => eprintln!("Failed to insert {}: {}", sku, e),
        }
    }
    println!("✓ Generated {} products", products.len());

    println!();
    println!("Generating coupons...");
    for coupon in [welcome_coupon(), sugar_coupon()] {
        match db.coupons().insert(&coupon).await {
            Ok(coupon) => println!("  {}", coupon.code),
            Err(e) => eprintln!("Failed to insert {}: {}", coupon.code, e),
        }
    }

    // Price a sample guest cart
    if let Some(first) = products.first() {
        println!();
        println!("Sample cart...");

        let guest = CartOwner::Session(format!("seed-{}", Uuid::new_v4()));
        db.carts().add_item(&guest, &first.id, Some(WeightVariant::G500), 2).await?;
        db.carts().apply_coupon(&guest, "SEKER20").await?;

        let summary = db.carts().summary(&guest, &config.pricing).await?;
        println!("  Subtotal:  {}", summary.subtotal);
        println!("  Discount: -{}", summary.discount);
        println!("  Tax:       {}", summary.tax);
        println!("  Shipping:  {}", summary.shipping);
        println!("  Total:     {}", summary.total);

        db.carts().clear(&guest).await?;
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lokum_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// A product priced per 250g, sold in all three sizes.
fn confection(sku: &str, name: &str, price_cents: i64, sale_cents: Option<i64>, stock: i64) -> Product {
    let now = Utc::now();

    Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        name: name.to_string(),
        price: Money::from_cents(price_cents),
        discounted_price: sale_cents.map(Money::from_cents),
        base_weight: Some(WeightVariant::G250),
        stock,
        variants: WeightVariant::ALL
            .iter()
            .map(|&variant| VariantStock {
                variant,
                // heavier boxes are packed in smaller numbers
                stock: stock / variant.multiplier_over(WeightVariant::G250),
            })
            .collect(),
        status: ProductStatus::Active,
        created_at: now,
        updated_at: now,
    }
}

fn welcome_coupon() -> Coupon {
    Coupon {
        id: Uuid::new_v4().to_string(),
        code: "HOSGELDIN10".to_string(),
        discount: CouponDiscount::Percentage {
            rate: Rate::percent(10),
            max_discount: Some(Money::from_cents(5_000)),
        },
        min_amount: None,
        usage_limit: None,
        usage_count: 0,
        per_user_limit: Some(1),
        start_date: None,
        end_date: None,
        status: CouponStatus::Active,
    }
}

fn sugar_coupon() -> Coupon {
    Coupon {
        id: Uuid::new_v4().to_string(),
        code: "SEKER20".to_string(),
        discount: CouponDiscount::Fixed {
            amount: Money::from_cents(2_000),
        },
        min_amount: Some(Money::from_cents(10_000)),
        usage_limit: Some(500),
        usage_count: 0,
        per_user_limit: None,
        start_date: Some(Utc::now()),
        end_date: Some(Utc::now() + chrono::Duration::days(90)),
        status: CouponStatus::Active,
    }
}
