//! Storefront configuration.
//!
//! Loaded from environment variables with fallback to defaults.
//!
//! | variable                               | default       |
//! |----------------------------------------|---------------|
//! | `LOKUM_DATABASE_PATH`                  | `./lokum.db`  |
//! | `LOKUM_DB_MAX_CONNECTIONS`             | `5`           |
//! | `LOKUM_TAX_RATE_BPS`                   | `800`         |
//! | `LOKUM_FREE_SHIPPING_THRESHOLD`        | `200.00`      |
//! | `LOKUM_SHIPPING_COST`                  | `30.00`       |
//! | `LOKUM_CHARGE_SHIPPING_ON_EMPTY_CART`  | `false`       |

use std::env;
use std::path::PathBuf;

use lokum_core::validation::validate_rate_bps;
use lokum_core::{Money, PricingConfig, Rate};
use serde::{Deserialize, Serialize};

use crate::pool::DbConfig;

/// Storefront configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub db_max_connections: u32,

    /// Tax, shipping and empty-cart policy
    pub pricing: PricingConfig,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let tax_rate_bps: u32 = var("LOKUM_TAX_RATE_BPS", "800")
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOKUM_TAX_RATE_BPS".to_string()))?;
        validate_rate_bps("LOKUM_TAX_RATE_BPS", tax_rate_bps)
            .map_err(|_| ConfigError::InvalidValue("LOKUM_TAX_RATE_BPS".to_string()))?;

        let config = StoreConfig {
            database_path: PathBuf::from(var("LOKUM_DATABASE_PATH", "./lokum.db")),

            db_max_connections: var("LOKUM_DB_MAX_CONNECTIONS", "5")
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("LOKUM_DB_MAX_CONNECTIONS".to_string()))?,

            pricing: PricingConfig {
                tax_rate: Rate::from_bps(tax_rate_bps),
                free_shipping_threshold: parse_amount(
                    "LOKUM_FREE_SHIPPING_THRESHOLD",
                    &var("LOKUM_FREE_SHIPPING_THRESHOLD", "200.00"),
                )?,
                shipping_cost: parse_amount("LOKUM_SHIPPING_COST", &var("LOKUM_SHIPPING_COST", "30.00"))?,
                charge_shipping_on_empty_cart: parse_flag(
                    "LOKUM_CHARGE_SHIPPING_ON_EMPTY_CART",
                    &var("LOKUM_CHARGE_SHIPPING_ON_EMPTY_CART", "false"),
                )?,
            },
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("LOKUM_DB_MAX_CONNECTIONS".to_string()));
        }

        Ok(config)
    }

    /// Database settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.db_max_connections)
    }
}

fn parse_amount(key: &str, raw: &str) -> Result<Money, ConfigError> {
    let amount: Money = raw
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
    if amount.is_negative() {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(amount)
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./lokum.db"));
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.pricing, PricingConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("LOKUM_DATABASE_PATH", "/var/lib/lokum/shop.db"),
            ("LOKUM_DB_MAX_CONNECTIONS", "8"),
            ("LOKUM_TAX_RATE_BPS", "1800"),
            ("LOKUM_FREE_SHIPPING_THRESHOLD", "500"),
            ("LOKUM_SHIPPING_COST", "45.90"),
            ("LOKUM_CHARGE_SHIPPING_ON_EMPTY_CART", "yes"),
        ])
        .unwrap();

        assert_eq!(config.db_max_connections, 8);
        assert_eq!(config.pricing.tax_rate.bps(), 1800);
        assert_eq!(config.pricing.free_shipping_threshold.cents(), 50_000);
        assert_eq!(config.pricing.shipping_cost.cents(), 4_590);
        assert!(config.pricing.charge_shipping_on_empty_cart);

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/lokum/shop.db"));
        assert_eq!(db.max_connections, 8);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("LOKUM_TAX_RATE_BPS", "eight")]),
            Err(ConfigError::InvalidValue(key)) if key == "LOKUM_TAX_RATE_BPS"
        ));
        assert!(load(&[("LOKUM_TAX_RATE_BPS", "10001")]).is_err());
        assert!(load(&[("LOKUM_SHIPPING_COST", "-1")]).is_err());
        assert!(load(&[("LOKUM_SHIPPING_COST", "30.555")]).is_err());
        assert!(load(&[("LOKUM_DB_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("LOKUM_CHARGE_SHIPPING_ON_EMPTY_CART", "maybe")]).is_err());
    }
}
