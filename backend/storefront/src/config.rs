//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::cart::ShippingPolicy;
use crate::errors::{Result, StorefrontError};

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL, or `memory` for the in-process store
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// Upper bound on a single submission write before it is reported as
    /// outcome-unknown
    pub store_write_timeout: Duration,
    /// Orders at or above this subtotal ship for free
    pub free_shipping_threshold: u64,
    /// Flat delivery fee below the threshold
    pub flat_shipping_fee: u64,
    /// Bearer token for the admin routes; admin routes are disabled when unset
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./storefront.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| StorefrontError::Config("Invalid API_PORT".to_string()))?,
            store_write_timeout: env_var("STORE_WRITE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| {
                    StorefrontError::Config("Invalid STORE_WRITE_TIMEOUT_SECS".to_string())
                })?,
            free_shipping_threshold: env_var("FREE_SHIPPING_THRESHOLD")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| {
                    StorefrontError::Config("Invalid FREE_SHIPPING_THRESHOLD".to_string())
                })?,
            flat_shipping_fee: env_var("FLAT_SHIPPING_FEE")
                .unwrap_or_else(|_| "99".to_string())
                .parse()
                .map_err(|_| StorefrontError::Config("Invalid FLAT_SHIPPING_FEE".to_string()))?,
            admin_token: env_var("ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn write_timeout(&self) -> Duration {
        self.store_write_timeout
    }

    pub fn shipping_policy(&self) -> ShippingPolicy {
        ShippingPolicy {
            free_threshold: self.free_shipping_threshold,
            flat_fee: self.flat_shipping_fee,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let policy = ShippingPolicy::default();
        Config {
            database_url: "memory".to_string(),
            api_port: 3001,
            store_write_timeout: Duration::from_secs(15),
            free_shipping_threshold: policy.free_threshold,
            flat_shipping_fee: policy.flat_fee,
            admin_token: None,
        }
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| StorefrontError::Config(format!("Missing env var: {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_shop_pricing() {
        let policy = Config::default().shipping_policy();
        assert_eq!(policy.free_threshold, 1000);
        assert_eq!(policy.flat_fee, 99);
        assert_eq!(Config::default().write_timeout(), Duration::from_secs(15));
    }
}
