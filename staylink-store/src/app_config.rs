use rust_decimal::Decimal;
use serde::Deserialize;
use staylink_shared::Masked;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub suppliers: SuppliersConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

/// Networked cache backend. Both values must be present for Redis to be used.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    pub url: Option<String>,
    pub token: Option<Masked<String>>,
}

impl CacheConfig {
    /// `(url, token)` when both are non-blank.
    pub fn networked(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let token = self.token.as_ref().filter(|t| !t.is_blank())?;
        Some((url, token.expose().as_str()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuppliersConfig {
    /// Supplier code used when a caller does not name one.
    pub default: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_fan_out_timeout")]
    pub fan_out_timeout_seconds: u64,
    pub atlas: Option<RemoteSupplierConfig>,
    pub meridian: Option<RemoteSupplierConfig>,
}

fn default_request_timeout() -> u64 { 15 }
fn default_fan_out_timeout() -> u64 { 20 }

impl Default for SuppliersConfig {
    fn default() -> Self {
        Self {
            default: None,
            request_timeout_seconds: default_request_timeout(),
            fan_out_timeout_seconds: default_fan_out_timeout(),
            atlas: None,
            meridian: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RemoteSupplierConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub key_id: String,
    #[serde(default)]
    pub secret: Masked<String>,
}

impl RemoteSupplierConfig {
    /// Blank values count as missing credentials.
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.key_id.trim().is_empty() && !self.secret.is_blank()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Maximum accepted relative price change at prebook (0.05 = 5%).
    #[serde(default = "default_drift_tolerance")]
    pub price_drift_tolerance: Decimal,
    #[serde(default = "default_full_refund_hours")]
    pub full_refund_hours: i64,
    #[serde(default = "default_partial_refund_hours")]
    pub partial_refund_hours: i64,
    #[serde(default = "default_partial_refund_percent")]
    pub partial_refund_percent: Decimal,
    /// Hour of day (UTC) at which a booking's check-in date starts.
    #[serde(default)]
    pub check_in_hour_utc: u32,
    #[serde(default = "default_test_hotel_prefix")]
    pub test_hotel_prefix: String,
    #[serde(default = "default_test_hotel_id_min")]
    pub test_hotel_id_min: u64,
    #[serde(default = "default_test_hotel_id_max")]
    pub test_hotel_id_max: u64,
}

fn default_drift_tolerance() -> Decimal { Decimal::new(5, 2) }
fn default_full_refund_hours() -> i64 { 24 }
fn default_partial_refund_hours() -> i64 { 12 }
fn default_partial_refund_percent() -> Decimal { Decimal::from(50) }
fn default_test_hotel_prefix() -> String { "test_hotel".to_string() }
fn default_test_hotel_id_min() -> u64 { 8_000_000 }
fn default_test_hotel_id_max() -> u64 { 8_999_999 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            price_drift_tolerance: default_drift_tolerance(),
            full_refund_hours: default_full_refund_hours(),
            partial_refund_hours: default_partial_refund_hours(),
            partial_refund_percent: default_partial_refund_percent(),
            check_in_hour_utc: 0,
            test_hotel_prefix: default_test_hotel_prefix(),
            test_hotel_id_min: default_test_hotel_id_min(),
            test_hotel_id_max: default_test_hotel_id_max(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of STAYLINK)
            // Eg.. `STAYLINK__SUPPLIERS__ATLAS__KEY_ID=abc` sets `suppliers.atlas.key_id`
            .add_source(config::Environment::with_prefix("STAYLINK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_supplier_requires_every_credential() {
        let mut cfg = RemoteSupplierConfig {
            base_url: "https://api.atlas.test".to_string(),
            key_id: "key".to_string(),
            secret: Masked::from("secret"),
        };
        assert!(cfg.is_configured());

        cfg.secret = Masked::from("  ");
        assert!(!cfg.is_configured());
    }

    #[test]
    fn test_cache_config_needs_url_and_token() {
        let mut cfg = CacheConfig::default();
        assert!(cfg.networked().is_none());

        cfg.url = Some("rediss://cache.example.com:6379".to_string());
        assert!(cfg.networked().is_none());

        cfg.token = Some(Masked::from("tok"));
        assert_eq!(cfg.networked(), Some(("rediss://cache.example.com:6379", "tok")));
    }

    #[test]
    fn test_business_rules_defaults() {
        let rules = BusinessRules::default();
        assert_eq!(rules.price_drift_tolerance, Decimal::new(5, 2));
        assert_eq!(rules.full_refund_hours, 24);
        assert_eq!(rules.partial_refund_hours, 12);
        assert_eq!(rules.test_hotel_prefix, "test_hotel");
    }

    #[test]
    fn test_secrets_do_not_leak_in_debug() {
        let cfg = RemoteSupplierConfig {
            base_url: "https://api.meridian.test".to_string(),
            key_id: "key".to_string(),
            secret: Masked::from("super-secret"),
        };
        assert!(!format!("{:?}", cfg).contains("super-secret"));
    }
}
