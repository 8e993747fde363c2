//! Runtime configuration loaded from environment variables.
//!
//! Every knob has a safe default so the service starts with nothing but
//! broker credentials set. Out-of-range values fall back to the default
//! with a warning rather than aborting startup.

use std::str::FromStr;

use tracing::warn;

use crate::domain::entities::account::AccountClass;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub broker_base_url: String,
    pub broker_account: String,
    pub broker_password: String,
    pub broker_server: String,
    pub account_class: AccountClass,
    /// Fast loop: positions and account info.
    pub fast_refresh_ms: u64,
    /// Slow loop: signal ledger re-read.
    pub slow_refresh_ms: u64,
    pub http_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "sqlite://data/tradedesk.db".to_string(),
            broker_base_url: "http://localhost:8000".to_string(),
            broker_account: String::new(),
            broker_password: String::new(),
            broker_server: String::new(),
            account_class: AccountClass::Demo,
            fast_refresh_ms: 800,
            slow_refresh_ms: 5000,
            http_port: 3000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, keeping defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(url) = std::env::var("BROKER_BASE_URL") {
            config.broker_base_url = url;
        }
        if let Ok(account) = std::env::var("BROKER_ACCOUNT") {
            config.broker_account = account;
        }
        if let Ok(password) = std::env::var("BROKER_PASSWORD") {
            config.broker_password = password;
        }
        if let Ok(server) = std::env::var("BROKER_SERVER") {
            config.broker_server = server;
        }

        if let Ok(class) = std::env::var("ACCOUNT_CLASS") {
            match AccountClass::from_str(&class) {
                Ok(value) => config.account_class = value,
                Err(e) => warn!(
                    "invalid ACCOUNT_CLASS '{}': {}, using default: {}",
                    class,
                    e,
                    config.account_class.as_str()
                ),
            }
        }

        if let Ok(ms) = std::env::var("FAST_REFRESH_MS") {
            match ms.parse::<u64>() {
                Ok(value) if (100..=10_000).contains(&value) => config.fast_refresh_ms = value,
                Ok(value) => warn!(
                    "FAST_REFRESH_MS {} out of range 100..=10000, using default: {}",
                    value, config.fast_refresh_ms
                ),
                Err(e) => warn!(
                    "failed to parse FAST_REFRESH_MS '{}': {}, using default: {}",
                    ms, e, config.fast_refresh_ms
                ),
            }
        }

        if let Ok(ms) = std::env::var("SLOW_REFRESH_MS") {
            match ms.parse::<u64>() {
                Ok(value) if (1_000..=60_000).contains(&value) => config.slow_refresh_ms = value,
                Ok(value) => warn!(
                    "SLOW_REFRESH_MS {} out of range 1000..=60000, using default: {}",
                    value, config.slow_refresh_ms
                ),
                Err(e) => warn!(
                    "failed to parse SLOW_REFRESH_MS '{}': {}, using default: {}",
                    ms, e, config.slow_refresh_ms
                ),
            }
        }

        if let Ok(port) = std::env::var("HTTP_PORT") {
            match port.parse::<u16>() {
                Ok(value) => config.http_port = value,
                Err(e) => warn!(
                    "failed to parse HTTP_PORT '{}': {}, using default: {}",
                    port, e, config.http_port
                ),
            }
        }

        config
    }

    /// The account-scope key robots and signals are partitioned by.
    pub fn account_scope(&self) -> String {
        format!("{}@{}", self.broker_account, self.broker_server)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.account_class, AccountClass::Demo);
        assert!(config.fast_refresh_ms < config.slow_refresh_ms);
        assert_eq!(config.http_port, 3000);
    }

    #[test]
    fn test_account_scope_combines_account_and_server() {
        let config = AppConfig {
            broker_account: "12345".to_string(),
            broker_server: "Demo-Server".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.account_scope(), "12345@Demo-Server");
    }
}
