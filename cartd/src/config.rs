//! Cart runtime configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CartError, CartResult};
use crate::manager::HydrationPolicy;
use crate::persistence::PersistPolicy;

/// Snapshot key used by the original marketplace app.
pub const DEFAULT_STORE_KEY: &str = "@GoMarketplace:cart";

// =============================================================================
// Configuration
// =============================================================================

/// Cart runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// What hydration does with mutations issued before it completes
    pub hydration: HydrationPolicy,

    /// What a failed snapshot write does
    pub persist: PersistPolicy,

    /// Event bus buffer size
    pub event_capacity: usize,

    /// Environment (test, development, production)
    pub environment: Environment,
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Key the cart snapshot is stored under
    pub key: String,
    /// Backing file for the file store
    pub path: PathBuf,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> CartResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CartResult<Self> {
        let environment = Self::load_environment(&lookup)?;
        let store = Self::load_store_config(&lookup);
        let hydration = Self::load_hydration_policy(&lookup)?;
        let persist = Self::load_persist_policy(&lookup)?;
        let event_capacity = Self::load_number(&lookup, "CART_EVENT_CAPACITY", 256usize)?;

        if event_capacity == 0 {
            return Err(CartError::Config("CART_EVENT_CAPACITY must be positive".to_string()));
        }

        Ok(Self {
            store,
            hydration,
            persist,
            event_capacity,
            environment,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            store: StoreConfig {
                key: DEFAULT_STORE_KEY.to_string(),
                path: PathBuf::from("cart-store.test.json"),
            },
            hydration: HydrationPolicy::Replay,
            persist: PersistPolicy::LogAndContinue,
            event_capacity: 64,
            environment: Environment::Test,
        }
    }

    /// Same configuration with a different hydration policy.
    pub fn with_hydration(mut self, hydration: HydrationPolicy) -> Self {
        self.hydration = hydration;
        self
    }

    /// Same configuration with a different persist policy.
    pub fn with_persist(mut self, persist: PersistPolicy) -> Self {
        self.persist = persist;
        self
    }

    fn load_environment(lookup: &impl Fn(&str) -> Option<String>) -> CartResult<Environment> {
        let env_str = lookup("CART_ENV").unwrap_or_else(|| "development".to_string());

        match env_str.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(CartError::Config(format!(
                "Invalid CART_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn load_store_config(lookup: &impl Fn(&str) -> Option<String>) -> StoreConfig {
        let key = lookup("CART_STORE_KEY").unwrap_or_else(|| DEFAULT_STORE_KEY.to_string());
        let path = lookup("CART_STORE_PATH").unwrap_or_else(|| "cart-store.json".to_string());

        StoreConfig {
            key,
            path: PathBuf::from(path),
        }
    }

    fn load_hydration_policy(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> CartResult<HydrationPolicy> {
        let value = lookup("CART_HYDRATION").unwrap_or_else(|| "replay".to_string());

        match value.to_lowercase().as_str() {
            "replay" => Ok(HydrationPolicy::Replay),
            "overwrite" => Ok(HydrationPolicy::Overwrite),
            other => Err(CartError::Config(format!(
                "Invalid CART_HYDRATION: {}. Expected: replay, overwrite",
                other
            ))),
        }
    }

    fn load_persist_policy(lookup: &impl Fn(&str) -> Option<String>) -> CartResult<PersistPolicy> {
        let value = lookup("CART_PERSIST_POLICY").unwrap_or_else(|| "log".to_string());

        match value.to_lowercase().as_str() {
            "log" => Ok(PersistPolicy::LogAndContinue),
            "propagate" => Ok(PersistPolicy::Propagate),
            "retry" => {
                let max_attempts = Self::load_number(lookup, "CART_PERSIST_MAX_ATTEMPTS", 3u32)?;
                let backoff_ms = Self::load_number(lookup, "CART_PERSIST_BACKOFF_MS", 50u64)?;

                if max_attempts == 0 {
                    return Err(CartError::Config(
                        "CART_PERSIST_MAX_ATTEMPTS must be at least 1".to_string(),
                    ));
                }

                Ok(PersistPolicy::Retry {
                    max_attempts,
                    initial_backoff: Duration::from_millis(backoff_ms),
                })
            }
            other => Err(CartError::Config(format!(
                "Invalid CART_PERSIST_POLICY: {}. Expected: log, retry, propagate",
                other
            ))),
        }
    }

    fn load_number<T: std::str::FromStr>(
        lookup: &impl Fn(&str) -> Option<String>,
        key: &str,
        default: T,
    ) -> CartResult<T> {
        match lookup(key) {
            Some(val) => val
                .trim()
                .parse::<T>()
                .map_err(|_| CartError::Config(format!("Invalid {} value: {}", key, val))),
            None => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                key: DEFAULT_STORE_KEY.to_string(),
                path: PathBuf::from("cart-store.json"),
            },
            hydration: HydrationPolicy::Replay,
            persist: PersistPolicy::LogAndContinue,
            event_capacity: 256,
            environment: Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.store.key, "@GoMarketplace:cart");
        assert_eq!(config.hydration, HydrationPolicy::Replay);
        assert_eq!(config.persist, PersistPolicy::LogAndContinue);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_test_config() {
        let config = Config::test();
        assert_eq!(config.environment, Environment::Test);
    }

    #[test]
    fn test_empty_lookup_matches_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        let defaults = Config::default();

        assert_eq!(config.store.key, defaults.store.key);
        assert_eq!(config.store.path, defaults.store.path);
        assert_eq!(config.event_capacity, defaults.event_capacity);
    }

    #[test]
    fn test_retry_policy_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("CART_PERSIST_POLICY", "retry"),
            ("CART_PERSIST_MAX_ATTEMPTS", "5"),
            ("CART_PERSIST_BACKOFF_MS", "10"),
            ("CART_HYDRATION", "Overwrite"),
        ]))
        .unwrap();

        assert_eq!(
            config.persist,
            PersistPolicy::Retry {
                max_attempts: 5,
                initial_backoff: Duration::from_millis(10),
            }
        );
        assert_eq!(config.hydration, HydrationPolicy::Overwrite);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("CART_ENV", "staging")],
            [("CART_HYDRATION", "merge")],
            [("CART_PERSIST_POLICY", "ignore")],
            [("CART_EVENT_CAPACITY", "0")],
        ] {
            let result = Config::from_lookup(lookup(&vars));
            assert!(matches!(result, Err(CartError::Config(_))), "{:?}", vars);
        }
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Test.to_string(), "test");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Production.to_string(), "production");
    }
}
