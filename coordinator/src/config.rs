//! Coupon service configuration.

use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;

use coupon_common::MAX_DESCRIPTION_LEN;

/// Bounds applied when issuing coupons.
#[derive(Debug, Clone)]
pub struct BatchLimits {
    /// Largest number of coupons in one batch.
    pub max_batch_size: usize,
    /// Smallest value a coupon may carry.
    pub min_unit_value: Decimal,
    /// Longest description, in characters.
    pub max_description_len: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_batch_size: 10_000,
            min_unit_value: Decimal::new(1, 6),
            max_description_len: MAX_DESCRIPTION_LEN,
        }
    }
}

/// Lock configuration.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// How long a caller waits for a coupon another call is working on.
    pub coupon_wait_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            coupon_wait_timeout: Duration::from_secs(120),
        }
    }
}

/// Redemption configuration.
#[derive(Debug, Clone, Default)]
pub struct RedemptionConfig {
    /// Give up waiting for an on-ledger confirmation after this long.
    ///
    /// A redemption that hits the limit is reported as needing
    /// reconciliation, since the transfer may still settle.
    pub confirmation_timeout: Option<Duration>,
}

/// Main service configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// JSON snapshot file holding the coupons.
    pub data_file: PathBuf,
    /// Batch issuance bounds.
    pub batch_limits: BatchLimits,
    /// Lock configuration.
    pub lock_config: LockConfig,
    /// Redemption configuration.
    pub redemption_config: RedemptionConfig,
    /// Log level.
    pub log_level: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/coupons.json"),
            batch_limits: BatchLimits::default(),
            lock_config: LockConfig::default(),
            redemption_config: RedemptionConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from environment variables.
    ///
    /// A variable that is set but cannot be parsed is an error.
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(path) = lookup("COUPON_DATA_FILE") {
            config.data_file = PathBuf::from(path);
        }

        if let Some(raw) = lookup("COUPON_CONFIRMATION_TIMEOUT_SECS") {
            config.redemption_config.confirmation_timeout =
                Some(parse_secs("COUPON_CONFIRMATION_TIMEOUT_SECS", &raw)?);
        }

        if let Some(raw) = lookup("COUPON_LOCK_WAIT_SECS") {
            config.lock_config.coupon_wait_timeout = parse_secs("COUPON_LOCK_WAIT_SECS", &raw)?;
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.data_file.as_os_str().is_empty() {
            return Err("Data file path cannot be empty".to_string());
        }

        if self.batch_limits.max_batch_size == 0 {
            return Err("Maximum batch size cannot be 0".to_string());
        }

        if self.batch_limits.min_unit_value <= Decimal::ZERO {
            return Err("Minimum coupon value must be positive".to_string());
        }

        if self.lock_config.coupon_wait_timeout.is_zero() {
            return Err("Coupon lock wait timeout cannot be zero".to_string());
        }

        if self
            .redemption_config
            .confirmation_timeout
            .is_some_and(|t| t.is_zero())
        {
            return Err("Confirmation timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration, String> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| format!("{name} must be a whole number of seconds, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_limits.max_batch_size, 10_000);
        assert_eq!(config.batch_limits.min_unit_value.to_string(), "0.000001");
    }

    #[test]
    fn test_invalid_config() {
        let mut config = CoordinatorConfig::default();
        config.batch_limits.min_unit_value = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = CoordinatorConfig::default();
        config.redemption_config.confirmation_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_from_vars() {
        let config = CoordinatorConfig::from_vars(vars(&[
            ("COUPON_DATA_FILE", "/var/lib/coupons/coupons.json"),
            ("COUPON_CONFIRMATION_TIMEOUT_SECS", "90"),
            ("COUPON_LOCK_WAIT_SECS", " 30 "),
        ]))
        .unwrap();

        assert_eq!(config.data_file, PathBuf::from("/var/lib/coupons/coupons.json"));
        assert_eq!(
            config.redemption_config.confirmation_timeout,
            Some(Duration::from_secs(90))
        );
        assert_eq!(config.lock_config.coupon_wait_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unparsable_duration_is_rejected() {
        let err = CoordinatorConfig::from_vars(vars(&[(
            "COUPON_CONFIRMATION_TIMEOUT_SECS",
            "90s",
        )]))
        .unwrap_err();
        assert!(err.contains("COUPON_CONFIRMATION_TIMEOUT_SECS"));

        assert!(
            CoordinatorConfig::from_vars(vars(&[("COUPON_LOCK_WAIT_SECS", "-1")])).is_err()
        );

        let config = CoordinatorConfig::from_vars(vars(&[])).unwrap();
        assert!(config.redemption_config.confirmation_timeout.is_none());
    }
}
