//! Policy configuration.
//!
//! Approval thresholds, overdraft tolerance, RPC timeouts and the FX rate
//! registry are policy parameters rather than business constants. They load
//! from a TOML file, fall back to defaults per field, and can be overridden
//! from the environment.

use crate::domain::rates::RateBook;
use crate::error::{Result, TellerError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Officer rates closer than this to the offered rate are treated as unchanged.
    pub rate_epsilon: Decimal,
    /// Transfers and bill payments at or above this amount need a supervisor.
    pub high_value_payment_threshold: Decimal,
    /// POS limits above this amount need a supervisor.
    pub card_limit_approval_threshold: Decimal,
    pub overdraft_limit_approval_threshold: Decimal,
    /// Cap on how far a debit may overdraw an account, whatever its own limit.
    pub max_overdraft_shortfall: Decimal,
    pub verification_timeout_ms: u64,
    pub advisory_timeout_ms: u64,
    pub rates: RateBook,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rate_epsilon: dec!(0.0001),
            high_value_payment_threshold: dec!(1000000),
            card_limit_approval_threshold: dec!(500000),
            overdraft_limit_approval_threshold: dec!(200000),
            max_overdraft_shortfall: dec!(100000),
            verification_timeout_ms: 3000,
            advisory_timeout_ms: 5000,
            rates: RateBook::standard(),
        }
    }
}

fn env_decimal(name: &str) -> Option<Decimal> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

impl PolicyConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| TellerError::ConfigError(e.to_string()))
    }

    /// Applies `TELLER_*` environment variable overrides.
    pub fn with_env_override(mut self) -> Self {
        if let Some(v) = env_decimal("TELLER_RATE_EPSILON") {
            self.rate_epsilon = v;
        }
        if let Some(v) = env_decimal("TELLER_HIGH_VALUE_PAYMENT_THRESHOLD") {
            self.high_value_payment_threshold = v;
        }
        if let Some(v) = env_decimal("TELLER_CARD_LIMIT_APPROVAL_THRESHOLD") {
            self.card_limit_approval_threshold = v;
        }
        if let Some(v) = env_decimal("TELLER_OVERDRAFT_LIMIT_APPROVAL_THRESHOLD") {
            self.overdraft_limit_approval_threshold = v;
        }
        if let Some(v) = env_decimal("TELLER_MAX_OVERDRAFT_SHORTFALL") {
            self.max_overdraft_shortfall = v;
        }
        if let Some(v) = env_u64("TELLER_VERIFICATION_TIMEOUT_MS") {
            self.verification_timeout_ms = v;
        }
        if let Some(v) = env_u64("TELLER_ADVISORY_TIMEOUT_MS") {
            self.advisory_timeout_ms = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.rate_epsilon < Decimal::ZERO {
            errors.push("rate_epsilon must not be negative".to_string());
        }
        for (name, value) in [
            ("high_value_payment_threshold", self.high_value_payment_threshold),
            ("card_limit_approval_threshold", self.card_limit_approval_threshold),
            ("overdraft_limit_approval_threshold", self.overdraft_limit_approval_threshold),
        ] {
            if value <= Decimal::ZERO {
                errors.push(format!("{name} must be positive"));
            }
        }
        if self.max_overdraft_shortfall < Decimal::ZERO {
            errors.push("max_overdraft_shortfall must not be negative".to_string());
        }
        if self.verification_timeout_ms == 0 || self.advisory_timeout_ms == 0 {
            errors.push("timeouts must be greater than zero".to_string());
        }
        if self.rates.pairs().is_empty() {
            errors.push("at least one currency pair must be configured".to_string());
        }
        for pair in self.rates.pairs() {
            if pair.mid <= Decimal::ZERO || pair.base_spread_bps < Decimal::ZERO {
                errors.push(format!("invalid rate entry for {}", pair.pair));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TellerError::ConfigError(errors.join("; ")))
        }
    }

    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }

    pub fn advisory_timeout(&self) -> Duration {
        Duration::from_millis(self.advisory_timeout_ms)
    }
}
