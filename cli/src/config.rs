//! Configuration management for the perp-ops CLI
//!
//! Presentation settings only; connection and signer settings live in the
//! SDK's `OpsConfig`.

use perp_ops_sdk::{OpsConfig, BASE_PRECISION, PRICE_PRECISION};
use std::env;

pub const OUTPUT_FORMAT_VAR: &str = "OUTPUT_FORMAT";
pub const MAX_MARKET_PROBE_VAR: &str = "MAX_MARKET_PROBE";

/// Centralized configuration for the perp-ops CLI
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Default output format for CLI commands
    pub default_output_format: String,

    /// Divisor converting on-chain prices to display units
    pub price_precision: u64,

    /// Divisor converting base asset amounts to display units
    pub base_precision: u64,

    /// Highest market index probed when discovering markets
    pub max_market_probe: u16,
}

impl CliConfig {
    /// Create a new configuration instance with values from environment variables
    /// or sensible defaults if not set
    #[must_use]
    pub fn new() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            default_output_format: lookup(OUTPUT_FORMAT_VAR).unwrap_or_else(|| "human".to_string()),

            price_precision: lookup("PRICE_PRECISION")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(PRICE_PRECISION),

            base_precision: lookup("BASE_PRECISION")
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0)
                .unwrap_or(BASE_PRECISION),

            max_market_probe: lookup(MAX_MARKET_PROBE_VAR)
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(64),
        }
    }

    /// Convert a precision-scaled price to display units
    #[allow(clippy::cast_precision_loss)] // Acceptable for display formatting
    #[must_use]
    pub fn format_price(&self, price: u64) -> f64 {
        price as f64 / self.price_precision as f64
    }

    /// Convert a precision-scaled base amount to display units
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn format_base(&self, amount: u64) -> f64 {
        amount as f64 / self.base_precision as f64
    }
}

/// Resolve protocol settings, letting command-line `overrides` win over `lookup`
///
/// # Errors
/// Returns an error if a required setting is missing or a value is malformed
pub fn resolve_ops_config<F>(
    overrides: &[(&str, String)],
    lookup: F,
) -> perp_ops_sdk::Result<OpsConfig>
where
    F: Fn(&str) -> Option<String>,
{
    OpsConfig::from_lookup(|key| {
        overrides
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.clone())
            .or_else(|| lookup(key))
    })
}

impl Default for CliConfig {
    fn default() -> Self {
        Self::new()
    }
}
