//! Output formatting utilities for the perp-ops CLI

use anyhow::{anyhow, Result};
use perp_ops_sdk::solana_sdk::pubkey::Pubkey;
use perp_ops_sdk::{PerpMarketHeader, SpotMarketHeader, StateHeader, SPOT_WEIGHT_PRECISION};
use serde::Serialize;
use std::fmt::Write;
use std::str::FromStr;

/// Global state for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateInfo {
    pub address: String,
    pub admin: String,
    pub whitelist_mint: Option<String>,
    pub discount_mint: Option<String>,
    pub signer: String,
}

/// Spot market for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotMarketInfo {
    pub market_index: u16,
    pub name: String,
    pub address: String,
    pub mint: String,
    pub oracle: String,
    pub vault: String,
}

/// Perp market for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerpMarketInfo {
    pub market_index: u16,
    pub address: String,
    pub oracle: String,
}

/// Read-only snapshot of the protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    pub program_id: String,
    pub state: Option<StateInfo>,
    pub spot_markets: Vec<SpotMarketInfo>,
    pub perp_markets: Vec<PerpMarketInfo>,
}

impl StateInfo {
    #[must_use]
    pub fn new(address: &Pubkey, state: &StateHeader) -> Self {
        Self {
            address: address.to_string(),
            admin: state.admin.to_string(),
            whitelist_mint: optional_key(&state.whitelist_mint),
            discount_mint: optional_key(&state.discount_mint),
            signer: state.signer.to_string(),
        }
    }
}

impl SpotMarketInfo {
    #[must_use]
    pub fn new(market_index: u16, market: &SpotMarketHeader) -> Self {
        Self {
            market_index,
            name: market.name.clone(),
            address: market.pubkey.to_string(),
            mint: market.mint.to_string(),
            oracle: market.oracle.to_string(),
            vault: market.vault.to_string(),
        }
    }
}

impl PerpMarketInfo {
    #[must_use]
    pub fn new(market_index: u16, market: &PerpMarketHeader) -> Self {
        Self {
            market_index,
            address: market.pubkey.to_string(),
            oracle: market.oracle.to_string(),
        }
    }
}

/// `None` for the all-zero key the program uses for "disabled"
fn optional_key(key: &Pubkey) -> Option<String> {
    (*key != Pubkey::default()).then(|| key.to_string())
}

/// Format an inspection for human-readable output
#[must_use]
pub fn format_inspection_human(inspection: &Inspection) -> String {
    let mut output = format!("Program: {}\n\n", inspection.program_id);

    match &inspection.state {
        Some(state) => {
            let _ = writeln!(output, "State:          {}", state.address);
            let _ = writeln!(output, "Admin:          {}", state.admin);
            let _ = writeln!(
                output,
                "Whitelist mint: {}",
                state.whitelist_mint.as_deref().unwrap_or("disabled")
            );
            let _ = writeln!(
                output,
                "Discount mint:  {}",
                state.discount_mint.as_deref().unwrap_or("disabled")
            );
            let _ = writeln!(output, "Program signer: {}", state.signer);
        }
        None => output.push_str("State: not initialized\n"),
    }

    output.push_str("\nSpot markets:\n");
    if inspection.spot_markets.is_empty() {
        output.push_str("  (none)\n");
    } else {
        let _ = writeln!(
            output,
            "  {:<6} {:<12} {:<44} {:<44} {:<44}",
            "Index", "Name", "Mint", "Oracle", "Address"
        );
        output.push_str(&"-".repeat(156));
        output.push('\n');
        for market in &inspection.spot_markets {
            let _ = writeln!(
                output,
                "  {:<6} {:<12} {:<44} {:<44} {}",
                market.market_index, market.name, market.mint, market.oracle, market.address
            );
        }
    }

    output.push_str("\nPerp markets:\n");
    if inspection.perp_markets.is_empty() {
        output.push_str("  (none)\n");
    } else {
        let _ = writeln!(output, "  {:<6} {:<44} {:<44}", "Index", "Oracle", "Address");
        output.push_str(&"-".repeat(98));
        output.push('\n');
        for market in &inspection.perp_markets {
            let _ = writeln!(
                output,
                "  {:<6} {:<44} {}",
                market.market_index, market.oracle, market.address
            );
        }
    }

    let _ = write!(
        output,
        "\nTotal: {} spot, {} perp",
        inspection.spot_markets.len(),
        inspection.perp_markets.len()
    );
    output
}

/// Format an inspection for JSON output
///
/// # Errors
///
/// Returns an error if JSON serialization fails
pub fn format_inspection_json(inspection: &Inspection) -> Result<String> {
    serde_json::to_string_pretty(inspection)
        .map_err(|e| anyhow!("Failed to serialize inspection to JSON: {e}"))
}

/// Render a spot weight as a ratio, e.g. `8000` -> `0.8000`
#[must_use]
pub fn format_weight(weight: u32) -> String {
    let whole = weight.checked_div(SPOT_WEIGHT_PRECISION).unwrap_or(0);
    let fraction = weight.checked_rem(SPOT_WEIGHT_PRECISION).unwrap_or(0);
    format!("{whole}.{fraction:04}")
}

/// Parse a base58 address, naming the argument on failure
///
/// # Errors
///
/// Returns an error if the value is not a valid address
pub fn parse_pubkey(label: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|e| anyhow!("Invalid {label} address '{value}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_inspection() -> Inspection {
        Inspection {
            program_id: Pubkey::new_unique().to_string(),
            state: Some(StateInfo::new(
                &Pubkey::new_unique(),
                &StateHeader {
                    admin: Pubkey::new_unique(),
                    whitelist_mint: Pubkey::default(),
                    discount_mint: Pubkey::new_unique(),
                    signer: Pubkey::new_unique(),
                },
            )),
            spot_markets: vec![SpotMarketInfo::new(
                0,
                &SpotMarketHeader {
                    pubkey: Pubkey::new_unique(),
                    oracle: Pubkey::new_unique(),
                    mint: Pubkey::new_unique(),
                    vault: Pubkey::new_unique(),
                    name: "USDC".to_string(),
                },
            )],
            perp_markets: Vec::new(),
        }
    }

    #[test]
    fn test_format_inspection_human() {
        let inspection = sample_inspection();
        let output = format_inspection_human(&inspection);

        assert!(output.contains("Whitelist mint: disabled"));
        assert!(output.contains("USDC"));
        assert!(output.contains("Perp markets:\n  (none)"));
        assert!(output.ends_with("Total: 1 spot, 0 perp"));
        // same input renders identically
        assert_eq!(output, format_inspection_human(&inspection));
    }

    #[test]
    fn test_format_inspection_uninitialized() {
        let inspection = Inspection {
            program_id: Pubkey::new_unique().to_string(),
            state: None,
            spot_markets: Vec::new(),
            perp_markets: Vec::new(),
        };
        assert!(format_inspection_human(&inspection).contains("State: not initialized"));
    }

    #[test]
    fn test_format_inspection_json() {
        let inspection = sample_inspection();
        let json: serde_json::Value =
            serde_json::from_str(&format_inspection_json(&inspection).unwrap()).unwrap();

        assert_eq!(json["spot_markets"][0]["name"], "USDC");
        assert!(json["state"]["whitelist_mint"].is_null());
        assert!(json["perp_markets"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(8_000), "0.8000");
        assert_eq!(format_weight(10_000), "1.0000");
        assert_eq!(format_weight(12_500), "1.2500");
    }

    #[test]
    fn test_parse_pubkey() {
        let key = Pubkey::new_unique();
        assert_eq!(parse_pubkey("mint", &key.to_string()).unwrap(), key);

        let err = parse_pubkey("oracle", "not-a-key").unwrap_err();
        assert!(err.to_string().contains("Invalid oracle address 'not-a-key'"));
    }
}
