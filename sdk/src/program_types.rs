//! Program account views, instruction arguments and precision constants
//!
//! The protocol program owns these layouts. Only the fields administrative
//! tooling needs are decoded; everything else is left alone.

use crate::error::{OpsError, Result};
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prices are scaled by 1e6
pub const PRICE_PRECISION: u64 = 1_000_000;
/// Quote amounts are scaled by 1e6
pub const QUOTE_PRECISION: u64 = 1_000_000;
/// Base asset amounts are scaled by 1e9
pub const BASE_PRECISION: u64 = 1_000_000_000;
/// AMM reserves are scaled by 1e9
pub const AMM_RESERVE_PRECISION: u128 = 1_000_000_000;
/// Peg multiplier is scaled by 1e6
pub const PEG_PRECISION: u128 = 1_000_000;
/// Spot asset/liability weights: 10_000 == 1.0
pub const SPOT_WEIGHT_PRECISION: u32 = 10_000;
/// Perp margin ratios: 10_000 == 100%
pub const MARGIN_PRECISION: u32 = 10_000;
/// Spot utilization: 1_000_000 == 100%
pub const SPOT_UTILIZATION_PRECISION: u32 = 1_000_000;
/// Spot borrow rates: 1_000_000 == 100%
pub const SPOT_RATE_PRECISION: u32 = 1_000_000;
/// Liquidation fees: 1_000_000 == 100%
pub const LIQUIDATION_FEE_PRECISION: u32 = 1_000_000;
/// Insurance fund factors: 1_000_000 == 100%
pub const IF_FACTOR_PRECISION: u32 = 1_000_000;

/// Length of on-chain names
pub const NAME_LENGTH: usize = 32;

/// Anchor account discriminators (`sha256("account:<Name>")[..8]`)
pub const STATE_DISCRIMINATOR: [u8; 8] = [216, 146, 107, 94, 104, 75, 182, 177];
pub const PERP_MARKET_DISCRIMINATOR: [u8; 8] = [10, 223, 12, 44, 107, 245, 55, 247];
pub const SPOT_MARKET_DISCRIMINATOR: [u8; 8] = [100, 177, 8, 107, 168, 65, 65, 39];
pub const USER_DISCRIMINATOR: [u8; 8] = [159, 117, 95, 227, 239, 151, 58, 236];
pub const USER_STATS_DISCRIMINATOR: [u8; 8] = [176, 223, 136, 27, 122, 79, 32, 227];

/// Encode a display name into the fixed-width, space-padded on-chain form
///
/// # Errors
/// Returns a validation error if the name is longer than 32 bytes
pub fn encode_name(name: &str) -> Result<[u8; NAME_LENGTH]> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_LENGTH {
        return Err(OpsError::Validation(format!(
            "Name '{name}' is {} bytes; the maximum is {NAME_LENGTH}",
            bytes.len()
        )));
    }

    let mut encoded = [b' '; NAME_LENGTH];
    encoded[..bytes.len()].copy_from_slice(bytes);
    Ok(encoded)
}

/// Decode a fixed-width on-chain name, trimming padding
#[must_use]
pub fn decode_name(name: &[u8; NAME_LENGTH]) -> String {
    String::from_utf8_lossy(name)
        .trim_end_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

fn check_discriminator(data: &[u8], expected: &[u8; 8], kind: &str) -> Result<()> {
    match data.get(..8) {
        Some(found) if found == expected => Ok(()),
        Some(_) => Err(OpsError::Deserialize(format!(
            "{kind} account discriminator mismatch"
        ))),
        None => Err(OpsError::Deserialize(format!(
            "{kind} account data too short ({} bytes)",
            data.len()
        ))),
    }
}

fn pubkey_at(data: &[u8], offset: usize, kind: &str) -> Result<Pubkey> {
    let end = offset.saturating_add(32);
    data.get(offset..end)
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .map(Pubkey::new_from_array)
        .ok_or_else(|| {
            OpsError::Deserialize(format!(
                "{kind} account data too short ({} bytes) for field at offset {offset}",
                data.len()
            ))
        })
}

/// Leading fields of the global state account
///
/// Borsh prefix following the 8-byte discriminator.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub struct StateHeader {
    /// Privileged address allowed to configure the protocol
    pub admin: Pubkey,
    /// Mint gating user creation (default pubkey when disabled)
    pub whitelist_mint: Pubkey,
    /// Mint granting fee discounts (default pubkey when disabled)
    pub discount_mint: Pubkey,
    /// Program signer PDA
    pub signer: Pubkey,
}

impl StateHeader {
    /// Decode from raw account data
    ///
    /// # Errors
    /// Returns an error if the discriminator or length does not match
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_discriminator(data, &STATE_DISCRIMINATOR, "State")?;
        let mut body = &data[8..];
        <Self as AnchorDeserialize>::deserialize(&mut body)
            .map_err(|e| OpsError::Deserialize(format!("State header: {e}")))
    }
}

/// Leading fields of a perp market account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpMarketHeader {
    /// Market account address as recorded on-chain
    pub pubkey: Pubkey,
    /// Price oracle feeding the AMM
    pub oracle: Pubkey,
}

impl PerpMarketHeader {
    const PUBKEY_OFFSET: usize = 8;
    const ORACLE_OFFSET: usize = 40;

    /// Decode from raw account data
    ///
    /// # Errors
    /// Returns an error if the discriminator or length does not match
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_discriminator(data, &PERP_MARKET_DISCRIMINATOR, "PerpMarket")?;
        Ok(Self {
            pubkey: pubkey_at(data, Self::PUBKEY_OFFSET, "PerpMarket")?,
            oracle: pubkey_at(data, Self::ORACLE_OFFSET, "PerpMarket")?,
        })
    }
}

/// Leading fields of a spot market account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotMarketHeader {
    pub pubkey: Pubkey,
    pub oracle: Pubkey,
    pub mint: Pubkey,
    pub vault: Pubkey,
    pub name: String,
}

impl SpotMarketHeader {
    const PUBKEY_OFFSET: usize = 8;
    const ORACLE_OFFSET: usize = 40;
    const MINT_OFFSET: usize = 72;
    const VAULT_OFFSET: usize = 104;
    const NAME_OFFSET: usize = 136;

    /// Decode from raw account data
    ///
    /// # Errors
    /// Returns an error if the discriminator or length does not match
    pub fn decode(data: &[u8]) -> Result<Self> {
        check_discriminator(data, &SPOT_MARKET_DISCRIMINATOR, "SpotMarket")?;
        let name_end = Self::NAME_OFFSET.saturating_add(NAME_LENGTH);
        let name = data
            .get(Self::NAME_OFFSET..name_end)
            .and_then(|bytes| <[u8; NAME_LENGTH]>::try_from(bytes).ok())
            .ok_or_else(|| {
                OpsError::Deserialize(format!(
                    "SpotMarket account data too short ({} bytes) for name",
                    data.len()
                ))
            })?;

        Ok(Self {
            pubkey: pubkey_at(data, Self::PUBKEY_OFFSET, "SpotMarket")?,
            oracle: pubkey_at(data, Self::ORACLE_OFFSET, "SpotMarket")?,
            mint: pubkey_at(data, Self::MINT_OFFSET, "SpotMarket")?,
            vault: pubkey_at(data, Self::VAULT_OFFSET, "SpotMarket")?,
            name: decode_name(&name),
        })
    }
}

/// Check that account data is a user account
///
/// # Errors
/// Returns an error if the discriminator does not match
pub fn ensure_user_account(data: &[u8]) -> Result<()> {
    check_discriminator(data, &USER_DISCRIMINATOR, "User")
}

/// Check that account data is a user stats account
///
/// # Errors
/// Returns an error if the discriminator does not match
pub fn ensure_user_stats_account(data: &[u8]) -> Result<()> {
    check_discriminator(data, &USER_STATS_DISCRIMINATOR, "UserStats")
}

/// Implements `FromStr` and `Display` for a fieldless enum from a name table
macro_rules! named_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let normalized = s.to_lowercase().replace(['_', '-'], "");
                $(
                    if normalized == $name.replace('-', "") {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!(
                    "Invalid {} '{s}' (expected one of: {})",
                    stringify!($ty),
                    [$($name),+].join(", ")
                ))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(Self::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

/// Oracle source of a market. Variant order matches the program's encoding.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum OracleSource {
    #[default]
    Pyth,
    Switchboard,
    QuoteAsset,
    Pyth1K,
    Pyth1M,
    PythStableCoin,
    Prelaunch,
    PythPull,
    Pyth1KPull,
    Pyth1MPull,
    PythStableCoinPull,
    SwitchboardOnDemand,
    PythLazer,
}

named_enum!(OracleSource {
    Pyth => "pyth",
    Switchboard => "switchboard",
    QuoteAsset => "quote-asset",
    Pyth1K => "pyth-1k",
    Pyth1M => "pyth-1m",
    PythStableCoin => "pyth-stable-coin",
    Prelaunch => "prelaunch",
    PythPull => "pyth-pull",
    Pyth1KPull => "pyth-1k-pull",
    Pyth1MPull => "pyth-1m-pull",
    PythStableCoinPull => "pyth-stable-coin-pull",
    SwitchboardOnDemand => "switchboard-on-demand",
    PythLazer => "pyth-lazer",
});

/// Risk tier of a spot asset
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum AssetTier {
    Collateral,
    Protected,
    Cross,
    Isolated,
    #[default]
    Unlisted,
}

named_enum!(AssetTier {
    Collateral => "collateral",
    Protected => "protected",
    Cross => "cross",
    Isolated => "isolated",
    Unlisted => "unlisted",
});

/// Risk tier of a perp contract
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum ContractTier {
    A,
    B,
    C,
    #[default]
    Speculative,
    HighlySpeculative,
    Isolated,
}

named_enum!(ContractTier {
    A => "a",
    B => "b",
    C => "c",
    Speculative => "speculative",
    HighlySpeculative => "highly-speculative",
    Isolated => "isolated",
});

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum OrderType {
    Market,
    #[default]
    Limit,
    TriggerMarket,
    TriggerLimit,
    Oracle,
}

named_enum!(OrderType {
    Market => "market",
    Limit => "limit",
    TriggerMarket => "trigger-market",
    TriggerLimit => "trigger-limit",
    Oracle => "oracle",
});

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum MarketType {
    Spot,
    #[default]
    Perp,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum PositionDirection {
    #[default]
    Long,
    Short,
}

named_enum!(PositionDirection {
    Long => "long",
    Short => "short",
});

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum PostOnlyParam {
    #[default]
    None,
    MustPostOnly,
    TryPostOnly,
    Slide,
}

named_enum!(PostOnlyParam {
    None => "none",
    MustPostOnly => "must-post-only",
    TryPostOnly => "try-post-only",
    Slide => "slide",
});

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub enum OrderTriggerCondition {
    #[default]
    Above,
    Below,
    TriggeredAbove,
    TriggeredBelow,
}

/// Arguments for `update_admin`
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub struct UpdateAdminArgs {
    pub admin: Pubkey,
}

/// Arguments for `initialize_spot_market`
///
/// All values are precision-scaled integers and are forwarded as given.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub struct InitializeSpotMarketArgs {
    /// Utilization at the kink of the borrow curve (`SPOT_UTILIZATION_PRECISION`)
    pub optimal_utilization: u32,
    /// Borrow rate at optimal utilization (`SPOT_RATE_PRECISION`)
    pub optimal_borrow_rate: u32,
    /// Borrow rate at 100% utilization (`SPOT_RATE_PRECISION`)
    pub max_borrow_rate: u32,
    pub oracle_source: OracleSource,
    /// Asset weights (`SPOT_WEIGHT_PRECISION`)
    pub initial_asset_weight: u32,
    pub maintenance_asset_weight: u32,
    /// Liability weights (`SPOT_WEIGHT_PRECISION`)
    pub initial_liability_weight: u32,
    pub maintenance_liability_weight: u32,
    pub imf_factor: u32,
    /// Liquidator fee (`LIQUIDATION_FEE_PRECISION`)
    pub liquidator_fee: u32,
    /// Insurance fund liquidation fee (`LIQUIDATION_FEE_PRECISION`)
    pub if_liquidation_fee: u32,
    pub active_status: bool,
    pub asset_tier: AssetTier,
    pub scale_initial_asset_weight_start: u64,
    pub withdraw_guard_threshold: u64,
    pub order_tick_size: u64,
    pub order_step_size: u64,
    /// Insurance fund share of borrow interest (`IF_FACTOR_PRECISION`)
    pub if_total_factor: u32,
    pub name: [u8; NAME_LENGTH],
}

/// Arguments for `initialize_perp_market`
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub struct InitializePerpMarketArgs {
    pub market_index: u16,
    /// AMM reserves (`AMM_RESERVE_PRECISION`)
    pub amm_base_asset_reserve: u128,
    pub amm_quote_asset_reserve: u128,
    /// Funding period in seconds
    pub amm_periodicity: i64,
    /// Peg multiplier (`PEG_PRECISION`)
    pub amm_peg_multiplier: u128,
    pub oracle_source: OracleSource,
    pub contract_tier: ContractTier,
    /// Margin ratios (`MARGIN_PRECISION`)
    pub margin_ratio_initial: u32,
    pub margin_ratio_maintenance: u32,
    pub liquidator_fee: u32,
    pub if_liquidation_fee: u32,
    pub imf_factor: u32,
    pub active_status: bool,
    pub base_spread: u32,
    pub max_spread: u32,
    pub max_open_interest: u128,
    pub max_revenue_withdraw_per_period: u64,
    pub quote_max_insurance: u64,
    pub order_step_size: u64,
    pub order_tick_size: u64,
    pub min_order_size: u64,
    pub concentration_coef_scale: u128,
    pub curve_update_intensity: u8,
    pub amm_jit_intensity: u8,
    pub name: [u8; NAME_LENGTH],
}

/// Arguments for `initialize_user`
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub struct InitializeUserArgs {
    pub sub_account_id: u16,
    pub name: [u8; NAME_LENGTH],
}

/// Order parameters for `place_perp_order`
#[derive(
    Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, AnchorSerialize, AnchorDeserialize,
)]
pub struct OrderParams {
    pub order_type: OrderType,
    pub market_type: MarketType,
    pub direction: PositionDirection,
    pub user_order_id: u8,
    /// Base amount (`BASE_PRECISION`)
    pub base_asset_amount: u64,
    /// Limit price (`PRICE_PRECISION`); zero for market orders
    pub price: u64,
    pub market_index: u16,
    pub reduce_only: bool,
    pub post_only: PostOnlyParam,
    pub immediate_or_cancel: bool,
    pub max_ts: Option<i64>,
    pub trigger_price: Option<u64>,
    pub trigger_condition: OrderTriggerCondition,
    pub oracle_price_offset: Option<i32>,
    pub auction_duration: Option<u8>,
    pub auction_start_price: Option<i64>,
    pub auction_end_price: Option<i64>,
}
