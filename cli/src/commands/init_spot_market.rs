//! Init spot market command implementation

use crate::commands::CommandContext;
use crate::utils::{format_weight, parse_pubkey};
use anyhow::{anyhow, Result};
use clap::Args;
use perp_ops_sdk::{
    encode_name, transaction_builder, validation::validate_spot_market_args, AdminSession,
    AssetTier, AuthorityCheck, InitializeSpotMarketArgs, OpsSigner, OracleSource,
};
use tracing::info;

/// Parameters for a new spot market
///
/// Numeric values are precision-scaled integers and are passed to the program as given.
#[derive(Args, Debug, Clone)]
pub struct InitSpotMarketOpts {
    /// Token mint of the market
    #[arg(long)]
    pub mint: String,

    /// Price oracle account
    #[arg(long)]
    pub oracle: String,

    /// Oracle source (e.g. pyth-pull, switchboard-on-demand, quote-asset)
    #[arg(long, default_value = "pyth-pull")]
    pub oracle_source: OracleSource,

    /// Market name (at most 32 bytes)
    #[arg(long)]
    pub name: String,

    /// Utilization at the borrow-curve kink (1_000_000 = 100%)
    #[arg(long, default_value = "800000")]
    pub optimal_utilization: u32,

    /// Borrow rate at optimal utilization (1_000_000 = 100%)
    #[arg(long, default_value = "100000")]
    pub optimal_borrow_rate: u32,

    /// Borrow rate at full utilization (1_000_000 = 100%)
    #[arg(long, default_value = "1000000")]
    pub max_borrow_rate: u32,

    /// Initial asset weight (10_000 = 1.0)
    #[arg(long, default_value = "8000")]
    pub initial_asset_weight: u32,

    /// Maintenance asset weight (10_000 = 1.0)
    #[arg(long, default_value = "9000")]
    pub maintenance_asset_weight: u32,

    /// Initial liability weight (10_000 = 1.0)
    #[arg(long, default_value = "12000")]
    pub initial_liability_weight: u32,

    /// Maintenance liability weight (10_000 = 1.0)
    #[arg(long, default_value = "11000")]
    pub maintenance_liability_weight: u32,

    /// Initial margin fraction factor
    #[arg(long, default_value = "0")]
    pub imf_factor: u32,

    /// Liquidator fee (1_000_000 = 100%)
    #[arg(long, default_value = "10000")]
    pub liquidator_fee: u32,

    /// Insurance fund liquidation fee (1_000_000 = 100%)
    #[arg(long, default_value = "10000")]
    pub if_liquidation_fee: u32,

    /// Create the market paused
    #[arg(long)]
    pub inactive: bool,

    /// Asset tier (collateral, protected, cross, isolated, unlisted)
    #[arg(long, default_value = "collateral")]
    pub asset_tier: AssetTier,

    /// Deposits above which the initial asset weight scales down
    #[arg(long, default_value = "0")]
    pub scale_initial_asset_weight_start: u64,

    /// Withdrawal amount below which the withdraw guard is not enforced
    #[arg(long, default_value = "0")]
    pub withdraw_guard_threshold: u64,

    /// Order tick size (price precision)
    #[arg(long, default_value = "100")]
    pub order_tick_size: u64,

    /// Order step size (token precision)
    #[arg(long, default_value = "1000000")]
    pub order_step_size: u64,

    /// Insurance fund share of borrow interest (1_000_000 = 100%)
    #[arg(long, default_value = "0")]
    pub if_total_factor: u32,
}

impl InitSpotMarketOpts {
    /// Convert into program arguments
    ///
    /// # Errors
    /// Returns an error if the name is too long
    pub fn to_args(&self) -> Result<InitializeSpotMarketArgs> {
        Ok(InitializeSpotMarketArgs {
            optimal_utilization: self.optimal_utilization,
            optimal_borrow_rate: self.optimal_borrow_rate,
            max_borrow_rate: self.max_borrow_rate,
            oracle_source: self.oracle_source,
            initial_asset_weight: self.initial_asset_weight,
            maintenance_asset_weight: self.maintenance_asset_weight,
            initial_liability_weight: self.initial_liability_weight,
            maintenance_liability_weight: self.maintenance_liability_weight,
            imf_factor: self.imf_factor,
            liquidator_fee: self.liquidator_fee,
            if_liquidation_fee: self.if_liquidation_fee,
            active_status: !self.inactive,
            asset_tier: self.asset_tier,
            scale_initial_asset_weight_start: self.scale_initial_asset_weight_start,
            withdraw_guard_threshold: self.withdraw_guard_threshold,
            order_tick_size: self.order_tick_size,
            order_step_size: self.order_step_size,
            if_total_factor: self.if_total_factor,
            name: encode_name(&self.name)?,
        })
    }
}

/// Execute the init spot market command
///
/// # Errors
/// Returns an error if parameters fail local validation, the state does not exist,
/// or the transaction fails at any workflow step
pub async fn execute(ctx: &CommandContext, opts: &InitSpotMarketOpts) -> Result<String> {
    info!("Starting spot market initialization");

    let signer = ctx.signer()?;
    let mint = parse_pubkey("mint", &opts.mint)?;
    let oracle = parse_pubkey("oracle", &opts.oracle)?;

    // Reject bad parameters before touching the network
    let args = opts.to_args()?;
    validate_spot_market_args(&args)?;

    let market_index = ctx
        .client
        .next_spot_market_index(ctx.config.max_market_probe)
        .await?;
    info!("Creating spot market {} ({})", market_index, opts.name);

    let session = AdminSession::open(&ctx.client, ctx.subscriber(&[])).await?;
    if session.check_admin(&signer.pubkey()) == AuthorityCheck::StateMissing {
        session.close();
        return Err(anyhow!(
            "Global state not found at {}; run `initialize` first",
            ctx.client.state_address()
        ));
    }

    let outcome = async {
        let instruction = transaction_builder::initialize_spot_market()
            .admin(signer.pubkey())
            .market_index(market_index)
            .mint(mint)
            .oracle(oracle)
            .args(args)
            .program_id(*ctx.client.program_id())
            .build_instruction()?;
        let check = ctx.client.spot_market_created(market_index, mint);
        session
            .execute(&ctx.with_memo(vec![instruction]), &signer, Some(&check))
            .await
    }
    .await;
    session.close();
    let report = outcome?;

    info!("Transaction confirmed: {}", report.signature);

    Ok(format!(
        "Spot market created successfully!\nMarket index: {market_index}\nName: {}\nMint: {mint}\nOracle: {oracle} ({})\nAsset weights: {} initial / {} maintenance\nLiability weights: {} initial / {} maintenance\nVerified: {}\nTransaction signature: {}",
        opts.name,
        opts.oracle_source,
        format_weight(opts.initial_asset_weight),
        format_weight(opts.maintenance_asset_weight),
        format_weight(opts.initial_liability_weight),
        format_weight(opts.maintenance_liability_weight),
        report.verified_state.unwrap_or_default(),
        report.signature
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        opts: InitSpotMarketOpts,
    }

    fn parse(extra: &[&str]) -> InitSpotMarketOpts {
        let mint = perp_ops_sdk::solana_sdk::pubkey::Pubkey::new_unique().to_string();
        let oracle = perp_ops_sdk::solana_sdk::pubkey::Pubkey::new_unique().to_string();
        let mut argv = vec![
            "test",
            "--mint",
            mint.as_str(),
            "--oracle",
            oracle.as_str(),
            "--name",
            "SOL",
        ];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().opts
    }

    #[test]
    fn test_defaults_pass_validation() {
        let args = parse(&[]).to_args().unwrap();
        assert!(validate_spot_market_args(&args).is_ok());
        assert!(args.active_status);
        assert_eq!(args.oracle_source, OracleSource::PythPull);
        assert_eq!(args.asset_tier, AssetTier::Collateral);
    }

    #[test]
    fn test_overweight_is_rejected() {
        let args = parse(&["--maintenance-asset-weight", "12000"])
            .to_args()
            .unwrap();
        let err = validate_spot_market_args(&args).unwrap_err();
        assert!(err.to_string().contains("maintenance_asset_weight"));
    }

    #[test]
    fn test_enum_flags_parse() {
        let opts = parse(&[
            "--oracle-source",
            "switchboard-on-demand",
            "--asset-tier",
            "isolated",
            "--inactive",
        ]);
        let args = opts.to_args().unwrap();
        assert_eq!(args.oracle_source, OracleSource::SwitchboardOnDemand);
        assert_eq!(args.asset_tier, AssetTier::Isolated);
        assert!(!args.active_status);
    }
}
