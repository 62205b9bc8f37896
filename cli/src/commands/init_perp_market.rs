//! Init perp market command implementation

use crate::commands::CommandContext;
use crate::utils::parse_pubkey;
use anyhow::{anyhow, Result};
use clap::Args;
use perp_ops_sdk::{
    encode_name, transaction_builder, validation::validate_perp_market_args, AdminSession,
    AuthorityCheck, ContractTier, InitializePerpMarketArgs, OpsSigner, OracleSource,
};
use tracing::info;

/// Parameters for a new perp market
///
/// Numeric values are precision-scaled integers and are passed to the program as given.
#[derive(Args, Debug, Clone)]
pub struct InitPerpMarketOpts {
    /// Price oracle account
    #[arg(long)]
    pub oracle: String,

    /// Oracle source (e.g. pyth-pull, switchboard-on-demand, prelaunch)
    #[arg(long, default_value = "pyth-pull")]
    pub oracle_source: OracleSource,

    /// Market name (at most 32 bytes)
    #[arg(long)]
    pub name: String,

    /// Market index; defaults to the next free index
    #[arg(long)]
    pub market_index: Option<u16>,

    /// AMM base asset reserve (1e9 precision)
    #[arg(long, default_value = "1000000000000")]
    pub base_asset_reserve: u128,

    /// AMM quote asset reserve (1e9 precision)
    #[arg(long, default_value = "1000000000000")]
    pub quote_asset_reserve: u128,

    /// Funding period in seconds
    #[arg(long, default_value = "3600")]
    pub periodicity: i64,

    /// Peg multiplier (1e6 precision); usually the oracle price
    #[arg(long)]
    pub peg_multiplier: u128,

    /// Contract tier (a, b, c, speculative, highly-speculative, isolated)
    #[arg(long, default_value = "speculative")]
    pub contract_tier: ContractTier,

    /// Initial margin ratio (10_000 = 100%)
    #[arg(long, default_value = "2000")]
    pub margin_ratio_initial: u32,

    /// Maintenance margin ratio (10_000 = 100%)
    #[arg(long, default_value = "500")]
    pub margin_ratio_maintenance: u32,

    /// Liquidator fee (1_000_000 = 100%)
    #[arg(long, default_value = "0")]
    pub liquidator_fee: u32,

    /// Insurance fund liquidation fee (1_000_000 = 100%)
    #[arg(long, default_value = "10000")]
    pub if_liquidation_fee: u32,

    /// Initial margin fraction factor
    #[arg(long, default_value = "0")]
    pub imf_factor: u32,

    /// Create the market paused
    #[arg(long)]
    pub inactive: bool,

    /// Base spread (1e6 precision)
    #[arg(long, default_value = "0")]
    pub base_spread: u32,

    /// Maximum spread (1e6 precision)
    #[arg(long, default_value = "142500")]
    pub max_spread: u32,

    /// Open interest cap in base precision; zero disables
    #[arg(long, default_value = "0")]
    pub max_open_interest: u128,

    /// Maximum revenue withdrawn per period (quote precision)
    #[arg(long, default_value = "0")]
    pub max_revenue_withdraw_per_period: u64,

    /// Maximum insurance drawn for this market (quote precision)
    #[arg(long, default_value = "0")]
    pub quote_max_insurance: u64,

    /// Order step size (base precision)
    #[arg(long, default_value = "1000000")]
    pub order_step_size: u64,

    /// Order tick size (price precision)
    #[arg(long, default_value = "100")]
    pub order_tick_size: u64,

    /// Minimum order size (base precision)
    #[arg(long, default_value = "1000000")]
    pub min_order_size: u64,

    /// Concentration coefficient scale
    #[arg(long, default_value = "0")]
    pub concentration_coef_scale: u128,

    /// Curve update intensity (0-200)
    #[arg(long, default_value = "0")]
    pub curve_update_intensity: u8,

    /// AMM JIT intensity (0-200)
    #[arg(long, default_value = "0")]
    pub amm_jit_intensity: u8,
}

impl InitPerpMarketOpts {
    /// Convert into program arguments for `market_index`
    ///
    /// # Errors
    /// Returns an error if the name is too long
    pub fn to_args(&self, market_index: u16) -> Result<InitializePerpMarketArgs> {
        Ok(InitializePerpMarketArgs {
            market_index,
            amm_base_asset_reserve: self.base_asset_reserve,
            amm_quote_asset_reserve: self.quote_asset_reserve,
            amm_periodicity: self.periodicity,
            amm_peg_multiplier: self.peg_multiplier,
            oracle_source: self.oracle_source,
            contract_tier: self.contract_tier,
            margin_ratio_initial: self.margin_ratio_initial,
            margin_ratio_maintenance: self.margin_ratio_maintenance,
            liquidator_fee: self.liquidator_fee,
            if_liquidation_fee: self.if_liquidation_fee,
            imf_factor: self.imf_factor,
            active_status: !self.inactive,
            base_spread: self.base_spread,
            max_spread: self.max_spread,
            max_open_interest: self.max_open_interest,
            max_revenue_withdraw_per_period: self.max_revenue_withdraw_per_period,
            quote_max_insurance: self.quote_max_insurance,
            order_step_size: self.order_step_size,
            order_tick_size: self.order_tick_size,
            min_order_size: self.min_order_size,
            concentration_coef_scale: self.concentration_coef_scale,
            curve_update_intensity: self.curve_update_intensity,
            amm_jit_intensity: self.amm_jit_intensity,
            name: encode_name(&self.name)?,
        })
    }
}

/// Execute the init perp market command
///
/// # Errors
/// Returns an error if parameters fail local validation, the index is taken, the
/// state does not exist, or the transaction fails at any workflow step
pub async fn execute(ctx: &CommandContext, opts: &InitPerpMarketOpts) -> Result<String> {
    info!("Starting perp market initialization");

    let signer = ctx.signer()?;
    let oracle = parse_pubkey("oracle", &opts.oracle)?;

    // Reject bad parameters before touching the network; the index does not
    // affect validation
    validate_perp_market_args(&opts.to_args(opts.market_index.unwrap_or_default())?)?;

    let market_index = match opts.market_index {
        Some(index) => {
            let address = perp_ops_sdk::pda::perp_market_address(index, ctx.client.program_id());
            if ctx.client.account_exists(&address).await? {
                return Err(anyhow!(
                    "Perp market {index} already exists at address: {address}"
                ));
            }
            index
        }
        None => {
            ctx.client
                .next_perp_market_index(ctx.config.max_market_probe)
                .await?
        }
    };
    let args = opts.to_args(market_index)?;
    info!("Creating perp market {} ({})", market_index, opts.name);

    let session = AdminSession::open(&ctx.client, ctx.subscriber(&[])).await?;
    if session.check_admin(&signer.pubkey()) == AuthorityCheck::StateMissing {
        session.close();
        return Err(anyhow!(
            "Global state not found at {}; run `initialize` first",
            ctx.client.state_address()
        ));
    }

    let outcome = async {
        let instruction = transaction_builder::initialize_perp_market()
            .admin(signer.pubkey())
            .oracle(oracle)
            .args(args)
            .program_id(*ctx.client.program_id())
            .build_instruction()?;
        let check = ctx.client.perp_market_created(market_index, oracle);
        session
            .execute(&ctx.with_memo(vec![instruction]), &signer, Some(&check))
            .await
    }
    .await;
    session.close();
    let report = outcome?;

    info!("Transaction confirmed: {}", report.signature);

    Ok(format!(
        "Perp market created successfully!\nMarket index: {market_index}\nName: {}\nOracle: {oracle} ({})\nContract tier: {}\nMargin ratios: {} initial / {} maintenance\nVerified: {}\nTransaction signature: {}",
        opts.name,
        opts.oracle_source,
        opts.contract_tier,
        opts.margin_ratio_initial,
        opts.margin_ratio_maintenance,
        report.verified_state.unwrap_or_default(),
        report.signature
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use perp_ops_sdk::PEG_PRECISION;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        opts: InitPerpMarketOpts,
    }

    fn parse(extra: &[&str]) -> InitPerpMarketOpts {
        let oracle = perp_ops_sdk::solana_sdk::pubkey::Pubkey::new_unique().to_string();
        let mut argv = vec![
            "test",
            "--oracle",
            oracle.as_str(),
            "--name",
            "SOL-PERP",
            "--peg-multiplier",
            "150000000",
        ];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().opts
    }

    #[test]
    fn test_defaults_pass_validation() {
        let opts = parse(&[]);
        assert!(opts.market_index.is_none());

        let args = opts.to_args(4).unwrap();
        assert!(validate_perp_market_args(&args).is_ok());
        assert_eq!(args.market_index, 4);
        assert_eq!(args.amm_peg_multiplier, 150 * PEG_PRECISION);
        assert_eq!(args.contract_tier, ContractTier::Speculative);
    }

    #[test]
    fn test_inverted_margin_ratios_rejected() {
        let opts = parse(&[
            "--margin-ratio-initial",
            "500",
            "--margin-ratio-maintenance",
            "1000",
        ]);
        assert!(validate_perp_market_args(&opts.to_args(0).unwrap()).is_err());
    }

    #[test]
    fn test_peg_multiplier_is_required() {
        let oracle = perp_ops_sdk::solana_sdk::pubkey::Pubkey::new_unique().to_string();
        let result = Harness::try_parse_from(["test", "--oracle", oracle.as_str(), "--name", "X"]);
        assert!(result.is_err());
    }
}
