//! Place perp order command implementation

use crate::commands::CommandContext;
use anyhow::Result;
use clap::Args;
use perp_ops_sdk::{
    pda, run_admin_operation, transaction_builder, validation::validate_order_params, MarketType,
    OpsError, OpsSigner, OrderParams, OrderType, PositionDirection, PostOnlyParam,
};
use tracing::info;

/// Order parameters; amounts and prices are precision-scaled integers
#[derive(Args, Debug, Clone)]
pub struct PlacePerpOrderOpts {
    /// Perp market index
    #[arg(long)]
    pub market_index: u16,

    /// long or short
    #[arg(long)]
    pub direction: PositionDirection,

    /// Base asset amount (1e9 precision)
    #[arg(long)]
    pub base_amount: u64,

    /// Limit price (1e6 precision); zero for market orders
    #[arg(long, default_value = "0")]
    pub price: u64,

    /// Order type (market, limit, trigger-market, trigger-limit, oracle)
    #[arg(long, default_value = "limit")]
    pub order_type: OrderType,

    /// Post-only behaviour (none, must-post-only, try-post-only, slide)
    #[arg(long, default_value = "none")]
    pub post_only: PostOnlyParam,

    /// Only reduce an existing position
    #[arg(long)]
    pub reduce_only: bool,

    /// Cancel whatever does not fill immediately
    #[arg(long)]
    pub immediate_or_cancel: bool,

    /// Offset from the oracle price (1e6 precision) for oracle-pegged orders
    #[arg(long, allow_hyphen_values = true)]
    pub oracle_price_offset: Option<i32>,

    /// Client-side order id
    #[arg(long, default_value = "0")]
    pub user_order_id: u8,

    /// Sub-account placing the order
    #[arg(long, default_value = "0")]
    pub sub_account_id: u16,
}

impl PlacePerpOrderOpts {
    #[must_use]
    pub fn to_params(&self) -> OrderParams {
        OrderParams {
            order_type: self.order_type,
            market_type: MarketType::Perp,
            direction: self.direction,
            user_order_id: self.user_order_id,
            base_asset_amount: self.base_amount,
            price: self.price,
            market_index: self.market_index,
            reduce_only: self.reduce_only,
            post_only: self.post_only,
            immediate_or_cancel: self.immediate_or_cancel,
            oracle_price_offset: self.oracle_price_offset,
            ..OrderParams::default()
        }
    }
}

/// Execute the place perp order command
///
/// # Errors
/// Returns an error if the order fails local checks, the user or market does not
/// exist, or the transaction fails at any workflow step
pub async fn execute(ctx: &CommandContext, opts: &PlacePerpOrderOpts) -> Result<String> {
    info!("Starting perp order placement");

    let signer = ctx.signer()?;
    let authority = signer.pubkey();
    let params = opts.to_params();
    validate_order_params(&params)?;

    let program_id = *ctx.client.program_id();
    let user_address = pda::user_address(&authority, opts.sub_account_id, &program_id);
    let perp_market_address = pda::perp_market_address(opts.market_index, &program_id);
    let quote_market_address = pda::spot_market_address(0, &program_id);
    let report = run_admin_operation(
        &ctx.client,
        ctx.subscriber(&[user_address, perp_market_address, quote_market_address]),
        &signer,
        |session| {
            if !session.user_in_snapshot(&authority, opts.sub_account_id)? {
                return Err(OpsError::Validation(format!(
                    "User account {} not found for {authority}; run `init-user` first",
                    opts.sub_account_id
                )));
            }
            let perp_market = session.perp_market_snapshot(opts.market_index)?;
            let quote_market = session.spot_market_snapshot(0)?;

            let instruction = transaction_builder::place_perp_order()
                .authority(authority)
                .sub_account_id(opts.sub_account_id)
                .params(params)
                .perp_market_oracle(perp_market.oracle)
                .quote_spot_market_oracle(quote_market.oracle)
                .program_id(program_id)
                .build_instruction()?;
            Ok(ctx.with_memo(vec![instruction]))
        },
        None,
    )
    .await?;

    info!("Transaction confirmed: {}", report.signature);

    let side = match opts.direction {
        PositionDirection::Long => "Long",
        PositionDirection::Short => "Short",
    };
    Ok(format!(
        "Perp order placed successfully!\nMarket index: {}\nSide: {side}\nType: {}\nSize: {:.9}\nPrice: {:.6}\nUser: {user_address}\nTransaction signature: {}",
        opts.market_index,
        opts.order_type,
        ctx.config.format_base(opts.base_amount),
        ctx.config.format_price(opts.price),
        report.signature
    ))
}
