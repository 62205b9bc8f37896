//! Initialize command implementation

use crate::commands::CommandContext;
use crate::utils::parse_pubkey;
use anyhow::Result;
use perp_ops_sdk::{run_admin_operation, transaction_builder, OpsError, OpsSigner};
use tracing::info;

/// Execute the initialize command
///
/// Creates the global state account with the signer as admin.
///
/// # Errors
/// Returns an error if the state already exists, the quote mint is invalid, or the
/// transaction fails at any workflow step
pub async fn execute(ctx: &CommandContext, quote_asset_mint_str: &str) -> Result<String> {
    info!("Starting protocol initialization");

    let signer = ctx.signer()?;
    let admin = signer.pubkey();
    let quote_asset_mint = parse_pubkey("quote asset mint", quote_asset_mint_str)?;

    let state_address = ctx.client.state_address();
    let program_id = *ctx.client.program_id();
    let check = ctx.client.admin_is(admin);
    let report = run_admin_operation(
        &ctx.client,
        ctx.subscriber(&[]),
        &signer,
        |session| {
            if session.snapshot(&state_address).is_some() {
                return Err(OpsError::Validation(format!(
                    "Global state already exists at address: {state_address}"
                )));
            }
            let instruction = transaction_builder::initialize()
                .admin(admin)
                .quote_asset_mint(quote_asset_mint)
                .program_id(program_id)
                .build_instruction()?;
            Ok(ctx.with_memo(vec![instruction]))
        },
        Some(&check),
    )
    .await?;

    info!("Transaction confirmed: {}", report.signature);

    Ok(format!(
        "Protocol initialized successfully!\nState: {state_address}\nAdmin: {admin}\nQuote asset mint: {quote_asset_mint}\nVerified: {}\nTransaction signature: {}",
        report.verified_state.unwrap_or_default(),
        report.signature
    ))
}
