//! Mint devnet tokens command implementation

use crate::commands::CommandContext;
use crate::utils::parse_pubkey;
use anyhow::{anyhow, Result};
use perp_ops_sdk::{
    associated_token_address, mint_to_recipient, NetworkEnv, OpsSigner, PostCondition,
};
use tracing::info;

/// Refuse to run test-token faucets against mainnet
///
/// # Errors
/// Returns an error when `env` is mainnet-beta
pub fn ensure_test_network(env: NetworkEnv) -> Result<()> {
    if env.is_mainnet() {
        return Err(anyhow!(
            "mint-devnet-tokens is disabled on {env}; set ENV to devnet or localnet"
        ));
    }
    Ok(())
}

/// Execute the mint devnet tokens command
///
/// The signer must be the mint authority. The recipient's associated token
/// account is created if needed.
///
/// # Errors
/// Returns an error on mainnet, for a zero amount or invalid address, or if the
/// transaction fails at any workflow step
pub async fn execute(
    ctx: &CommandContext,
    mint_str: &str,
    recipient_str: Option<&str>,
    amount: u64,
) -> Result<String> {
    ensure_test_network(ctx.ops.env)?;
    info!("Starting devnet token mint on {}", ctx.ops.env);

    let mint = parse_pubkey("mint", mint_str)?;
    let signer = ctx.signer()?;
    let authority = signer.pubkey();
    let recipient = recipient_str
        .map(|value| parse_pubkey("recipient", value))
        .transpose()?
        .unwrap_or(authority);

    let instructions = mint_to_recipient(&authority, &mint, &recipient, &authority, amount)?;
    let token_account = associated_token_address(&recipient, &mint);
    let check = PostCondition::account_exists(token_account, "recipient token account");

    let report = ctx
        .client
        .submit(&ctx.with_memo(instructions), &signer, Some(&check))
        .await?;

    info!("Transaction confirmed: {}", report.signature);

    Ok(format!(
        "Tokens minted successfully!\nMint: {mint}\nRecipient: {recipient}\nToken account: {token_account}\nAmount: {amount}\nTransaction signature: {}",
        report.signature
    ))
}
