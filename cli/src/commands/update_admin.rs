//! Update admin command implementation

use crate::commands::CommandContext;
use crate::utils::parse_pubkey;
use anyhow::{anyhow, Result};
use perp_ops_sdk::{transaction_builder, AdminSession, AuthorityCheck, OpsSigner};
use tracing::info;

/// Execute the update admin command
///
/// A signer that is not the on-chain admin is warned about but the transaction is
/// still submitted; the program's rejection is reported as the failure.
///
/// # Errors
/// Returns an error if the new admin is invalid, the state does not exist, or the
/// transaction fails at any workflow step
pub async fn execute(ctx: &CommandContext, new_admin_str: &str) -> Result<String> {
    info!("Starting admin rotation");

    let signer = ctx.signer()?;
    let new_admin = parse_pubkey("new admin", new_admin_str)?;

    let session = AdminSession::open(&ctx.client, ctx.subscriber(&[])).await?;

    let previous_admin = match session.check_admin(&signer.pubkey()) {
        AuthorityCheck::StateMissing => {
            session.close();
            return Err(anyhow!(
                "Global state not found at {}; run `initialize` first",
                ctx.client.state_address()
            ));
        }
        AuthorityCheck::Mismatch { on_chain } => on_chain,
        AuthorityCheck::Matches => signer.pubkey(),
    };
    info!("Rotating admin {} -> {}", previous_admin, new_admin);

    let outcome = async {
        let instruction = transaction_builder::update_admin()
            .admin(signer.pubkey())
            .new_admin(new_admin)
            .program_id(*ctx.client.program_id())
            .build_instruction()?;
        let check = ctx.client.admin_is(new_admin);
        session
            .execute(&ctx.with_memo(vec![instruction]), &signer, Some(&check))
            .await
    }
    .await;
    session.close();
    let report = outcome?;

    info!("Transaction confirmed: {}", report.signature);

    Ok(format!(
        "Admin updated successfully!\nPrevious admin: {previous_admin}\nNew admin: {new_admin}\nVerified: {}\nTransaction signature: {}",
        report.verified_state.unwrap_or_default(),
        report.signature
    ))
}
