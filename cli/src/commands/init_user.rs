//! Init user command implementation

use crate::commands::CommandContext;
use anyhow::Result;
use perp_ops_sdk::{
    encode_name, pda, run_admin_operation, transaction_builder, InitializeUserArgs, OpsError,
    OpsSigner,
};
use tracing::info;

/// Execute the init user command
///
/// Creates the signer's user stats account when it is missing, then the user
/// (sub-)account, in one transaction.
///
/// # Errors
/// Returns an error if the user already exists, the name is too long, or the
/// transaction fails at any workflow step
pub async fn execute(ctx: &CommandContext, sub_account_id: u16, name: &str) -> Result<String> {
    info!("Starting user account initialization");

    let signer = ctx.signer()?;
    let authority = signer.pubkey();
    let program_id = *ctx.client.program_id();
    let encoded_name = encode_name(name)?;

    let user_address = pda::user_address(&authority, sub_account_id, &program_id);
    let stats_address = pda::user_stats_address(&authority, &program_id);
    let check = ctx.client.user_created(&authority, sub_account_id);
    let mut needs_stats = false;
    let report = run_admin_operation(
        &ctx.client,
        ctx.subscriber(&[user_address, stats_address]),
        &signer,
        |session| {
            if session.user_in_snapshot(&authority, sub_account_id)? {
                return Err(OpsError::Validation(format!(
                    "User account {sub_account_id} already exists at address: {user_address}"
                )));
            }

            let mut instructions = Vec::with_capacity(2);
            if !session.user_stats_in_snapshot(&authority)? {
                info!("User stats account missing; it will be created first");
                needs_stats = true;
                instructions.push(
                    transaction_builder::initialize_user_stats()
                        .authority(authority)
                        .program_id(program_id)
                        .build_instruction()?,
                );
            }
            instructions.push(
                transaction_builder::initialize_user()
                    .authority(authority)
                    .args(InitializeUserArgs {
                        sub_account_id,
                        name: encoded_name,
                    })
                    .program_id(program_id)
                    .build_instruction()?,
            );
            Ok(ctx.with_memo(instructions))
        },
        Some(&check),
    )
    .await?;

    info!("Transaction confirmed: {}", report.signature);

    Ok(format!(
        "User account created successfully!\nAuthority: {authority}\nSub-account: {sub_account_id}\nName: {name}\nUser: {user_address}\nUser stats: {stats_address}{}\nTransaction signature: {}",
        if needs_stats { " (created)" } else { "" },
        report.signature
    ))
}
