//! Command implementations for the perp-ops CLI
//!
//! Each command lives in its own file and returns the text printed on success.
//! Everything a command needs for one invocation is carried by [`CommandContext`].

pub mod init_perp_market;
pub mod init_spot_market;
pub mod init_user;
pub mod initialize;
pub mod inspect;
pub mod mint_devnet_tokens;
pub mod place_perp_order;
pub mod update_admin;

// Re-export command execution functions for easy access
pub use init_perp_market::execute as execute_init_perp_market;
pub use init_spot_market::execute as execute_init_spot_market;
pub use init_user::execute as execute_init_user;
pub use initialize::execute as execute_initialize;
pub use inspect::execute as execute_inspect;
pub use mint_devnet_tokens::execute as execute_mint_devnet_tokens;
pub use place_perp_order::execute as execute_place_perp_order;
pub use update_admin::execute as execute_update_admin;

use crate::config::CliConfig;
use anyhow::Result;
use perp_ops_sdk::solana_client::nonblocking::rpc_client::RpcClient;
use perp_ops_sdk::solana_sdk::instruction::Instruction;
use perp_ops_sdk::solana_sdk::pubkey::Pubkey;
use perp_ops_sdk::{
    create_memo_instruction, FileSigner, OpsConfig, OpsSigner, PollingAccountSubscriber,
    ProtocolClient,
};
use tracing::info;

/// Per-invocation state shared by all commands
pub struct CommandContext {
    pub ops: OpsConfig,
    pub client: ProtocolClient,
    pub config: CliConfig,
    /// Optional memo appended to every submitted transaction
    pub memo: Option<String>,
}

impl CommandContext {
    #[must_use]
    pub fn new(ops: OpsConfig, config: CliConfig, memo: Option<String>) -> Self {
        let client = ProtocolClient::from_config(&ops);
        Self {
            ops,
            client,
            config,
            memo,
        }
    }

    /// Load the signer key file
    ///
    /// # Errors
    /// Returns an error if the key file is missing or malformed
    pub fn signer(&self) -> Result<FileSigner> {
        self.ops.ensure_keypair_file()?;
        let signer = FileSigner::load(&self.ops.keypair_path)?;
        info!("Using signer: {}", signer.pubkey());
        Ok(signer)
    }

    /// Append the memo instruction, if one was requested
    #[must_use]
    pub fn with_memo(&self, mut instructions: Vec<Instruction>) -> Vec<Instruction> {
        if let Some(memo) = self.memo.as_deref() {
            instructions.push(create_memo_instruction(memo));
        }
        instructions
    }

    /// Subscriber over the global state plus `extra` accounts
    #[must_use]
    pub fn subscriber(&self, extra: &[Pubkey]) -> PollingAccountSubscriber<RpcClient> {
        let mut accounts = vec![self.client.state_address()];
        accounts.extend_from_slice(extra);
        self.client.subscriber(accounts)
    }
}
