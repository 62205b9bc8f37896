//! perp-ops SDK - administrative tooling for a deployed perpetuals protocol
//!
//! This crate drives privileged and user-level operations against an already
//! deployed perpetual-futures program. It includes:
//!
//! - A transaction workflow runner (build → sign → send → confirm → verify)
//! - Instruction builders and PDA derivations for the protocol's entry points
//! - Scoped account subscriptions that are always released
//! - Per-invocation configuration and a narrow signer interface
//!
//! # Example Usage
//!
//! ```no_run
//! use perp_ops_sdk::{transaction_builder, OpsConfig, ProtocolClient, FileSigner, OpsSigner};
//!
//! # async fn run() -> perp_ops_sdk::Result<()> {
//! let config = OpsConfig::from_env()?;
//! let signer = FileSigner::load(&config.keypair_path)?;
//! let client = ProtocolClient::from_config(&config);
//!
//! let new_admin = perp_ops_sdk::solana_sdk::pubkey::Pubkey::new_unique();
//! let instruction = transaction_builder::update_admin()
//!     .admin(signer.pubkey())
//!     .new_admin(new_admin)
//!     .program_id(*client.program_id())
//!     .build_instruction()?;
//!
//! let check = client.admin_is(new_admin);
//! let report = client.submit(&[instruction], &signer, Some(&check)).await?;
//! println!("{}", report.signature);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod config;
pub mod error;
pub mod keypair;
pub mod pda;
pub mod program_types;
pub mod rpc;
pub mod session;
pub mod signer;
pub mod subscription;
pub mod transaction_builder;
pub mod validation;
pub mod workflow;

// Re-export commonly used items
pub use client::{AuthorityCheck, ProtocolClient};
pub use config::{NetworkEnv, OpsConfig};
pub use error::{OpsError, Result};
pub use keypair::load_keypair;
pub use program_types::*;
pub use rpc::{ChainRpc, SignatureStatus};
pub use session::{run_admin_operation, AdminSession};
pub use signer::{FileSigner, OpsSigner};
pub use subscription::{AccountSubscriber, PollingAccountSubscriber, SubscriptionGuard};
pub use transaction_builder::{
    associated_token_address, create_memo_instruction, initialize, initialize_perp_market,
    initialize_spot_market, initialize_user, initialize_user_stats, mint_to_recipient,
    place_perp_order, update_admin,
    InitializeBuilder, InitializePerpMarketBuilder, InitializeSpotMarketBuilder,
    InitializeUserBuilder, InitializeUserStatsBuilder, PlacePerpOrderBuilder, UpdateAdminBuilder,
};
pub use workflow::{PostCondition, TransactionWorkflow, WorkflowReport};

// Re-export Solana types for convenience
pub use anchor_client::solana_client;
pub use anchor_client::solana_sdk;
