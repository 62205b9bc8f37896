//! Error types for the perp-ops SDK
//!
//! Every failure an administrative operation can hit is one variant of
//! [`OpsError`]. The variants follow the order in which a workflow can fail:
//!
//! - **Config** / **Keypair**: raised before any network call
//! - **Validation**: local parameter checks rejected the request
//! - **Submission**: the network rejected the transaction (preflight or execution);
//!   program log lines from the simulation are attached
//! - **`ConfirmationTimeout`**: the blockhash validity window elapsed first
//! - **Verification**: the transaction landed but the post-condition did not hold
//!
//! # Example
//!
//! ```rust
//! use perp_ops_sdk::OpsError;
//!
//! fn report(err: &OpsError) {
//!     eprintln!("Error: {err}");
//!     for line in err.program_logs() {
//!         eprintln!("  {line}");
//!     }
//! }
//! ```

use anchor_client::solana_client::client_error::{ClientError, ClientErrorKind};
use anchor_client::solana_client::rpc_request::{RpcError, RpcResponseErrorData};
use thiserror::Error;

/// Result type for perp-ops SDK operations
pub type Result<T> = std::result::Result<T, OpsError>;

/// Error types that can occur while running an administrative operation
#[derive(Error, Debug)]
pub enum OpsError {
    /// Required setting missing or invalid, or key file unreadable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key file exists but could not be parsed into a signing key
    #[error("Failed to load keypair from {path}: {reason}")]
    Keypair { path: String, reason: String },

    /// Local parameter validation rejected the request before submission
    #[error("Validation error: {0}")]
    Validation(String),

    /// The network rejected the transaction before or during execution
    #[error("Transaction submission failed: {reason}")]
    Submission { reason: String, logs: Vec<String> },

    /// The signature never reached the requested commitment inside its validity window
    #[error("Transaction {signature} was not confirmed before block height {last_valid_block_height}; the blockhash expired")]
    ConfirmationTimeout {
        signature: String,
        last_valid_block_height: u64,
    },

    /// The transaction confirmed but the re-fetched state does not show the intended effect
    #[error("Transaction {signature} confirmed but verification failed: {reason}")]
    Verification { signature: String, reason: String },

    /// RPC error for blockchain queries
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account data did not match the expected layout
    #[error("Failed to decode account: {0}")]
    Deserialize(String),

    /// Error from Solana SDK
    #[error("Solana SDK error: {0}")]
    Solana(#[from] anchor_client::solana_sdk::pubkey::ParsePubkeyError),

    /// Error from serde JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("perp-ops error: {0}")]
    Generic(String),
}

impl From<String> for OpsError {
    fn from(msg: String) -> Self {
        Self::Generic(msg)
    }
}

impl From<&str> for OpsError {
    fn from(msg: &str) -> Self {
        Self::Generic(msg.to_string())
    }
}

impl From<anchor_client::solana_sdk::signer::SignerError> for OpsError {
    fn from(error: anchor_client::solana_sdk::signer::SignerError) -> Self {
        Self::Generic(format!("Signing failed: {error}"))
    }
}

impl OpsError {
    /// Program log lines attached to this error, if any
    #[must_use]
    pub fn program_logs(&self) -> &[String] {
        match self {
            Self::Submission { logs, .. } => logs,
            _ => &[],
        }
    }

    /// Whether the error happened before anything was sent to the network
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Keypair { .. } | Self::Validation(_)
        )
    }

    /// Map an RPC client error raised by `sendTransaction` into a submission failure
    ///
    /// Preflight simulation failures carry the program's log lines; they are kept
    /// verbatim so the operator sees exactly what the program reported.
    #[must_use]
    pub fn from_send_error(error: &ClientError) -> Self {
        let logs = match error.kind() {
            ClientErrorKind::RpcError(RpcError::RpcResponseError {
                data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
                ..
            }) => simulation.logs.clone().unwrap_or_default(),
            _ => Vec::new(),
        };

        Self::Submission {
            reason: error.to_string(),
            logs,
        }
    }

    /// Map an RPC client error raised by a read-only query
    #[must_use]
    pub fn from_query_error(context: &str, error: &ClientError) -> Self {
        Self::Rpc(format!("{context}: {error}"))
    }
}
