//! Narrow signing interface used by the transaction workflow
//!
//! The workflow only needs a public identity and the ability to sign one or many
//! transactions. Any key holder (file-backed, hardware-backed, remote) can sit
//! behind [`OpsSigner`] without the workflow caring which.

use crate::error::{OpsError, Result};
use crate::keypair::load_keypair;
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_client::solana_sdk::signature::{Keypair, Signer};
use anchor_client::solana_sdk::transaction::Transaction;
use std::path::{Path, PathBuf};

/// Signing capability required by the transaction workflow
pub trait OpsSigner: Send + Sync {
    /// Public identity; used as fee payer
    fn pubkey(&self) -> Pubkey;

    /// Sign one transaction against its embedded recent blockhash
    fn sign_transaction(&self, transaction: &mut Transaction) -> Result<()>;

    /// Sign several transactions
    fn sign_all_transactions(&self, transactions: &mut [Transaction]) -> Result<()> {
        for transaction in transactions.iter_mut() {
            self.sign_transaction(transaction)?;
        }
        Ok(())
    }
}

impl OpsSigner for Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    fn sign_transaction(&self, transaction: &mut Transaction) -> Result<()> {
        let recent_blockhash = transaction.message.recent_blockhash;
        transaction.try_partial_sign(&[self], recent_blockhash)?;
        Ok(())
    }
}

/// Keypair loaded from a key file, remembering where it came from
pub struct FileSigner {
    keypair: Keypair,
    path: PathBuf,
}

impl FileSigner {
    /// Load the signer from a key file
    ///
    /// # Errors
    /// Returns an error if the file is missing or malformed
    pub fn load(path: &Path) -> Result<Self> {
        let keypair = load_keypair(path)?;
        Ok(Self {
            keypair,
            path: path.to_path_buf(),
        })
    }

    /// Path the key was loaded from
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Underlying keypair
    #[must_use]
    pub const fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for FileSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSigner")
            .field("pubkey", &Signer::pubkey(&self.keypair))
            .field("path", &self.path)
            .finish()
    }
}

impl OpsSigner for FileSigner {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(&self.keypair)
    }

    fn sign_transaction(&self, transaction: &mut Transaction) -> Result<()> {
        OpsSigner::sign_transaction(&self.keypair, transaction)
    }
}

/// Fail if any required signature is still missing
///
/// # Errors
/// Returns a validation error naming the first unsigned key
pub fn ensure_fully_signed(transaction: &Transaction) -> Result<()> {
    if transaction.is_signed() {
        return Ok(());
    }

    let required = usize::from(transaction.message.header.num_required_signatures);
    let missing = transaction
        .signatures
        .iter()
        .zip(transaction.message.account_keys.iter())
        .take(required)
        .find(|(signature, _)| **signature == anchor_client::solana_sdk::signature::Signature::default())
        .map(|(_, key)| key.to_string())
        .unwrap_or_default();

    Err(OpsError::Validation(format!(
        "Transaction is missing a required signature from {missing}"
    )))
}
