//! Connection seam between the workflow and an RPC node
//!
//! [`ChainRpc`] covers exactly the calls an administrative operation makes. The
//! nonblocking Solana `RpcClient` implements it for real runs; tests provide an
//! in-memory implementation.

use crate::error::{OpsError, Result};
use anchor_client::solana_client::nonblocking::rpc_client::RpcClient;
use anchor_client::solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::hash::Hash;
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::transaction::{Transaction, TransactionError};
use async_trait::async_trait;
use tracing::debug;

/// Status of a submitted signature at a given commitment
pub type SignatureStatus = Option<std::result::Result<(), TransactionError>>;

/// Minimal chain interface used by the workflow, the client and the subscriber
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Latest blockhash and the last block height at which it is still valid
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<(Hash, u64)>;

    /// Submit a signed transaction
    ///
    /// Preflight rejections are returned as [`OpsError::Submission`] with the
    /// simulation's program logs attached.
    async fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
        commitment: CommitmentConfig,
    ) -> Result<Signature>;

    /// Current status of a signature; `None` while not yet observed
    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureStatus>;

    /// Program log lines recorded for a landed transaction
    ///
    /// Used when execution fails after submission, where no preflight logs exist.
    async fn transaction_logs(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Vec<String>>;

    /// Current block height
    async fn block_height(&self, commitment: CommitmentConfig) -> Result<u64>;

    /// Raw data of an account; `None` if it does not exist
    async fn account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>>;

    /// Raw data of several accounts, in request order
    async fn multiple_account_data(
        &self,
        addresses: &[Pubkey],
        commitment: CommitmentConfig,
    ) -> Result<Vec<Option<Vec<u8>>>>;
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn latest_blockhash(&self, commitment: CommitmentConfig) -> Result<(Hash, u64)> {
        self.get_latest_blockhash_with_commitment(commitment)
            .await
            .map_err(|e| OpsError::from_query_error("Failed to get latest blockhash", &e))
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
        commitment: CommitmentConfig,
    ) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };

        let signature = self
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(|e| OpsError::from_send_error(&e))?;
        debug!(%signature, skip_preflight, "transaction accepted by RPC node");
        Ok(signature)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<SignatureStatus> {
        self.get_signature_status_with_commitment(signature, commitment)
            .await
            .map_err(|e| OpsError::from_query_error("Failed to get signature status", &e))
    }

    async fn transaction_logs(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> Result<Vec<String>> {
        // getTransaction does not serve the processed level
        let commitment = if commitment.is_at_least_confirmed() {
            commitment
        } else {
            CommitmentConfig::confirmed()
        };
        let config = RpcTransactionConfig {
            encoding: None,
            commitment: Some(commitment),
            max_supported_transaction_version: Some(0),
        };

        let transaction = self
            .get_transaction_with_config(signature, config)
            .await
            .map_err(|e| {
                OpsError::from_query_error(&format!("Failed to fetch transaction {signature}"), &e)
            })?;
        let logs: Option<Vec<String>> = transaction
            .transaction
            .meta
            .and_then(|meta| meta.log_messages.into());
        Ok(logs.unwrap_or_default())
    }

    async fn block_height(&self, commitment: CommitmentConfig) -> Result<u64> {
        self.get_block_height_with_commitment(commitment)
            .await
            .map_err(|e| OpsError::from_query_error("Failed to get block height", &e))
    }

    async fn account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>> {
        let response = self
            .get_account_with_commitment(address, commitment)
            .await
            .map_err(|e| OpsError::from_query_error(&format!("Failed to fetch account {address}"), &e))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn multiple_account_data(
        &self,
        addresses: &[Pubkey],
        commitment: CommitmentConfig,
    ) -> Result<Vec<Option<Vec<u8>>>> {
        let response = self
            .get_multiple_accounts_with_commitment(addresses, commitment)
            .await
            .map_err(|e| OpsError::from_query_error("Failed to fetch accounts", &e))?;
        Ok(response
            .value
            .into_iter()
            .map(|account| account.map(|account| account.data))
            .collect())
    }
}
