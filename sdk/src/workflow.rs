//! Build, sign, send, confirm and verify one transaction
//!
//! [`TransactionWorkflow`] is the single path every state-changing operation
//! takes. It never retries: a rejected or expired transaction is reported to
//! the caller with the failure kind intact.

use crate::{
    error::{OpsError, Result},
    rpc::ChainRpc,
    signer::{ensure_fully_signed, OpsSigner},
};
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::hash::Hash;
use anchor_client::solana_sdk::instruction::Instruction;
use anchor_client::solana_sdk::message::Message;
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_client::solana_sdk::signature::Signature;
use anchor_client::solana_sdk::transaction::Transaction;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default interval between signature status polls
pub const DEFAULT_CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

type CheckFn = dyn Fn(Option<&[u8]>) -> std::result::Result<String, String> + Send + Sync;

/// Expected on-chain effect of a transaction, checked after confirmation
///
/// The check receives the re-fetched account data (`None` if the account does
/// not exist) and returns a description of the observed state, or the reason
/// the state is not what was intended.
pub struct PostCondition {
    address: Pubkey,
    description: String,
    check: Box<CheckFn>,
}

impl PostCondition {
    pub fn new<F>(address: Pubkey, description: impl Into<String>, check: F) -> Self
    where
        F: Fn(Option<&[u8]>) -> std::result::Result<String, String> + Send + Sync + 'static,
    {
        Self {
            address,
            description: description.into(),
            check: Box::new(check),
        }
    }

    /// Post-condition satisfied by the account existing at all
    pub fn account_exists(address: Pubkey, description: impl Into<String>) -> Self {
        Self::new(address, description, move |data| match data {
            Some(data) => Ok(format!("account {address} exists ({} bytes)", data.len())),
            None => Err(format!("account {address} does not exist")),
        })
    }

    /// Account re-fetched for verification
    #[must_use]
    pub const fn address(&self) -> &Pubkey {
        &self.address
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluate against account data
    ///
    /// # Errors
    /// Returns the mismatch reason
    pub fn evaluate(&self, data: Option<&[u8]>) -> std::result::Result<String, String> {
        (self.check)(data)
    }
}

impl fmt::Debug for PostCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostCondition")
            .field("address", &self.address)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub signature: Signature,
    /// Observed state when a post-condition was supplied
    pub verified_state: Option<String>,
}

/// Runner for one transaction against a [`ChainRpc`]
pub struct TransactionWorkflow<'a, R: ChainRpc + ?Sized> {
    rpc: &'a R,
    commitment: CommitmentConfig,
    skip_preflight: bool,
    poll_interval: Duration,
}

impl<'a, R: ChainRpc + ?Sized> TransactionWorkflow<'a, R> {
    pub const fn new(rpc: &'a R, commitment: CommitmentConfig) -> Self {
        Self {
            rpc,
            commitment,
            skip_preflight: false,
            poll_interval: DEFAULT_CONFIRM_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Assemble an unsigned transaction with `payer` as fee payer
    ///
    /// # Errors
    /// Returns a validation error if `instructions` is empty
    pub fn build_transaction(
        instructions: &[Instruction],
        payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<Transaction> {
        if instructions.is_empty() {
            return Err(OpsError::Validation(
                "Cannot build a transaction without instructions".to_string(),
            ));
        }

        let message = Message::new_with_blockhash(instructions, Some(payer), &recent_blockhash);
        Ok(Transaction::new_unsigned(message))
    }

    /// Run the full workflow
    ///
    /// # Errors
    /// Returns the failure kind of the first step that failed: validation (build or
    /// signing), submission, confirmation timeout, or verification
    pub async fn run(
        &self,
        instructions: &[Instruction],
        signer: &dyn OpsSigner,
        post_condition: Option<&PostCondition>,
    ) -> Result<WorkflowReport> {
        if instructions.is_empty() {
            return Err(OpsError::Validation(
                "Cannot build a transaction without instructions".to_string(),
            ));
        }

        let (blockhash, last_valid_block_height) =
            self.rpc.latest_blockhash(self.commitment).await?;
        debug!(%blockhash, last_valid_block_height, "Fetched latest blockhash");

        let payer = signer.pubkey();
        let mut transaction = Self::build_transaction(instructions, &payer, blockhash)?;
        signer.sign_transaction(&mut transaction)?;
        ensure_fully_signed(&transaction)?;

        info!(
            payer = %payer,
            instructions = instructions.len(),
            skip_preflight = self.skip_preflight,
            "Submitting transaction"
        );
        let signature = self
            .rpc
            .send_transaction(&transaction, self.skip_preflight, self.commitment)
            .await?;
        info!(%signature, "Transaction submitted");

        self.confirm(&signature, last_valid_block_height).await?;
        info!(%signature, commitment = ?self.commitment.commitment, "Transaction confirmed");

        let verified_state = match post_condition {
            Some(condition) => Some(self.verify(&signature, condition).await?),
            None => None,
        };

        Ok(WorkflowReport {
            signature,
            verified_state,
        })
    }

    /// Poll until the signature reaches the commitment or the blockhash expires
    async fn confirm(&self, signature: &Signature, last_valid_block_height: u64) -> Result<()> {
        loop {
            match self.rpc.signature_status(signature, self.commitment).await? {
                Some(Ok(())) => return Ok(()),
                Some(Err(err)) => {
                    let logs = self.execution_logs(signature).await;
                    return Err(OpsError::Submission {
                        reason: format!("Transaction {signature} failed during execution: {err}"),
                        logs,
                    });
                }
                None => {}
            }

            let block_height = self.rpc.block_height(self.commitment).await?;
            if block_height > last_valid_block_height {
                return Err(OpsError::ConfirmationTimeout {
                    signature: signature.to_string(),
                    last_valid_block_height,
                });
            }

            debug!(%signature, block_height, last_valid_block_height, "Awaiting confirmation");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Program logs of a transaction that failed on-chain; empty if unavailable
    async fn execution_logs(&self, signature: &Signature) -> Vec<String> {
        match self.rpc.transaction_logs(signature, self.commitment).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(%signature, error = %e, "Could not fetch program logs of failed transaction");
                Vec::new()
            }
        }
    }

    /// Re-fetch the post-condition account and evaluate it
    async fn verify(&self, signature: &Signature, condition: &PostCondition) -> Result<String> {
        let data = self
            .rpc
            .account_data(condition.address(), self.commitment)
            .await?;

        match condition.evaluate(data.as_deref()) {
            Ok(observed) => {
                info!(%signature, check = condition.description(), %observed, "Post-condition verified");
                Ok(observed)
            }
            Err(reason) => Err(OpsError::Verification {
                signature: signature.to_string(),
                reason: format!("expected {}: {reason}", condition.description()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ChainRpc;
    use anchor_client::solana_sdk::instruction::AccountMeta;

    struct NoRpc;

    #[async_trait::async_trait]
    impl ChainRpc for NoRpc {
        async fn latest_blockhash(&self, _: CommitmentConfig) -> Result<(Hash, u64)> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
        async fn send_transaction(
            &self,
            _: &Transaction,
            _: bool,
            _: CommitmentConfig,
        ) -> Result<Signature> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
        async fn signature_status(
            &self,
            _: &Signature,
            _: CommitmentConfig,
        ) -> Result<crate::rpc::SignatureStatus> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
        async fn transaction_logs(&self, _: &Signature, _: CommitmentConfig) -> Result<Vec<String>> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
        async fn block_height(&self, _: CommitmentConfig) -> Result<u64> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
        async fn account_data(&self, _: &Pubkey, _: CommitmentConfig) -> Result<Option<Vec<u8>>> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
        async fn multiple_account_data(
            &self,
            _: &[Pubkey],
            _: CommitmentConfig,
        ) -> Result<Vec<Option<Vec<u8>>>> {
            Err(OpsError::Rpc("unreachable".to_string()))
        }
    }

    #[test]
    fn test_build_transaction_sets_payer_and_blockhash() {
        let payer = Pubkey::new_unique();
        let blockhash = Hash::new_unique();
        let instruction = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new(payer, true)],
            data: vec![],
        };

        let tx =
            TransactionWorkflow::<NoRpc>::build_transaction(&[instruction], &payer, blockhash)
                .unwrap();
        assert_eq!(tx.message.account_keys[0], payer);
        assert_eq!(tx.message.recent_blockhash, blockhash);
        assert!(!tx.is_signed());
    }

    #[tokio::test]
    async fn test_empty_instructions_rejected_before_network() {
        let rpc = NoRpc;
        let workflow = TransactionWorkflow::new(&rpc, CommitmentConfig::confirmed());
        let signer = anchor_client::solana_sdk::signature::Keypair::new();

        let err = workflow.run(&[], &signer, None).await.unwrap_err();
        assert!(matches!(err, OpsError::Validation(_)));
    }

    #[test]
    fn test_account_exists_condition() {
        let address = Pubkey::new_unique();
        let condition = PostCondition::account_exists(address, "user account created");
        assert!(condition.evaluate(Some(&[0u8; 16])).is_ok());
        assert!(condition.evaluate(None).unwrap_err().contains("does not exist"));
        assert_eq!(condition.description(), "user account created");
    }
}
