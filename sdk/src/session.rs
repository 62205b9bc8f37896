//! One administrative invocation: subscribe, check, submit, release
//!
//! An [`AdminSession`] owns the account subscription for the accounts an
//! operation touches. Pre-checks read from the live snapshot; the subscription
//! is released exactly once when the session is closed or dropped, on every
//! exit path.

use crate::{
    client::{AuthorityCheck, ProtocolClient},
    error::{OpsError, Result},
    pda,
    program_types::{
        ensure_user_account, ensure_user_stats_account, PerpMarketHeader, SpotMarketHeader,
        StateHeader,
    },
    rpc::ChainRpc,
    signer::OpsSigner,
    subscription::{AccountSubscriber, SubscriptionGuard},
    workflow::{PostCondition, WorkflowReport},
};
use anchor_client::solana_sdk::instruction::Instruction;
use anchor_client::solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

pub struct AdminSession<'c, R: ChainRpc + 'static, S: AccountSubscriber> {
    client: &'c ProtocolClient<R>,
    subscription: SubscriptionGuard<S>,
}

impl<'c, R: ChainRpc + 'static, S: AccountSubscriber> AdminSession<'c, R, S> {
    /// Subscribe and open the session
    ///
    /// # Errors
    /// Returns the subscribe error; the subscriber has already been released
    pub async fn open(client: &'c ProtocolClient<R>, subscriber: S) -> Result<Self> {
        let subscription = SubscriptionGuard::acquire(subscriber).await?;
        debug!(program_id = %client.program_id(), "Admin session opened");
        Ok(Self {
            client,
            subscription,
        })
    }

    #[must_use]
    pub const fn client(&self) -> &'c ProtocolClient<R> {
        self.client
    }

    /// Latest subscribed data for `address`
    #[must_use]
    pub fn snapshot(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.subscription.subscriber().snapshot(address)
    }

    /// Global state header from the live snapshot
    #[must_use]
    pub fn state_snapshot(&self) -> Option<StateHeader> {
        let data = self.snapshot(&self.client.state_address())?;
        match StateHeader::decode(&data) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(error = %e, "Subscribed state account does not decode");
                None
            }
        }
    }

    /// Subscribed perp market at `market_index`
    ///
    /// # Errors
    /// Returns `AccountNotFound` if the market is not in the snapshot, or a decode
    /// error if the account is not a perp market
    pub fn perp_market_snapshot(&self, market_index: u16) -> Result<PerpMarketHeader> {
        let address = pda::perp_market_address(market_index, self.client.program_id());
        let data = self.snapshot(&address).ok_or_else(|| {
            OpsError::AccountNotFound(format!("perp market {market_index} at {address}"))
        })?;
        PerpMarketHeader::decode(&data)
    }

    /// Subscribed spot market at `market_index`
    ///
    /// # Errors
    /// Returns `AccountNotFound` if the market is not in the snapshot, or a decode
    /// error if the account is not a spot market
    pub fn spot_market_snapshot(&self, market_index: u16) -> Result<SpotMarketHeader> {
        let address = pda::spot_market_address(market_index, self.client.program_id());
        let data = self.snapshot(&address).ok_or_else(|| {
            OpsError::AccountNotFound(format!("spot market {market_index} at {address}"))
        })?;
        SpotMarketHeader::decode(&data)
    }

    /// Whether the subscribed user account of `authority` exists
    ///
    /// # Errors
    /// Returns an error if an account exists at the address but is not a user
    pub fn user_in_snapshot(&self, authority: &Pubkey, sub_account_id: u16) -> Result<bool> {
        let address = pda::user_address(authority, sub_account_id, self.client.program_id());
        self.snapshot(&address)
            .map(|data| ensure_user_account(&data))
            .transpose()
            .map(|found| found.is_some())
    }

    /// Whether the subscribed user stats account of `authority` exists
    ///
    /// # Errors
    /// Returns an error if an account exists at the address but is not user stats
    pub fn user_stats_in_snapshot(&self, authority: &Pubkey) -> Result<bool> {
        let address = pda::user_stats_address(authority, self.client.program_id());
        self.snapshot(&address)
            .map(|data| ensure_user_stats_account(&data))
            .transpose()
            .map(|found| found.is_some())
    }

    /// Compare `signer` with the subscribed on-chain admin, warning on mismatch
    #[must_use]
    pub fn check_admin(&self, signer: &Pubkey) -> AuthorityCheck {
        AuthorityCheck::evaluate(self.state_snapshot().as_ref(), signer)
    }

    /// Run the transaction workflow inside the session
    ///
    /// # Errors
    /// Returns the failure kind of the first failing step
    pub async fn execute(
        &self,
        instructions: &[Instruction],
        signer: &dyn OpsSigner,
        post_condition: Option<&PostCondition>,
    ) -> Result<WorkflowReport> {
        self.client
            .submit(instructions, signer, post_condition)
            .await
    }

    /// Release the subscription now
    pub fn close(self) {
        self.subscription.release();
        debug!("Admin session closed");
    }
}

/// Open a session, run one transaction and close the session on every path
///
/// `build` runs inside the session so that a failure to assemble instructions
/// still releases the subscription.
///
/// # Errors
/// Returns the subscribe error or the failure kind of the first failing step
pub async fn run_admin_operation<R, S, F>(
    client: &ProtocolClient<R>,
    subscriber: S,
    signer: &dyn OpsSigner,
    build: F,
    post_condition: Option<&PostCondition>,
) -> Result<WorkflowReport>
where
    R: ChainRpc + 'static,
    S: AccountSubscriber,
    F: FnOnce(&AdminSession<'_, R, S>) -> Result<Vec<Instruction>>,
{
    let session = AdminSession::open(client, subscriber).await?;
    let outcome = match build(&session) {
        Ok(instructions) => session.execute(&instructions, signer, post_condition).await,
        Err(e) => Err(e),
    };
    session.close();
    outcome
}
