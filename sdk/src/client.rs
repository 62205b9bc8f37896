//! Protocol client: account reads, market discovery and transaction submission

use crate::{
    config::OpsConfig,
    error::{OpsError, Result},
    pda,
    program_types::{
        ensure_user_account, PerpMarketHeader, SpotMarketHeader,
        StateHeader,
    },
    rpc::ChainRpc,
    signer::OpsSigner,
    subscription::PollingAccountSubscriber,
    workflow::{PostCondition, TransactionWorkflow, WorkflowReport, DEFAULT_CONFIRM_POLL_INTERVAL},
};
use anchor_client::solana_client::nonblocking::rpc_client::RpcClient;
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::instruction::Instruction;
use anchor_client::solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Number of market PDAs fetched per `getMultipleAccounts` call while probing
const MARKET_PROBE_BATCH: u16 = 10;

/// Result of comparing the signer against the on-chain admin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityCheck {
    Matches,
    /// Signer is not the admin; the program is expected to reject the transaction
    Mismatch { on_chain: Pubkey },
    /// Global state does not exist yet
    StateMissing,
}

impl AuthorityCheck {
    /// Compare `signer` with the admin recorded in `state`
    ///
    /// A mismatch is logged as a warning; the caller still proceeds and lets the
    /// network decide.
    #[must_use]
    pub fn evaluate(state: Option<&StateHeader>, signer: &Pubkey) -> Self {
        match state {
            None => {
                warn!(signer = %signer, "Global state account not found; cannot check admin");
                Self::StateMissing
            }
            Some(state) if state.admin == *signer => Self::Matches,
            Some(state) => {
                warn!(
                    signer = %signer,
                    on_chain_admin = %state.admin,
                    "Signer is not the on-chain admin; submitting anyway, expect the program to reject it"
                );
                Self::Mismatch {
                    on_chain: state.admin,
                }
            }
        }
    }

    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Matches)
    }
}

/// Client bound to one program id and one RPC connection
pub struct ProtocolClient<R: ChainRpc + 'static = RpcClient> {
    rpc: Arc<R>,
    program_id: Pubkey,
    commitment: CommitmentConfig,
    skip_preflight: bool,
    confirm_poll_interval: Duration,
    account_poll_interval: Duration,
}

impl ProtocolClient<RpcClient> {
    /// Connect to the configured RPC endpoint
    #[must_use]
    pub fn from_config(config: &OpsConfig) -> Self {
        let rpc = RpcClient::new_with_commitment(config.rpc_url.clone(), config.commitment);
        Self::new(Arc::new(rpc), config)
    }
}

impl<R: ChainRpc + 'static> ProtocolClient<R> {
    pub fn new(rpc: Arc<R>, config: &OpsConfig) -> Self {
        Self {
            rpc,
            program_id: config.program_id,
            commitment: config.commitment,
            skip_preflight: config.skip_preflight,
            confirm_poll_interval: config.confirm_poll_interval,
            account_poll_interval: config.account_poll_interval,
        }
    }

    /// Client with default polling settings and preflight enabled
    pub fn with_program_id(rpc: Arc<R>, program_id: Pubkey, commitment: CommitmentConfig) -> Self {
        Self {
            rpc,
            program_id,
            commitment,
            skip_preflight: false,
            confirm_poll_interval: DEFAULT_CONFIRM_POLL_INTERVAL,
            account_poll_interval: Duration::from_secs(1),
        }
    }

    /// Submit without the node's preflight simulation
    #[must_use]
    pub fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }

    #[must_use]
    pub const fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    #[must_use]
    pub const fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }

    #[must_use]
    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// Global state PDA
    #[must_use]
    pub fn state_address(&self) -> Pubkey {
        pda::state_address(&self.program_id)
    }

    /// Check if an account exists
    ///
    /// # Errors
    /// Returns an error if the RPC call fails
    pub async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        Ok(self
            .rpc
            .account_data(address, self.commitment)
            .await?
            .is_some())
    }

    /// Fetch the global state header; `None` if the protocol is not initialized
    ///
    /// # Errors
    /// Returns an error if the RPC call fails or the account does not decode
    pub async fn get_state(&self) -> Result<Option<StateHeader>> {
        self.rpc
            .account_data(&self.state_address(), self.commitment)
            .await?
            .map(|data| StateHeader::decode(&data))
            .transpose()
    }

    /// Raw data of contiguous market accounts starting at index 0
    ///
    /// Markets are created with sequential indexes, so the first missing PDA ends
    /// the scan.
    async fn probe_markets(
        &self,
        max_markets: u16,
        address_of: fn(u16, &Pubkey) -> Pubkey,
    ) -> Result<Vec<Vec<u8>>> {
        let mut found = Vec::new();
        let mut start = 0u16;

        while start < max_markets {
            let end = start.saturating_add(MARKET_PROBE_BATCH).min(max_markets);
            let addresses: Vec<Pubkey> = (start..end)
                .map(|index| address_of(index, &self.program_id))
                .collect();

            let accounts = self
                .rpc
                .multiple_account_data(&addresses, self.commitment)
                .await?;
            for data in accounts {
                match data {
                    Some(data) => found.push(data),
                    None => return Ok(found),
                }
            }
            start = end;
        }

        Ok(found)
    }

    /// All existing perp markets with their indexes
    ///
    /// # Errors
    /// Returns an error if an RPC call fails or a market does not decode
    pub async fn list_perp_markets(&self, max_markets: u16) -> Result<Vec<(u16, PerpMarketHeader)>> {
        let accounts = self
            .probe_markets(max_markets, pda::perp_market_address)
            .await?;
        (0u16..)
            .zip(accounts)
            .map(|(index, data)| Ok((index, PerpMarketHeader::decode(&data)?)))
            .collect()
    }

    /// All existing spot markets with their indexes
    ///
    /// # Errors
    /// Returns an error if an RPC call fails or a market does not decode
    pub async fn list_spot_markets(&self, max_markets: u16) -> Result<Vec<(u16, SpotMarketHeader)>> {
        let accounts = self
            .probe_markets(max_markets, pda::spot_market_address)
            .await?;
        (0u16..)
            .zip(accounts)
            .map(|(index, data)| Ok((index, SpotMarketHeader::decode(&data)?)))
            .collect()
    }

    /// Index the next perp market will take
    ///
    /// # Errors
    /// Returns a validation error if every probed index is in use
    pub async fn next_perp_market_index(&self, max_markets: u16) -> Result<u16> {
        let existing = self
            .probe_markets(max_markets, pda::perp_market_address)
            .await?;
        next_free_index(existing.len(), max_markets, "perp")
    }

    /// Index the next spot market will take
    ///
    /// # Errors
    /// Returns a validation error if every probed index is in use
    pub async fn next_spot_market_index(&self, max_markets: u16) -> Result<u16> {
        let existing = self
            .probe_markets(max_markets, pda::spot_market_address)
            .await?;
        next_free_index(existing.len(), max_markets, "spot")
    }

    /// Workflow runner configured from this client
    #[must_use]
    pub fn workflow(&self) -> TransactionWorkflow<'_, R> {
        TransactionWorkflow::new(self.rpc.as_ref(), self.commitment)
            .with_skip_preflight(self.skip_preflight)
            .with_poll_interval(self.confirm_poll_interval)
    }

    /// Build, sign, send, confirm and optionally verify one transaction
    ///
    /// # Errors
    /// Returns the failure kind of the first failing step
    pub async fn submit(
        &self,
        instructions: &[Instruction],
        signer: &dyn OpsSigner,
        post_condition: Option<&PostCondition>,
    ) -> Result<WorkflowReport> {
        self.workflow()
            .run(instructions, signer, post_condition)
            .await
    }

    /// Polling subscriber over `accounts` sharing this client's connection
    #[must_use]
    pub fn subscriber(&self, accounts: Vec<Pubkey>) -> PollingAccountSubscriber<R> {
        PollingAccountSubscriber::new(
            Arc::clone(&self.rpc),
            accounts,
            self.commitment,
            self.account_poll_interval,
        )
    }

    /// Post-condition: global state exists and its admin is `expected`
    #[must_use]
    pub fn admin_is(&self, expected: Pubkey) -> PostCondition {
        PostCondition::new(
            self.state_address(),
            format!("admin == {expected}"),
            move |data| {
                let data = data.ok_or_else(|| "state account not found".to_string())?;
                let state = StateHeader::decode(data).map_err(|e| e.to_string())?;
                if state.admin == expected {
                    Ok(format!("admin = {}", state.admin))
                } else {
                    Err(format!("on-chain admin is {}", state.admin))
                }
            },
        )
    }

    /// Post-condition: spot market `market_index` exists with `mint`
    #[must_use]
    pub fn spot_market_created(&self, market_index: u16, mint: Pubkey) -> PostCondition {
        PostCondition::new(
            pda::spot_market_address(market_index, &self.program_id),
            format!("spot market {market_index} with mint {mint}"),
            move |data| {
                let data = data.ok_or_else(|| "market account not found".to_string())?;
                let market = SpotMarketHeader::decode(data).map_err(|e| e.to_string())?;
                if market.mint == mint {
                    Ok(format!(
                        "spot market {market_index} '{}' mint = {} oracle = {}",
                        market.name, market.mint, market.oracle
                    ))
                } else {
                    Err(format!("market mint is {}", market.mint))
                }
            },
        )
    }

    /// Post-condition: perp market `market_index` exists with `oracle`
    #[must_use]
    pub fn perp_market_created(&self, market_index: u16, oracle: Pubkey) -> PostCondition {
        PostCondition::new(
            pda::perp_market_address(market_index, &self.program_id),
            format!("perp market {market_index} with oracle {oracle}"),
            move |data| {
                let data = data.ok_or_else(|| "market account not found".to_string())?;
                let market = PerpMarketHeader::decode(data).map_err(|e| e.to_string())?;
                if market.oracle == oracle {
                    Ok(format!("perp market {market_index} oracle = {}", market.oracle))
                } else {
                    Err(format!("market oracle is {}", market.oracle))
                }
            },
        )
    }

    /// Post-condition: user account for `authority`/`sub_account_id` exists
    #[must_use]
    pub fn user_created(&self, authority: &Pubkey, sub_account_id: u16) -> PostCondition {
        let address = pda::user_address(authority, sub_account_id, &self.program_id);
        PostCondition::new(
            address,
            format!("user account {address}"),
            move |data| {
                let data = data.ok_or_else(|| "user account not found".to_string())?;
                ensure_user_account(data).map_err(|e| e.to_string())?;
                Ok(format!("user account {address} exists"))
            },
        )
    }
}

fn next_free_index(existing: usize, max_markets: u16, kind: &str) -> Result<u16> {
    let index = u16::try_from(existing)
        .map_err(|_| OpsError::Validation(format!("Too many {kind} markets: {existing}")))?;
    if index >= max_markets {
        return Err(OpsError::Validation(format!(
            "All {max_markets} probed {kind} market indexes are in use; raise the probe limit"
        )));
    }
    debug!(kind, index, "Next free market index");
    Ok(index)
}
