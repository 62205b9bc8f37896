//! Instruction builders for the protocol's administrative and trading entry points
//!
//! Each builder collects accounts and arguments, derives the PDAs it needs and
//! produces an `Instruction` whose data is the Anchor discriminator followed by the
//! Borsh-encoded arguments. Market builders run the local sanity checks from
//! [`crate::validation`] before encoding anything.

use crate::{
    error::{OpsError, Result},
    pda,
    program_types::{
        InitializePerpMarketArgs, InitializeSpotMarketArgs, InitializeUserArgs, OrderParams,
        UpdateAdminArgs,
    },
    validation,
};
use anchor_client::solana_sdk::instruction::{AccountMeta, Instruction};
use anchor_client::solana_sdk::pubkey::Pubkey;
use anchor_lang::solana_program::sysvar;
use anchor_lang::system_program;

/// Instruction discriminators (`sha256("global:<name>")[..8]`)
pub mod discriminator {
    pub const INITIALIZE: [u8; 8] = [175, 175, 109, 31, 13, 152, 155, 237];
    pub const UPDATE_ADMIN: [u8; 8] = [161, 176, 40, 213, 60, 184, 179, 228];
    pub const INITIALIZE_SPOT_MARKET: [u8; 8] = [234, 196, 128, 44, 94, 15, 48, 201];
    pub const INITIALIZE_PERP_MARKET: [u8; 8] = [132, 9, 229, 118, 117, 118, 117, 62];
    pub const INITIALIZE_USER_STATS: [u8; 8] = [254, 243, 72, 98, 251, 130, 168, 213];
    pub const INITIALIZE_USER: [u8; 8] = [111, 17, 185, 250, 60, 122, 38, 254];
    pub const PLACE_PERP_ORDER: [u8; 8] = [69, 161, 93, 202, 120, 126, 76, 185];
}

fn instruction_data<T: borsh::BorshSerialize>(discriminator: [u8; 8], args: &T) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(&discriminator);
    borsh::to_writer(&mut data, args)
        .map_err(|e| OpsError::Generic(format!("Failed to serialize args: {e}")))?;
    Ok(data)
}

/// Builder for the protocol `initialize` instruction
#[derive(Clone, Debug, Default)]
pub struct InitializeBuilder {
    admin: Option<Pubkey>,
    quote_asset_mint: Option<Pubkey>,
    program_id: Option<Pubkey>,
}

/// Builder for `update_admin` (admin-key rotation)
#[derive(Clone, Debug, Default)]
pub struct UpdateAdminBuilder {
    admin: Option<Pubkey>,
    new_admin: Option<Pubkey>,
    program_id: Option<Pubkey>,
}

/// Builder for `initialize_spot_market`
#[derive(Clone, Debug, Default)]
pub struct InitializeSpotMarketBuilder {
    admin: Option<Pubkey>,
    market_index: Option<u16>,
    mint: Option<Pubkey>,
    oracle: Option<Pubkey>,
    args: Option<InitializeSpotMarketArgs>,
    program_id: Option<Pubkey>,
}

/// Builder for `initialize_perp_market`
#[derive(Clone, Debug, Default)]
pub struct InitializePerpMarketBuilder {
    admin: Option<Pubkey>,
    oracle: Option<Pubkey>,
    args: Option<InitializePerpMarketArgs>,
    program_id: Option<Pubkey>,
}

/// Builder for `initialize_user_stats`
#[derive(Clone, Debug, Default)]
pub struct InitializeUserStatsBuilder {
    authority: Option<Pubkey>,
    payer: Option<Pubkey>,
    program_id: Option<Pubkey>,
}

/// Builder for `initialize_user`
#[derive(Clone, Debug, Default)]
pub struct InitializeUserBuilder {
    authority: Option<Pubkey>,
    payer: Option<Pubkey>,
    args: Option<InitializeUserArgs>,
    program_id: Option<Pubkey>,
}

/// Builder for `place_perp_order`
#[derive(Clone, Debug, Default)]
pub struct PlacePerpOrderBuilder {
    authority: Option<Pubkey>,
    sub_account_id: u16,
    params: Option<OrderParams>,
    perp_market_oracle: Option<Pubkey>,
    quote_spot_market_oracle: Option<Pubkey>,
    program_id: Option<Pubkey>,
}

impl InitializeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the admin (signer, pays for the state account)
    #[must_use]
    pub const fn admin(mut self, admin: Pubkey) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Set the quote asset mint
    #[must_use]
    pub const fn quote_asset_mint(mut self, mint: Pubkey) -> Self {
        self.quote_asset_mint = Some(mint);
        self
    }

    /// Set the program id
    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// # Errors
    /// Returns an error if a required field is missing
    pub fn build_instruction(self) -> Result<Instruction> {
        let admin = self.admin.ok_or("Admin not set")?;
        let quote_asset_mint = self.quote_asset_mint.ok_or("Quote asset mint not set")?;
        let program_id = self.program_id.ok_or("Program ID not set")?;

        let accounts = vec![
            AccountMeta::new(admin, true),                                  // admin (signer, payer)
            AccountMeta::new(pda::state_address(&program_id), false),       // state (PDA)
            AccountMeta::new_readonly(quote_asset_mint, false),             // quote_asset_mint
            AccountMeta::new_readonly(pda::signer_address(&program_id), false), // program signer
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ];

        Ok(Instruction {
            program_id,
            accounts,
            data: discriminator::INITIALIZE.to_vec(),
        })
    }
}

impl UpdateAdminBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current admin (signer)
    #[must_use]
    pub const fn admin(mut self, admin: Pubkey) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Set the admin to rotate to
    #[must_use]
    pub const fn new_admin(mut self, new_admin: Pubkey) -> Self {
        self.new_admin = Some(new_admin);
        self
    }

    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// # Errors
    /// Returns an error if a required field is missing
    pub fn build_instruction(self) -> Result<Instruction> {
        let admin = self.admin.ok_or("Admin not set")?;
        let new_admin = self.new_admin.ok_or("New admin not set")?;
        let program_id = self.program_id.ok_or("Program ID not set")?;

        let accounts = vec![
            AccountMeta::new_readonly(admin, true),                   // admin (signer)
            AccountMeta::new(pda::state_address(&program_id), false), // state (mutable)
        ];

        let data = instruction_data(
            discriminator::UPDATE_ADMIN,
            &UpdateAdminArgs { admin: new_admin },
        )?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl InitializeSpotMarketBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn admin(mut self, admin: Pubkey) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Index the new market will occupy (next free index)
    #[must_use]
    pub const fn market_index(mut self, market_index: u16) -> Self {
        self.market_index = Some(market_index);
        self
    }

    #[must_use]
    pub const fn mint(mut self, mint: Pubkey) -> Self {
        self.mint = Some(mint);
        self
    }

    #[must_use]
    pub const fn oracle(mut self, oracle: Pubkey) -> Self {
        self.oracle = Some(oracle);
        self
    }

    #[must_use]
    pub fn args(mut self, args: InitializeSpotMarketArgs) -> Self {
        self.args = Some(args);
        self
    }

    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// # Errors
    /// Returns an error if a required field is missing or the market parameters
    /// fail local validation
    pub fn build_instruction(self) -> Result<Instruction> {
        let admin = self.admin.ok_or("Admin not set")?;
        let market_index = self.market_index.ok_or("Market index not set")?;
        let mint = self.mint.ok_or("Spot market mint not set")?;
        let oracle = self.oracle.ok_or("Oracle not set")?;
        let args = self.args.ok_or("Spot market args not set")?;
        let program_id = self.program_id.ok_or("Program ID not set")?;

        validation::validate_spot_market_args(&args)?;

        let accounts = vec![
            AccountMeta::new(pda::spot_market_address(market_index, &program_id), false),
            AccountMeta::new_readonly(mint, false),
            AccountMeta::new(pda::spot_market_vault_address(market_index, &program_id), false),
            AccountMeta::new(
                pda::insurance_fund_vault_address(market_index, &program_id),
                false,
            ),
            AccountMeta::new_readonly(pda::signer_address(&program_id), false),
            AccountMeta::new(pda::state_address(&program_id), false),
            AccountMeta::new_readonly(oracle, false),
            AccountMeta::new(admin, true),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ];

        let data = instruction_data(discriminator::INITIALIZE_SPOT_MARKET, &args)?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl InitializePerpMarketBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn admin(mut self, admin: Pubkey) -> Self {
        self.admin = Some(admin);
        self
    }

    #[must_use]
    pub const fn oracle(mut self, oracle: Pubkey) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Market parameters; `args.market_index` selects the PDA
    #[must_use]
    pub fn args(mut self, args: InitializePerpMarketArgs) -> Self {
        self.args = Some(args);
        self
    }

    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// # Errors
    /// Returns an error if a required field is missing or the market parameters
    /// fail local validation
    pub fn build_instruction(self) -> Result<Instruction> {
        let admin = self.admin.ok_or("Admin not set")?;
        let oracle = self.oracle.ok_or("Oracle not set")?;
        let args = self.args.ok_or("Perp market args not set")?;
        let program_id = self.program_id.ok_or("Program ID not set")?;

        validation::validate_perp_market_args(&args)?;

        let accounts = vec![
            AccountMeta::new(admin, true),
            AccountMeta::new(pda::state_address(&program_id), false),
            AccountMeta::new(
                pda::perp_market_address(args.market_index, &program_id),
                false,
            ),
            AccountMeta::new_readonly(oracle, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ];

        let data = instruction_data(discriminator::INITIALIZE_PERP_MARKET, &args)?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl InitializeUserStatsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn authority(mut self, authority: Pubkey) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Set the rent payer (defaults to the authority)
    #[must_use]
    pub const fn payer(mut self, payer: Pubkey) -> Self {
        self.payer = Some(payer);
        self
    }

    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// # Errors
    /// Returns an error if a required field is missing
    pub fn build_instruction(self) -> Result<Instruction> {
        let authority = self.authority.ok_or("Authority not set")?;
        let payer = self.payer.unwrap_or(authority);
        let program_id = self.program_id.ok_or("Program ID not set")?;

        let accounts = vec![
            AccountMeta::new(pda::user_stats_address(&authority, &program_id), false),
            AccountMeta::new(pda::state_address(&program_id), false),
            AccountMeta::new_readonly(authority, true),
            AccountMeta::new(payer, true),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ];

        Ok(Instruction {
            program_id,
            accounts,
            data: discriminator::INITIALIZE_USER_STATS.to_vec(),
        })
    }
}

impl InitializeUserBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn authority(mut self, authority: Pubkey) -> Self {
        self.authority = Some(authority);
        self
    }

    #[must_use]
    pub const fn payer(mut self, payer: Pubkey) -> Self {
        self.payer = Some(payer);
        self
    }

    #[must_use]
    pub const fn args(mut self, args: InitializeUserArgs) -> Self {
        self.args = Some(args);
        self
    }

    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// # Errors
    /// Returns an error if a required field is missing
    pub fn build_instruction(self) -> Result<Instruction> {
        let authority = self.authority.ok_or("Authority not set")?;
        let payer = self.payer.unwrap_or(authority);
        let args = self.args.ok_or("User args not set")?;
        let program_id = self.program_id.ok_or("Program ID not set")?;

        let accounts = vec![
            AccountMeta::new(
                pda::user_address(&authority, args.sub_account_id, &program_id),
                false,
            ),
            AccountMeta::new(pda::user_stats_address(&authority, &program_id), false),
            AccountMeta::new(pda::state_address(&program_id), false),
            AccountMeta::new_readonly(authority, true),
            AccountMeta::new(payer, true),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ];

        let data = instruction_data(discriminator::INITIALIZE_USER, &args)?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

impl PlacePerpOrderBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn authority(mut self, authority: Pubkey) -> Self {
        self.authority = Some(authority);
        self
    }

    #[must_use]
    pub const fn sub_account_id(mut self, sub_account_id: u16) -> Self {
        self.sub_account_id = sub_account_id;
        self
    }

    #[must_use]
    pub const fn params(mut self, params: OrderParams) -> Self {
        self.params = Some(params);
        self
    }

    /// Oracle of the perp market being traded
    #[must_use]
    pub const fn perp_market_oracle(mut self, oracle: Pubkey) -> Self {
        self.perp_market_oracle = Some(oracle);
        self
    }

    /// Oracle of the quote spot market (index 0)
    #[must_use]
    pub const fn quote_spot_market_oracle(mut self, oracle: Pubkey) -> Self {
        self.quote_spot_market_oracle = Some(oracle);
        self
    }

    #[must_use]
    pub const fn program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = Some(program_id);
        self
    }

    /// Build the instruction
    ///
    /// Remaining accounts are ordered oracles, then spot markets, then perp markets,
    /// which is how the program loads its account maps.
    ///
    /// # Errors
    /// Returns an error if a required field is missing or the order fails local validation
    pub fn build_instruction(self) -> Result<Instruction> {
        let authority = self.authority.ok_or("Authority not set")?;
        let params = self.params.ok_or("Order params not set")?;
        let perp_oracle = self.perp_market_oracle.ok_or("Perp market oracle not set")?;
        let quote_oracle = self
            .quote_spot_market_oracle
            .ok_or("Quote spot market oracle not set")?;
        let program_id = self.program_id.ok_or("Program ID not set")?;

        validation::validate_order_params(&params)?;

        let mut accounts = vec![
            AccountMeta::new_readonly(pda::state_address(&program_id), false),
            AccountMeta::new(
                pda::user_address(&authority, self.sub_account_id, &program_id),
                false,
            ),
            AccountMeta::new_readonly(authority, true),
        ];

        accounts.push(AccountMeta::new_readonly(perp_oracle, false));
        if quote_oracle != perp_oracle {
            accounts.push(AccountMeta::new_readonly(quote_oracle, false));
        }
        accounts.push(AccountMeta::new_readonly(
            pda::spot_market_address(0, &program_id),
            false,
        ));
        accounts.push(AccountMeta::new(
            pda::perp_market_address(params.market_index, &program_id),
            false,
        ));

        let data = instruction_data(discriminator::PLACE_PERP_ORDER, &params)?;

        Ok(Instruction {
            program_id,
            accounts,
            data,
        })
    }
}

/// Associated token account of `owner` for `mint` under the classic token program
#[must_use]
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

/// Instructions that mint test tokens into `recipient`'s associated token account
///
/// The ATA is created idempotently first; `mint_authority` must sign.
///
/// # Errors
/// Returns an error if the amount is zero or the token instruction cannot be built
pub fn mint_to_recipient(
    payer: &Pubkey,
    mint: &Pubkey,
    recipient: &Pubkey,
    mint_authority: &Pubkey,
    amount: u64,
) -> Result<Vec<Instruction>> {
    if amount == 0 {
        return Err(OpsError::Validation(
            "Mint amount must be greater than 0".to_string(),
        ));
    }

    let ata = associated_token_address(recipient, mint);
    let create_ata =
        spl_associated_token_account::instruction::create_associated_token_account_idempotent(
            payer,
            recipient,
            mint,
            &spl_token::ID,
        );
    let mint_to = spl_token::instruction::mint_to(
        &spl_token::ID,
        mint,
        &ata,
        mint_authority,
        &[],
        amount,
    )
    .map_err(|e| OpsError::Generic(format!("Failed to build mint_to instruction: {e}")))?;

    Ok(vec![create_ata, mint_to])
}

/// Creates a Memo instruction for transaction traceability
#[must_use]
pub fn create_memo_instruction(memo: &str) -> Instruction {
    Instruction {
        program_id: spl_memo::ID,
        accounts: vec![],
        data: memo.as_bytes().to_vec(),
    }
}

/// Create a new initialize builder
#[must_use]
pub fn initialize() -> InitializeBuilder {
    InitializeBuilder::new()
}

/// Create a new update admin builder
#[must_use]
pub fn update_admin() -> UpdateAdminBuilder {
    UpdateAdminBuilder::new()
}

/// Create a new initialize spot market builder
#[must_use]
pub fn initialize_spot_market() -> InitializeSpotMarketBuilder {
    InitializeSpotMarketBuilder::new()
}

/// Create a new initialize perp market builder
#[must_use]
pub fn initialize_perp_market() -> InitializePerpMarketBuilder {
    InitializePerpMarketBuilder::new()
}

/// Create a new initialize user stats builder
#[must_use]
pub fn initialize_user_stats() -> InitializeUserStatsBuilder {
    InitializeUserStatsBuilder::new()
}

/// Create a new initialize user builder
#[must_use]
pub fn initialize_user() -> InitializeUserBuilder {
    InitializeUserBuilder::new()
}

/// Create a new place perp order builder
#[must_use]
pub fn place_perp_order() -> PlacePerpOrderBuilder {
    PlacePerpOrderBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program_types::{
        encode_name, AssetTier, ContractTier, OracleSource, OrderType, PositionDirection,
        AMM_RESERVE_PRECISION, BASE_PRECISION, PEG_PRECISION, PRICE_PRECISION,
        SPOT_WEIGHT_PRECISION,
    };
    use anchor_lang::AnchorDeserialize;

    fn sample_spot_args() -> InitializeSpotMarketArgs {
        InitializeSpotMarketArgs {
            optimal_utilization: 800_000,
            optimal_borrow_rate: 100_000,
            max_borrow_rate: 1_000_000,
            oracle_source: OracleSource::PythPull,
            initial_asset_weight: 8_000,
            maintenance_asset_weight: 9_000,
            initial_liability_weight: 12_000,
            maintenance_liability_weight: 11_000,
            imf_factor: 0,
            liquidator_fee: 10_000,
            if_liquidation_fee: 10_000,
            active_status: true,
            asset_tier: AssetTier::Collateral,
            scale_initial_asset_weight_start: 0,
            withdraw_guard_threshold: 0,
            order_tick_size: 100,
            order_step_size: 1_000_000,
            if_total_factor: 100_000,
            name: encode_name("SOL").unwrap(),
        }
    }

    fn sample_perp_args(market_index: u16) -> InitializePerpMarketArgs {
        InitializePerpMarketArgs {
            market_index,
            amm_base_asset_reserve: 1_000 * AMM_RESERVE_PRECISION,
            amm_quote_asset_reserve: 1_000 * AMM_RESERVE_PRECISION,
            amm_periodicity: 3_600,
            amm_peg_multiplier: 150 * PEG_PRECISION,
            oracle_source: OracleSource::PythPull,
            contract_tier: ContractTier::Speculative,
            margin_ratio_initial: 1_000,
            margin_ratio_maintenance: 500,
            liquidator_fee: 0,
            if_liquidation_fee: 10_000,
            imf_factor: 0,
            active_status: true,
            base_spread: 0,
            max_spread: 1_000,
            max_open_interest: 0,
            max_revenue_withdraw_per_period: 0,
            quote_max_insurance: 0,
            order_step_size: BASE_PRECISION / 1_000,
            order_tick_size: PRICE_PRECISION / 10_000,
            min_order_size: BASE_PRECISION / 1_000,
            concentration_coef_scale: 0,
            curve_update_intensity: 0,
            amm_jit_intensity: 0,
            name: encode_name("SOL-PERP").unwrap(),
        }
    }

    #[test]
    fn test_update_admin_builder() {
        let program_id = Pubkey::new_unique();
        let admin = Pubkey::new_unique();
        let new_admin = Pubkey::new_unique();

        let instruction = update_admin()
            .admin(admin)
            .new_admin(new_admin)
            .program_id(program_id)
            .build_instruction()
            .unwrap();

        assert_eq!(instruction.program_id, program_id);
        assert_eq!(instruction.accounts.len(), 2);
        assert!(instruction.accounts[0].is_signer);
        assert!(!instruction.accounts[0].is_writable);
        assert_eq!(instruction.accounts[1].pubkey, pda::state_address(&program_id));
        assert!(instruction.accounts[1].is_writable);

        assert_eq!(&instruction.data[..8], &[161, 176, 40, 213, 60, 184, 179, 228]);
        let args = UpdateAdminArgs::try_from_slice(&instruction.data[8..]).unwrap();
        assert_eq!(args.admin, new_admin);
    }

    #[test]
    fn test_builder_missing_fields() {
        let result = update_admin().admin(Pubkey::new_unique()).build_instruction();
        assert!(result.unwrap_err().to_string().contains("New admin not set"));

        let result = initialize().admin(Pubkey::new_unique()).build_instruction();
        assert!(result.is_err());
    }

    #[test]
    fn test_initialize_builder() {
        let program_id = Pubkey::new_unique();
        let admin = Pubkey::new_unique();
        let quote_mint = Pubkey::new_unique();

        let instruction = initialize()
            .admin(admin)
            .quote_asset_mint(quote_mint)
            .program_id(program_id)
            .build_instruction()
            .unwrap();

        assert_eq!(instruction.accounts.len(), 7);
        assert_eq!(instruction.accounts[0].pubkey, admin);
        assert!(instruction.accounts[0].is_signer);
        assert_eq!(instruction.accounts[2].pubkey, quote_mint);
        assert_eq!(instruction.accounts[3].pubkey, pda::signer_address(&program_id));
        assert_eq!(instruction.data, discriminator::INITIALIZE.to_vec());
    }

    #[test]
    fn test_initialize_spot_market_builder() {
        let program_id = Pubkey::new_unique();
        let admin = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();

        let instruction = initialize_spot_market()
            .admin(admin)
            .market_index(1)
            .mint(mint)
            .oracle(oracle)
            .args(sample_spot_args())
            .program_id(program_id)
            .build_instruction()
            .unwrap();

        assert_eq!(instruction.accounts.len(), 11);
        assert_eq!(
            instruction.accounts[0].pubkey,
            pda::spot_market_address(1, &program_id)
        );
        assert_eq!(instruction.accounts[1].pubkey, mint);
        assert_eq!(instruction.accounts[6].pubkey, oracle);
        assert!(instruction.accounts[7].is_signer);
        assert_eq!(&instruction.data[..8], &discriminator::INITIALIZE_SPOT_MARKET);

        let decoded = InitializeSpotMarketArgs::try_from_slice(&instruction.data[8..]).unwrap();
        assert_eq!(decoded, sample_spot_args());
    }

    #[test]
    fn test_spot_market_weight_over_precision_rejected_before_encoding() {
        let mut args = sample_spot_args();
        args.maintenance_asset_weight = SPOT_WEIGHT_PRECISION + 1;

        let err = initialize_spot_market()
            .admin(Pubkey::new_unique())
            .market_index(1)
            .mint(Pubkey::new_unique())
            .oracle(Pubkey::new_unique())
            .args(args)
            .program_id(Pubkey::new_unique())
            .build_instruction()
            .unwrap_err();
        assert!(matches!(err, OpsError::Validation(_)));
    }

    #[test]
    fn test_initialize_perp_market_builder() {
        let program_id = Pubkey::new_unique();
        let oracle = Pubkey::new_unique();

        let instruction = initialize_perp_market()
            .admin(Pubkey::new_unique())
            .oracle(oracle)
            .args(sample_perp_args(3))
            .program_id(program_id)
            .build_instruction()
            .unwrap();

        assert_eq!(
            instruction.accounts[2].pubkey,
            pda::perp_market_address(3, &program_id)
        );
        assert_eq!(instruction.accounts[3].pubkey, oracle);
        let decoded = InitializePerpMarketArgs::try_from_slice(&instruction.data[8..]).unwrap();
        assert_eq!(decoded.market_index, 3);
        assert_eq!(decoded.amm_peg_multiplier, 150 * PEG_PRECISION);
    }

    #[test]
    fn test_initialize_user_builders() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();

        let stats = initialize_user_stats()
            .authority(authority)
            .program_id(program_id)
            .build_instruction()
            .unwrap();
        assert_eq!(
            stats.accounts[0].pubkey,
            pda::user_stats_address(&authority, &program_id)
        );
        assert_eq!(stats.accounts[3].pubkey, authority); // payer defaults to authority

        let user = initialize_user()
            .authority(authority)
            .args(InitializeUserArgs {
                sub_account_id: 2,
                name: encode_name("Main Account").unwrap(),
            })
            .program_id(program_id)
            .build_instruction()
            .unwrap();
        assert_eq!(
            user.accounts[0].pubkey,
            pda::user_address(&authority, 2, &program_id)
        );
        assert_eq!(&user.data[..8], &discriminator::INITIALIZE_USER);
    }

    #[test]
    fn test_place_perp_order_remaining_accounts() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let perp_oracle = Pubkey::new_unique();
        let quote_oracle = Pubkey::new_unique();

        let params = OrderParams {
            order_type: OrderType::Limit,
            direction: PositionDirection::Short,
            base_asset_amount: BASE_PRECISION,
            price: 150 * PRICE_PRECISION,
            market_index: 2,
            ..OrderParams::default()
        };

        let instruction = place_perp_order()
            .authority(authority)
            .params(params.clone())
            .perp_market_oracle(perp_oracle)
            .quote_spot_market_oracle(quote_oracle)
            .program_id(program_id)
            .build_instruction()
            .unwrap();

        assert_eq!(instruction.accounts.len(), 7);
        assert_eq!(instruction.accounts[3].pubkey, perp_oracle);
        assert_eq!(instruction.accounts[4].pubkey, quote_oracle);
        assert_eq!(
            instruction.accounts[5].pubkey,
            pda::spot_market_address(0, &program_id)
        );
        assert_eq!(
            instruction.accounts[6].pubkey,
            pda::perp_market_address(2, &program_id)
        );
        assert!(instruction.accounts[6].is_writable);

        let decoded = OrderParams::try_from_slice(&instruction.data[8..]).unwrap();
        assert_eq!(decoded, params);
    }

    #[test]
    fn test_place_perp_order_shared_oracle_listed_once() {
        let oracle = Pubkey::new_unique();
        let instruction = place_perp_order()
            .authority(Pubkey::new_unique())
            .params(OrderParams {
                base_asset_amount: BASE_PRECISION,
                price: PRICE_PRECISION,
                ..OrderParams::default()
            })
            .perp_market_oracle(oracle)
            .quote_spot_market_oracle(oracle)
            .program_id(Pubkey::new_unique())
            .build_instruction()
            .unwrap();
        assert_eq!(instruction.accounts.len(), 6);
    }

    #[test]
    fn test_mint_to_recipient() {
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();

        let instructions = mint_to_recipient(&payer, &mint, &recipient, &payer, 5_000_000).unwrap();
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].program_id, spl_associated_token_account::ID);
        assert_eq!(instructions[1].program_id, spl_token::ID);
        assert_eq!(
            instructions[1].accounts[1].pubkey,
            associated_token_address(&recipient, &mint)
        );

        assert!(mint_to_recipient(&payer, &mint, &recipient, &payer, 0).is_err());
    }

    #[test]
    fn test_memo_instruction() {
        let memo = create_memo_instruction("rotate admin");
        assert_eq!(memo.program_id, spl_memo::ID);
        assert_eq!(memo.data, b"rotate admin".to_vec());
    }
}
