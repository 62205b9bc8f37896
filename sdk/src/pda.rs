//! Program Derived Address (PDA) computation utilities
//!
//! All derivations take the program id explicitly; there is no global program id.

use anchor_client::solana_sdk::pubkey::Pubkey;

pub const STATE_SEED: &[u8] = b"drift_state";
pub const SIGNER_SEED: &[u8] = b"drift_signer";
pub const PERP_MARKET_SEED: &[u8] = b"perp_market";
pub const SPOT_MARKET_SEED: &[u8] = b"spot_market";
pub const SPOT_MARKET_VAULT_SEED: &[u8] = b"spot_market_vault";
pub const INSURANCE_FUND_VAULT_SEED: &[u8] = b"insurance_fund_vault";
pub const USER_SEED: &[u8] = b"user";
pub const USER_STATS_SEED: &[u8] = b"user_stats";

/// Compute the global state PDA
///
/// # Arguments
/// * `program_id` - The protocol program id
///
/// # Returns
/// * `(Pubkey, u8)` - The PDA address and bump seed
#[must_use]
pub fn state(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STATE_SEED], program_id)
}

/// Compute the global state PDA address only (without bump)
#[must_use]
pub fn state_address(program_id: &Pubkey) -> Pubkey {
    state(program_id).0
}

/// Compute the program signer PDA address (vault authority)
#[must_use]
pub fn signer_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[SIGNER_SEED], program_id).0
}

/// Compute a perp market PDA address
///
/// # Arguments
/// * `market_index` - Market index, little-endian in the seed
/// * `program_id` - The protocol program id
#[must_use]
pub fn perp_market_address(market_index: u16, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[PERP_MARKET_SEED, &market_index.to_le_bytes()],
        program_id,
    )
    .0
}

/// Compute a spot market PDA address
#[must_use]
pub fn spot_market_address(market_index: u16, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[SPOT_MARKET_SEED, &market_index.to_le_bytes()],
        program_id,
    )
    .0
}

/// Compute a spot market token vault PDA address
#[must_use]
pub fn spot_market_vault_address(market_index: u16, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[SPOT_MARKET_VAULT_SEED, &market_index.to_le_bytes()],
        program_id,
    )
    .0
}

/// Compute a spot market insurance fund vault PDA address
#[must_use]
pub fn insurance_fund_vault_address(market_index: u16, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[INSURANCE_FUND_VAULT_SEED, &market_index.to_le_bytes()],
        program_id,
    )
    .0
}

/// Compute a user (sub-account) PDA address
///
/// # Arguments
/// * `authority` - Owner of the user account
/// * `sub_account_id` - Sub-account number, little-endian in the seed
/// * `program_id` - The protocol program id
#[must_use]
pub fn user_address(authority: &Pubkey, sub_account_id: u16, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[USER_SEED, authority.as_ref(), &sub_account_id.to_le_bytes()],
        program_id,
    )
    .0
}

/// Compute the user stats PDA address
#[must_use]
pub fn user_stats_address(authority: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[USER_STATS_SEED, authority.as_ref()], program_id).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_pda_deterministic() {
        let program_id = Pubkey::new_unique();
        let (address, bump) = state(&program_id);
        assert_eq!(state_address(&program_id), address);

        let expected =
            Pubkey::create_program_address(&[STATE_SEED, &[bump]], &program_id).unwrap();
        assert_eq!(address, expected);
    }

    #[test]
    fn test_market_pdas_differ_by_index_and_kind() {
        let program_id = Pubkey::new_unique();
        assert_ne!(
            perp_market_address(0, &program_id),
            perp_market_address(1, &program_id)
        );
        assert_ne!(
            perp_market_address(0, &program_id),
            spot_market_address(0, &program_id)
        );
        assert_ne!(
            spot_market_vault_address(0, &program_id),
            insurance_fund_vault_address(0, &program_id)
        );
    }

    #[test]
    fn test_market_index_seed_is_little_endian() {
        let program_id = Pubkey::new_unique();
        let (expected, _) =
            Pubkey::find_program_address(&[PERP_MARKET_SEED, &[1, 0]], &program_id);
        assert_eq!(perp_market_address(1, &program_id), expected);
    }

    #[test]
    fn test_user_pdas_are_per_authority_and_sub_account() {
        let program_id = Pubkey::new_unique();
        let alice = Pubkey::new_unique();
        let bob = Pubkey::new_unique();

        assert_ne!(
            user_address(&alice, 0, &program_id),
            user_address(&alice, 1, &program_id)
        );
        assert_ne!(
            user_address(&alice, 0, &program_id),
            user_address(&bob, 0, &program_id)
        );
        assert_ne!(
            user_stats_address(&alice, &program_id),
            user_stats_address(&bob, &program_id)
        );
    }
}
