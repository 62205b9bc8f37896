//! Per-invocation configuration
//!
//! Settings are read from the environment once, validated, and passed explicitly
//! into the client. Nothing here is cached in globals: every invocation builds its
//! own [`OpsConfig`].

use crate::error::{OpsError, Result};
use anchor_client::solana_sdk::commitment_config::CommitmentConfig;
use anchor_client::solana_sdk::pubkey::Pubkey;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const RPC_URL_VAR: &str = "RPC_URL";
pub const PROGRAM_ID_VAR: &str = "PROGRAM_ID";
pub const KEYPAIR_PATH_VAR: &str = "KEYPAIR_PATH";
/// Fallback used by Anchor tooling
pub const ANCHOR_WALLET_VAR: &str = "ANCHOR_WALLET";
pub const ENV_VAR: &str = "ENV";
pub const COMMITMENT_VAR: &str = "COMMITMENT";
pub const SKIP_PREFLIGHT_VAR: &str = "SKIP_PREFLIGHT";
pub const CONFIRM_POLL_MS_VAR: &str = "CONFIRM_POLL_MS";
pub const ACCOUNT_POLL_MS_VAR: &str = "ACCOUNT_POLL_MS";

const DEFAULT_CONFIRM_POLL_MS: u64 = 500;
const DEFAULT_ACCOUNT_POLL_MS: u64 = 1_000;

/// Network environment tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkEnv {
    #[default]
    Devnet,
    MainnetBeta,
    Localnet,
}

impl NetworkEnv {
    /// Public RPC endpoint used when `RPC_URL` is not set
    #[must_use]
    pub const fn default_rpc_url(self) -> &'static str {
        match self {
            Self::Devnet => "https://api.devnet.solana.com",
            Self::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Self::Localnet => "http://127.0.0.1:8899",
        }
    }

    #[must_use]
    pub const fn is_mainnet(self) -> bool {
        matches!(self, Self::MainnetBeta)
    }
}

impl FromStr for NetworkEnv {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "devnet" => Ok(Self::Devnet),
            "mainnet-beta" | "mainnet" => Ok(Self::MainnetBeta),
            "localnet" | "local" => Ok(Self::Localnet),
            other => Err(format!(
                "Invalid network environment '{other}' (expected devnet, mainnet-beta or localnet)"
            )),
        }
    }
}

impl fmt::Display for NetworkEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Devnet => "devnet",
            Self::MainnetBeta => "mainnet-beta",
            Self::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

/// Parse a commitment level name
///
/// # Errors
/// Returns a configuration error for unknown names
pub fn parse_commitment(s: &str) -> Result<CommitmentConfig> {
    match s.to_lowercase().as_str() {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        other => Err(OpsError::Config(format!(
            "Invalid {COMMITMENT_VAR} '{other}' (expected processed, confirmed or finalized)"
        ))),
    }
}

/// Configuration for one administrative invocation
#[derive(Debug, Clone)]
pub struct OpsConfig {
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Protocol program address
    pub program_id: Pubkey,
    /// Signer key file
    pub keypair_path: PathBuf,
    /// Network environment tag
    pub env: NetworkEnv,
    /// Commitment level a transaction must reach to count as confirmed
    pub commitment: CommitmentConfig,
    /// Skip preflight simulation on submit
    pub skip_preflight: bool,
    /// Interval between signature status polls
    pub confirm_poll_interval: Duration,
    /// Interval between subscription account refreshes
    pub account_poll_interval: Duration,
}

impl OpsConfig {
    /// Load configuration from process environment variables
    ///
    /// # Errors
    /// Returns a configuration error naming the missing or invalid setting
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns a configuration error naming the missing or invalid setting
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let env = get(ENV_VAR)
            .map(|value| value.parse::<NetworkEnv>())
            .transpose()
            .map_err(OpsError::Config)?
            .unwrap_or_default();

        let rpc_url = get(RPC_URL_VAR).unwrap_or_else(|| env.default_rpc_url().to_string());

        let program_id_str = get(PROGRAM_ID_VAR).ok_or_else(|| {
            OpsError::Config(format!(
                "{PROGRAM_ID_VAR} is not set. Set it to the deployed protocol program address."
            ))
        })?;
        let program_id = parse_program_id(&program_id_str)?;

        let keypair_path = get(KEYPAIR_PATH_VAR)
            .or_else(|| get(ANCHOR_WALLET_VAR))
            .map(PathBuf::from)
            .ok_or_else(|| {
                OpsError::Config(format!(
                    "{KEYPAIR_PATH_VAR} is not set. Point it (or {ANCHOR_WALLET_VAR}) at the signer key file."
                ))
            })?;

        let commitment = get(COMMITMENT_VAR)
            .map(|value| parse_commitment(&value))
            .transpose()?
            .unwrap_or_else(CommitmentConfig::confirmed);

        let skip_preflight = get(SKIP_PREFLIGHT_VAR)
            .map(|value| parse_bool(SKIP_PREFLIGHT_VAR, &value))
            .transpose()?
            .unwrap_or(false);

        let confirm_poll_interval = Duration::from_millis(
            get(CONFIRM_POLL_MS_VAR)
                .map(|value| parse_millis(CONFIRM_POLL_MS_VAR, &value))
                .transpose()?
                .unwrap_or(DEFAULT_CONFIRM_POLL_MS),
        );

        let account_poll_interval = Duration::from_millis(
            get(ACCOUNT_POLL_MS_VAR)
                .map(|value| parse_millis(ACCOUNT_POLL_MS_VAR, &value))
                .transpose()?
                .unwrap_or(DEFAULT_ACCOUNT_POLL_MS),
        );

        Ok(Self {
            rpc_url,
            program_id,
            keypair_path,
            env,
            commitment,
            skip_preflight,
            confirm_poll_interval,
            account_poll_interval,
        })
    }

    /// Override the RPC endpoint
    #[must_use]
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Override the program address
    #[must_use]
    pub const fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    /// Override the signer key file
    #[must_use]
    pub fn with_keypair_path(mut self, keypair_path: impl Into<PathBuf>) -> Self {
        self.keypair_path = keypair_path.into();
        self
    }

    /// Override the network environment tag
    #[must_use]
    pub const fn with_env(mut self, env: NetworkEnv) -> Self {
        self.env = env;
        self
    }

    /// Override the commitment level
    #[must_use]
    pub const fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    /// Override preflight behaviour
    #[must_use]
    pub const fn with_skip_preflight(mut self, skip_preflight: bool) -> Self {
        self.skip_preflight = skip_preflight;
        self
    }

    /// Fail fast if the signer key file does not exist
    ///
    /// # Errors
    /// Returns a configuration error naming the missing path
    pub fn ensure_keypair_file(&self) -> Result<()> {
        if self.keypair_path.is_file() {
            Ok(())
        } else {
            Err(OpsError::Config(format!(
                "Signer key file not found: {}",
                self.keypair_path.display()
            )))
        }
    }
}

/// Parse a program address, naming the setting on failure
///
/// # Errors
/// Returns a configuration error if the address is not a valid pubkey
pub fn parse_program_id(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim()).map_err(|e| {
        OpsError::Config(format!("Invalid {PROGRAM_ID_VAR} '{value}': {e}"))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(OpsError::Config(format!(
            "Invalid {key} '{other}' (expected true or false)"
        ))),
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|e| OpsError::Config(format!("Invalid {key} '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const PROGRAM: &str = "dRiftyHA39MWEi3m9aunc5MzRF1JYuBsbn6VPcn33UH";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, PROGRAM),
            (KEYPAIR_PATH_VAR, "/tmp/admin.json"),
        ]))
        .unwrap();

        assert_eq!(config.rpc_url, "https://api.devnet.solana.com");
        assert_eq!(config.env, NetworkEnv::Devnet);
        assert_eq!(config.program_id.to_string(), PROGRAM);
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
        assert!(!config.skip_preflight);
        assert_eq!(config.confirm_poll_interval, Duration::from_millis(500));
        assert_eq!(config.account_poll_interval, Duration::from_millis(1_000));
    }

    #[test]
    fn test_missing_program_id_names_setting() {
        let err = OpsConfig::from_lookup(lookup(&[(KEYPAIR_PATH_VAR, "/tmp/admin.json")]))
            .unwrap_err();
        assert!(matches!(err, OpsError::Config(_)));
        assert!(err.to_string().contains(PROGRAM_ID_VAR));
    }

    #[test]
    fn test_missing_keypair_path_names_setting() {
        let err = OpsConfig::from_lookup(lookup(&[(PROGRAM_ID_VAR, PROGRAM)])).unwrap_err();
        assert!(err.to_string().contains(KEYPAIR_PATH_VAR));
    }

    #[test]
    fn test_anchor_wallet_fallback() {
        let config = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, PROGRAM),
            (ANCHOR_WALLET_VAR, "/home/ops/.config/solana/id.json"),
        ]))
        .unwrap();
        assert_eq!(
            config.keypair_path,
            PathBuf::from("/home/ops/.config/solana/id.json")
        );
    }

    #[test]
    fn test_env_selects_default_rpc() {
        let config = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, PROGRAM),
            (KEYPAIR_PATH_VAR, "/tmp/admin.json"),
            (ENV_VAR, "localnet"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8899");

        let config = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, PROGRAM),
            (KEYPAIR_PATH_VAR, "/tmp/admin.json"),
            (ENV_VAR, "mainnet-beta"),
            (RPC_URL_VAR, "https://rpc.example.org"),
        ]))
        .unwrap();
        assert_eq!(config.rpc_url, "https://rpc.example.org");
        assert!(config.env.is_mainnet());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [(PROGRAM_ID_VAR, PROGRAM), (KEYPAIR_PATH_VAR, "/tmp/admin.json")];

        let mut pairs = base.to_vec();
        pairs.push((COMMITMENT_VAR, "eventually"));
        assert!(OpsConfig::from_lookup(lookup(&pairs)).is_err());

        let mut pairs = base.to_vec();
        pairs.push((SKIP_PREFLIGHT_VAR, "maybe"));
        assert!(OpsConfig::from_lookup(lookup(&pairs)).is_err());

        let err = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, "not-a-pubkey"),
            (KEYPAIR_PATH_VAR, "/tmp/admin.json"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("Invalid PROGRAM_ID"));
    }

    #[test]
    fn test_ensure_keypair_file() {
        let config = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, PROGRAM),
            (KEYPAIR_PATH_VAR, "/nonexistent/admin.json"),
        ]))
        .unwrap();
        let err = config.ensure_keypair_file().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/admin.json"));
    }

    #[test]
    fn test_overrides() {
        let config = OpsConfig::from_lookup(lookup(&[
            (PROGRAM_ID_VAR, PROGRAM),
            (KEYPAIR_PATH_VAR, "/tmp/admin.json"),
        ]))
        .unwrap()
        .with_rpc_url("http://localhost:8899")
        .with_skip_preflight(true)
        .with_commitment(CommitmentConfig::finalized());

        assert_eq!(config.rpc_url, "http://localhost:8899");
        assert!(config.skip_preflight);
        assert_eq!(config.commitment, CommitmentConfig::finalized());
    }
}
