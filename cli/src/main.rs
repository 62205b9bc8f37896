//! perp-ops - administrative command-line interface for a deployed perpetuals protocol
//!
//! Every state-changing command runs the same workflow: build, sign, send, confirm,
//! verify and report.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use perp_ops_cli::commands::{
    self, init_perp_market::InitPerpMarketOpts, init_spot_market::InitSpotMarketOpts,
    place_perp_order::PlacePerpOrderOpts, CommandContext,
};
use perp_ops_cli::{resolve_ops_config, CliConfig};
use perp_ops_sdk::config::{
    COMMITMENT_VAR, ENV_VAR, KEYPAIR_PATH_VAR, PROGRAM_ID_VAR, RPC_URL_VAR, SKIP_PREFLIGHT_VAR,
};
use perp_ops_sdk::OpsError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "perp-ops",
    version,
    about = "Administrative command-line interface for a deployed perpetuals protocol"
)]
struct Cli {
    /// RPC endpoint URL (overrides RPC_URL)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Protocol program address (overrides PROGRAM_ID)
    #[arg(long, global = true)]
    program_id: Option<String>,

    /// Signer key file (overrides KEYPAIR_PATH / ANCHOR_WALLET)
    #[arg(long, global = true)]
    keypair: Option<String>,

    /// Network environment: devnet, mainnet-beta or localnet (overrides ENV)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Commitment level: processed, confirmed or finalized (overrides COMMITMENT)
    #[arg(long, global = true)]
    commitment: Option<String>,

    /// Skip the node's preflight simulation
    #[arg(long, global = true)]
    skip_preflight: bool,

    /// Output format
    #[arg(long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Memo attached to every submitted transaction
    #[arg(long, global = true)]
    memo: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the global state with the signer as admin (once per deployment)
    Initialize {
        /// Mint of the quote asset (spot market 0)
        #[arg(long)]
        quote_asset_mint: String,
    },

    /// Rotate the protocol admin
    UpdateAdmin {
        /// New admin address
        #[arg(long)]
        new_admin: String,
    },

    /// Create a spot market at the next free index
    InitSpotMarket(InitSpotMarketOpts),

    /// Create a perp market
    InitPerpMarket(InitPerpMarketOpts),

    /// Create a user account (and user stats, if missing) for the signer
    InitUser {
        /// Sub-account id
        #[arg(long, default_value = "0")]
        sub_account_id: u16,

        /// Account name (at most 32 bytes)
        #[arg(long, default_value = "Main Account")]
        name: String,
    },

    /// Place a perp order from the signer's account
    PlacePerpOrder(PlacePerpOrderOpts),

    /// Show the global state and every market (read-only)
    Inspect,

    /// Mint test tokens to a recipient (refused on mainnet)
    MintDevnetTokens {
        /// Token mint; the signer must be its mint authority
        #[arg(long)]
        mint: String,

        /// Recipient wallet; defaults to the signer
        #[arg(long)]
        recipient: Option<String>,

        /// Amount in the mint's base units
        #[arg(long)]
        amount: u64,
    },
}

impl Cli {
    /// Connection settings given on the command line, keyed by their variable names
    fn ops_overrides(&self) -> Vec<(&'static str, String)> {
        let flags = [
            (RPC_URL_VAR, &self.rpc_url),
            (PROGRAM_ID_VAR, &self.program_id),
            (KEYPAIR_PATH_VAR, &self.keypair),
            (ENV_VAR, &self.env),
            (COMMITMENT_VAR, &self.commitment),
        ];
        let mut overrides: Vec<(&'static str, String)> = flags
            .into_iter()
            .filter_map(|(name, value)| value.clone().map(|value| (name, value)))
            .collect();
        if self.skip_preflight {
            overrides.push((SKIP_PREFLIGHT_VAR, "true".to_string()));
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = CliConfig::new();

    let default_output_format = parse_output_format(&config.default_output_format)?;
    let output_format = cli.output.unwrap_or(default_output_format);

    let result = match resolve_ops_config(&cli.ops_overrides(), |key| std::env::var(key).ok()) {
        Ok(ops) => {
            let ctx = CommandContext::new(ops, config, cli.memo.clone());
            execute_command(&cli, &ctx, output_format).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(output) => match output_format {
            OutputFormat::Human => println!("{output}"),
            OutputFormat::Json => {
                // structured command output is embedded as-is
                let data = serde_json::from_str::<serde_json::Value>(&output)
                    .unwrap_or(serde_json::Value::String(output));
                let json_output = serde_json::json!({
                    "success": true,
                    "data": data
                });
                println!("{}", serde_json::to_string_pretty(&json_output)?);
            }
        },
        Err(e) => {
            match output_format {
                OutputFormat::Human => eprintln!("{}", render_failure(&e)),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&failure_json(&e))?);
                }
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Program logs and whether the failure is known to precede any submission
fn failure_details(e: &anyhow::Error) -> (&[String], bool) {
    match e.downcast_ref::<OpsError>() {
        Some(err) => (err.program_logs(), err.is_local()),
        None => (&[] as &[String], false),
    }
}

/// Human-readable failure report for stderr
fn render_failure(e: &anyhow::Error) -> String {
    let (logs, local) = failure_details(e);
    let mut text = format!("Error: {e}");
    if local {
        text.push_str("\nNothing was submitted to the network.");
    }
    if !logs.is_empty() {
        text.push_str("\nProgram logs:");
        for line in logs {
            text.push_str("\n  ");
            text.push_str(line);
        }
    }
    text
}

/// JSON failure envelope
fn failure_json(e: &anyhow::Error) -> serde_json::Value {
    let (logs, local) = failure_details(e);
    serde_json::json!({
        "success": false,
        "error": e.to_string(),
        "local": local,
        "logs": logs
    })
}

/// Parse output format from string
fn parse_output_format(format_str: &str) -> Result<OutputFormat> {
    match format_str.to_lowercase().as_str() {
        "human" => Ok(OutputFormat::Human),
        "json" => Ok(OutputFormat::Json),
        _ => Err(anyhow::anyhow!("Invalid output format: {format_str}")),
    }
}

async fn execute_command(
    cli: &Cli,
    ctx: &CommandContext,
    output_format: OutputFormat,
) -> Result<String> {
    match &cli.command {
        Commands::Initialize { quote_asset_mint } => {
            commands::execute_initialize(ctx, quote_asset_mint).await
        }

        Commands::UpdateAdmin { new_admin } => commands::execute_update_admin(ctx, new_admin).await,

        Commands::InitSpotMarket(opts) => commands::execute_init_spot_market(ctx, opts).await,

        Commands::InitPerpMarket(opts) => commands::execute_init_perp_market(ctx, opts).await,

        Commands::InitUser {
            sub_account_id,
            name,
        } => commands::execute_init_user(ctx, *sub_account_id, name).await,

        Commands::PlacePerpOrder(opts) => commands::execute_place_perp_order(ctx, opts).await,

        Commands::Inspect => {
            commands::execute_inspect(ctx, output_format == OutputFormat::Json).await
        }

        Commands::MintDevnetTokens {
            mint,
            recipient,
            amount,
        } => {
            commands::execute_mint_devnet_tokens(ctx, mint, recipient.as_deref(), *amount).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "perp-ops",
            "inspect",
            "--env",
            "localnet",
            "--keypair",
            "/keys/admin.json",
            "--skip-preflight",
        ])
        .unwrap();

        let overrides = cli.ops_overrides();
        assert!(overrides.contains(&(ENV_VAR, "localnet".to_string())));
        assert!(overrides.contains(&(KEYPAIR_PATH_VAR, "/keys/admin.json".to_string())));
        assert!(overrides.contains(&(SKIP_PREFLIGHT_VAR, "true".to_string())));
        assert!(!overrides.iter().any(|(name, _)| *name == RPC_URL_VAR));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "perp-ops",
            "--output",
            "json",
            "mint-devnet-tokens",
            "--mint",
            "So11111111111111111111111111111111111111112",
            "--amount",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::MintDevnetTokens { amount: 5, recipient: None, .. }
        ));
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!(parse_output_format("JSON").unwrap(), OutputFormat::Json);
        assert!(parse_output_format("yaml").is_err());
    }

    #[test]
    fn test_local_failure_says_nothing_was_submitted() {
        let e = anyhow::Error::from(OpsError::Validation(
            "maintenance_asset_weight 12000 exceeds initial_asset_weight".to_string(),
        ));

        let text = render_failure(&e);
        assert!(text.starts_with("Error: "));
        assert!(text.contains("Nothing was submitted to the network."));
        assert!(!text.contains("Program logs:"));

        let json = failure_json(&e);
        assert_eq!(json["success"], false);
        assert_eq!(json["local"], true);
    }

    #[test]
    fn test_network_failure_reports_program_logs() {
        let e = anyhow::Error::from(OpsError::Submission {
            reason: "custom program error: 0x7d1".to_string(),
            logs: vec!["Program log: Error Code: ConstraintHasOne.".to_string()],
        });

        let text = render_failure(&e);
        assert!(!text.contains("Nothing was submitted"));
        assert!(text.contains("Program logs:\n  Program log: Error Code: ConstraintHasOne."));

        let json = failure_json(&e);
        assert_eq!(json["local"], false);
        assert_eq!(json["logs"][0], "Program log: Error Code: ConstraintHasOne.");
    }
}
