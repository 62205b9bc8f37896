//! Inspect command implementation

use crate::commands::CommandContext;
use crate::utils::formatting::{
    format_inspection_human, format_inspection_json, Inspection, PerpMarketInfo, SpotMarketInfo,
    StateInfo,
};
use anyhow::Result;
use perp_ops_sdk::{ChainRpc, ProtocolClient};
use tracing::info;

/// Read the global state and every market up to `max_markets` per kind
///
/// # Errors
/// Returns an error if an RPC read fails or an account cannot be decoded
pub async fn collect<R: ChainRpc + 'static>(
    client: &ProtocolClient<R>,
    max_markets: u16,
) -> Result<Inspection> {
    let state = client
        .get_state()
        .await?
        .map(|state| StateInfo::new(&client.state_address(), &state));
    let spot_markets = client
        .list_spot_markets(max_markets)
        .await?
        .iter()
        .map(|(index, market)| SpotMarketInfo::new(*index, market))
        .collect();
    let perp_markets = client
        .list_perp_markets(max_markets)
        .await?
        .iter()
        .map(|(index, market)| PerpMarketInfo::new(*index, market))
        .collect();

    Ok(Inspection {
        program_id: client.program_id().to_string(),
        state,
        spot_markets,
        perp_markets,
    })
}

/// Execute the inspect command
///
/// Read-only; never signs or submits.
///
/// # Errors
/// Returns an error if reading or formatting fails
pub async fn execute(ctx: &CommandContext, json: bool) -> Result<String> {
    info!("Inspecting program {}", ctx.client.program_id());

    let inspection = collect(&ctx.client, ctx.config.max_market_probe).await?;
    info!(
        "Found {} spot and {} perp markets",
        inspection.spot_markets.len(),
        inspection.perp_markets.len()
    );

    if json {
        format_inspection_json(&inspection)
    } else {
        Ok(format_inspection_human(&inspection))
    }
}
