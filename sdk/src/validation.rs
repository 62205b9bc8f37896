//! Local sanity checks run before anything is submitted
//!
//! These mirror the constraints the program enforces on market and order
//! parameters, so obviously wrong values fail fast with a readable message
//! instead of an opaque custom program error. Values are still forwarded to the
//! program exactly as given.

use crate::{
    error::{OpsError, Result},
    program_types::{
        InitializePerpMarketArgs, InitializeSpotMarketArgs, OrderParams, OrderType,
        PostOnlyParam, IF_FACTOR_PRECISION, LIQUIDATION_FEE_PRECISION, MARGIN_PRECISION,
        SPOT_UTILIZATION_PRECISION, SPOT_WEIGHT_PRECISION,
    },
};

fn invalid(message: String) -> OpsError {
    OpsError::Validation(message)
}

/// Validate spot market parameters
///
/// Weights use `SPOT_WEIGHT_PRECISION` (10_000 == 1.0). Asset weights may not
/// exceed 1.0 and liability weights may not go below it.
///
/// # Errors
/// Returns a validation error describing the first violated constraint
pub fn validate_spot_market_args(args: &InitializeSpotMarketArgs) -> Result<()> {
    if args.maintenance_asset_weight > SPOT_WEIGHT_PRECISION {
        return Err(invalid(format!(
            "maintenance_asset_weight {} exceeds the weight precision {SPOT_WEIGHT_PRECISION} (1.0)",
            args.maintenance_asset_weight
        )));
    }

    if args.initial_asset_weight > args.maintenance_asset_weight {
        return Err(invalid(format!(
            "initial_asset_weight {} must not exceed maintenance_asset_weight {}",
            args.initial_asset_weight, args.maintenance_asset_weight
        )));
    }

    if args.maintenance_liability_weight < SPOT_WEIGHT_PRECISION {
        return Err(invalid(format!(
            "maintenance_liability_weight {} is below the weight precision {SPOT_WEIGHT_PRECISION} (1.0)",
            args.maintenance_liability_weight
        )));
    }

    if args.initial_liability_weight < args.maintenance_liability_weight {
        return Err(invalid(format!(
            "initial_liability_weight {} must be at least maintenance_liability_weight {}",
            args.initial_liability_weight, args.maintenance_liability_weight
        )));
    }

    if args.optimal_utilization > SPOT_UTILIZATION_PRECISION {
        return Err(invalid(format!(
            "optimal_utilization {} exceeds {SPOT_UTILIZATION_PRECISION} (100%)",
            args.optimal_utilization
        )));
    }

    if args.optimal_borrow_rate > args.max_borrow_rate {
        return Err(invalid(format!(
            "optimal_borrow_rate {} must not exceed max_borrow_rate {}",
            args.optimal_borrow_rate, args.max_borrow_rate
        )));
    }

    validate_liquidator_fee(args.liquidator_fee)?;

    if args.if_total_factor > IF_FACTOR_PRECISION {
        return Err(invalid(format!(
            "if_total_factor {} exceeds {IF_FACTOR_PRECISION} (100%)",
            args.if_total_factor
        )));
    }

    validate_tick_and_step(args.order_tick_size, args.order_step_size)
}

/// Validate perp market parameters
///
/// # Errors
/// Returns a validation error describing the first violated constraint
pub fn validate_perp_market_args(args: &InitializePerpMarketArgs) -> Result<()> {
    if args.margin_ratio_maintenance == 0 {
        return Err(invalid(
            "margin_ratio_maintenance must be greater than 0".to_string(),
        ));
    }

    if args.margin_ratio_maintenance >= args.margin_ratio_initial {
        return Err(invalid(format!(
            "margin_ratio_maintenance {} must be below margin_ratio_initial {}",
            args.margin_ratio_maintenance, args.margin_ratio_initial
        )));
    }

    if args.margin_ratio_initial > MARGIN_PRECISION {
        return Err(invalid(format!(
            "margin_ratio_initial {} exceeds the margin precision {MARGIN_PRECISION} (100%)",
            args.margin_ratio_initial
        )));
    }

    if args.amm_base_asset_reserve == 0 || args.amm_quote_asset_reserve == 0 {
        return Err(invalid("AMM reserves must be greater than 0".to_string()));
    }

    if args.amm_peg_multiplier == 0 {
        return Err(invalid(
            "amm_peg_multiplier must be greater than 0".to_string(),
        ));
    }

    if args.amm_periodicity <= 0 {
        return Err(invalid(format!(
            "amm_periodicity must be positive (got {})",
            args.amm_periodicity
        )));
    }

    if args.base_spread > args.max_spread {
        return Err(invalid(format!(
            "base_spread {} must not exceed max_spread {}",
            args.base_spread, args.max_spread
        )));
    }

    validate_tick_and_step(args.order_tick_size, args.order_step_size)?;

    if args.min_order_size < args.order_step_size {
        return Err(invalid(format!(
            "min_order_size {} must be at least order_step_size {}",
            args.min_order_size, args.order_step_size
        )));
    }

    validate_liquidator_fee(args.liquidator_fee)
}

/// Validate order parameters
///
/// # Errors
/// Returns a validation error describing the first violated constraint
pub fn validate_order_params(params: &OrderParams) -> Result<()> {
    if params.base_asset_amount == 0 {
        return Err(invalid(
            "Order base_asset_amount must be greater than 0".to_string(),
        ));
    }

    if matches!(params.order_type, OrderType::Limit | OrderType::TriggerLimit)
        && params.price == 0
        && params.oracle_price_offset.is_none()
    {
        return Err(invalid(format!(
            "{} orders need a non-zero price or an oracle price offset",
            params.order_type
        )));
    }

    if params.order_type == OrderType::Market && params.post_only != PostOnlyParam::None {
        return Err(invalid(format!(
            "Market orders cannot be post-only (got {})",
            params.post_only
        )));
    }

    Ok(())
}

fn validate_liquidator_fee(fee: u32) -> Result<()> {
    if fee >= LIQUIDATION_FEE_PRECISION {
        return Err(invalid(format!(
            "liquidator_fee {fee} must be below {LIQUIDATION_FEE_PRECISION} (100%)"
        )));
    }
    Ok(())
}

fn validate_tick_and_step(tick_size: u64, step_size: u64) -> Result<()> {
    if tick_size == 0 {
        return Err(invalid("order_tick_size must be greater than 0".to_string()));
    }
    if step_size == 0 {
        return Err(invalid("order_step_size must be greater than 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program_types::{
        encode_name, AssetTier, ContractTier, OracleSource, PositionDirection,
        AMM_RESERVE_PRECISION, BASE_PRECISION, PEG_PRECISION, PRICE_PRECISION,
    };

    fn spot_args() -> InitializeSpotMarketArgs {
        InitializeSpotMarketArgs {
            optimal_utilization: 700_000,
            optimal_borrow_rate: 50_000,
            max_borrow_rate: 1_000_000,
            oracle_source: OracleSource::PythPull,
            initial_asset_weight: 8_000,
            maintenance_asset_weight: 9_000,
            initial_liability_weight: 12_000,
            maintenance_liability_weight: 11_000,
            imf_factor: 0,
            liquidator_fee: 5_000,
            if_liquidation_fee: 10_000,
            active_status: true,
            asset_tier: AssetTier::Collateral,
            scale_initial_asset_weight_start: 0,
            withdraw_guard_threshold: 0,
            order_tick_size: 1,
            order_step_size: 1,
            if_total_factor: 0,
            name: encode_name("SOL").unwrap(),
        }
    }

    fn perp_args() -> InitializePerpMarketArgs {
        InitializePerpMarketArgs {
            market_index: 0,
            amm_base_asset_reserve: AMM_RESERVE_PRECISION,
            amm_quote_asset_reserve: AMM_RESERVE_PRECISION,
            amm_periodicity: 3_600,
            amm_peg_multiplier: PEG_PRECISION,
            oracle_source: OracleSource::PythPull,
            contract_tier: ContractTier::A,
            margin_ratio_initial: 2_000,
            margin_ratio_maintenance: 500,
            liquidator_fee: 0,
            if_liquidation_fee: 0,
            imf_factor: 0,
            active_status: true,
            base_spread: 0,
            max_spread: 0,
            max_open_interest: 0,
            max_revenue_withdraw_per_period: 0,
            quote_max_insurance: 0,
            order_step_size: 1_000,
            order_tick_size: 1,
            min_order_size: 1_000,
            concentration_coef_scale: 0,
            curve_update_intensity: 0,
            amm_jit_intensity: 0,
            name: encode_name("SOL-PERP").unwrap(),
        }
    }

    #[test]
    fn test_validate_spot_market_args() {
        assert!(validate_spot_market_args(&spot_args()).is_ok());

        // Boundary values are accepted
        let mut args = spot_args();
        args.initial_asset_weight = SPOT_WEIGHT_PRECISION;
        args.maintenance_asset_weight = SPOT_WEIGHT_PRECISION;
        args.initial_liability_weight = SPOT_WEIGHT_PRECISION;
        args.maintenance_liability_weight = SPOT_WEIGHT_PRECISION;
        assert!(validate_spot_market_args(&args).is_ok());
    }

    #[test]
    fn test_asset_weight_over_precision_is_descriptive() {
        let mut args = spot_args();
        args.maintenance_asset_weight = 12_000;

        let err = validate_spot_market_args(&args).unwrap_err();
        assert!(matches!(err, OpsError::Validation(_)));
        let msg = err.to_string();
        assert!(msg.contains("maintenance_asset_weight 12000"));
        assert!(msg.contains("10000"));
    }

    #[test]
    fn test_spot_weight_ordering() {
        let mut args = spot_args();
        args.initial_asset_weight = 9_500;
        assert!(validate_spot_market_args(&args).is_err());

        let mut args = spot_args();
        args.maintenance_liability_weight = 9_000;
        assert!(validate_spot_market_args(&args).is_err());

        let mut args = spot_args();
        args.initial_liability_weight = 10_500;
        assert!(validate_spot_market_args(&args).is_err());
    }

    #[test]
    fn test_spot_rates_and_sizes() {
        let mut args = spot_args();
        args.optimal_utilization = SPOT_UTILIZATION_PRECISION + 1;
        assert!(validate_spot_market_args(&args).is_err());

        let mut args = spot_args();
        args.optimal_borrow_rate = args.max_borrow_rate + 1;
        assert!(validate_spot_market_args(&args).is_err());

        let mut args = spot_args();
        args.liquidator_fee = LIQUIDATION_FEE_PRECISION;
        assert!(validate_spot_market_args(&args).is_err());

        let mut args = spot_args();
        args.order_step_size = 0;
        assert!(validate_spot_market_args(&args).is_err());
    }

    #[test]
    fn test_validate_perp_market_args() {
        assert!(validate_perp_market_args(&perp_args()).is_ok());

        let mut args = perp_args();
        args.margin_ratio_maintenance = args.margin_ratio_initial;
        assert!(validate_perp_market_args(&args).is_err());

        let mut args = perp_args();
        args.margin_ratio_initial = MARGIN_PRECISION + 1;
        assert!(validate_perp_market_args(&args).is_err());

        let mut args = perp_args();
        args.margin_ratio_maintenance = 0;
        assert!(validate_perp_market_args(&args).is_err());

        let mut args = perp_args();
        args.amm_peg_multiplier = 0;
        assert!(validate_perp_market_args(&args).is_err());

        let mut args = perp_args();
        args.amm_periodicity = 0;
        assert!(validate_perp_market_args(&args).is_err());

        let mut args = perp_args();
        args.base_spread = 10;
        assert!(validate_perp_market_args(&args).is_err());

        let mut args = perp_args();
        args.min_order_size = 10;
        assert!(validate_perp_market_args(&args).is_err());
    }

    #[test]
    fn test_validate_order_params() {
        let limit = OrderParams {
            order_type: OrderType::Limit,
            direction: PositionDirection::Long,
            base_asset_amount: BASE_PRECISION,
            price: 100 * PRICE_PRECISION,
            ..OrderParams::default()
        };
        assert!(validate_order_params(&limit).is_ok());

        let zero_size = OrderParams {
            base_asset_amount: 0,
            ..limit.clone()
        };
        assert!(validate_order_params(&zero_size).is_err());

        let no_price = OrderParams {
            price: 0,
            ..limit.clone()
        };
        assert!(validate_order_params(&no_price).is_err());

        let oracle_offset = OrderParams {
            price: 0,
            oracle_price_offset: Some(-50_000),
            ..limit.clone()
        };
        assert!(validate_order_params(&oracle_offset).is_ok());

        let market_post_only = OrderParams {
            order_type: OrderType::Market,
            price: 0,
            post_only: PostOnlyParam::MustPostOnly,
            ..limit
        };
        assert!(validate_order_params(&market_post_only).is_err());
    }
}
