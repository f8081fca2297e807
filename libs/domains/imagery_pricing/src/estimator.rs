//! Credit cost aggregation.

use std::collections::BTreeMap;

use crate::catalog::PricingCatalog;
use crate::error::{PricingError, PricingResult};
use crate::models::{EstimationRequest, EstimationResult};

/// Rates are quoted per this many square meters
pub const PRICING_UNIT_SQUARE_METERS: f64 = 1000.0;

/// Price every selected resource of `request` over `area` m².
///
/// Costs are kept exact; rounding is left to presentation
/// ([`EstimationResult::rounded_total`]).
pub fn estimate(
    request: &EstimationRequest,
    area: f64,
    catalog: &PricingCatalog,
) -> PricingResult<EstimationResult> {
    if !area.is_finite() || area <= 0.0 {
        return Err(PricingError::InvalidArea(area));
    }

    let units = area / PRICING_UNIT_SQUARE_METERS;
    let mut breakdown = BTreeMap::new();

    for &resource in &request.resources {
        let rule = catalog.lookup(resource)?;
        let cost = rule.credit_rate_per_1000_sqm * units * rule.multiplier_for(request.capture_mode);

        if !cost.is_finite() {
            return Err(PricingError::InvalidPricingRule {
                resource,
                reason: format!("cost is not a finite number ({cost})"),
            });
        }
        if cost < 0.0 {
            return Err(PricingError::InvalidPricingRule {
                resource,
                reason: format!("negative cost {cost}"),
            });
        }

        breakdown.insert(resource, cost);
    }

    Ok(EstimationResult {
        area_square_meters: area,
        capture_mode: request.capture_mode,
        total_credits: breakdown.values().sum(),
        breakdown,
    })
}
