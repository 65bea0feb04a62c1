//! Segment price computation and deal-probability heuristics

use crate::error::{FreightError, Result};
use crate::routing::RoutePricing;
use crate::types::DealProbability;
use rust_decimal::Decimal;

/// Total price for one vehicle over a pricing segment:
/// base + per-km rate over the segment distance + itemized surcharges,
/// clamped into the segment's [min_price, max_price] band.
pub fn segment_total(pricing: &RoutePricing) -> Result<Decimal> {
    validate_pricing(pricing)?;

    let total = pricing.base_price
        + pricing.price_per_km * pricing.segment_distance_km
        + pricing.fuel_charges
        + pricing.toll_charges
        + pricing.loading_charges
        + pricing.unloading_charges;

    Ok(total.clamp(pricing.min_price, pricing.max_price).round_dp(2))
}

/// Total for the requested vehicle count. The pricing model is per-vehicle:
/// the clamp applies to the single-vehicle total, then scales by count.
pub fn quote_total(pricing: &RoutePricing, vehicle_count: u32) -> Result<Decimal> {
    let per_vehicle = segment_total(pricing)?;
    Ok((per_vehicle * Decimal::from(vehicle_count)).round_dp(2))
}

fn validate_pricing(pricing: &RoutePricing) -> Result<()> {
    if pricing.min_price > pricing.max_price {
        return Err(FreightError::InvalidPricingConfiguration(format!(
            "min_price {} exceeds max_price {}",
            pricing.min_price, pricing.max_price
        )));
    }

    let surcharges = [
        ("fuel", pricing.fuel_charges),
        ("toll", pricing.toll_charges),
        ("loading", pricing.loading_charges),
        ("unloading", pricing.unloading_charges),
    ];
    for (name, value) in surcharges {
        if value < Decimal::ZERO {
            return Err(FreightError::InvalidPricingConfiguration(format!(
                "negative {} surcharge: {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Heuristic likelihood that a price band will be honored.
///
/// Supply side: plenty of vehicles relative to demand pushes the estimate up,
/// scarcity pushes it down. Price side: an estimate near the top of the band
/// is unlikely to be honored, one in the lower half is comfortable.
pub fn deal_probability(
    available_vehicles: u32,
    requested_vehicles: u32,
    estimated: Decimal,
    band_min: Decimal,
    band_max: Decimal,
) -> DealProbability {
    let position = if band_max > band_min {
        (estimated - band_min) / (band_max - band_min)
    } else {
        Decimal::new(5, 1) // point band: treat as mid-range
    };

    let scarce = available_vehicles < requested_vehicles;
    let comfortable = available_vehicles >= requested_vehicles.saturating_mul(2);

    if scarce || position > Decimal::new(85, 2) {
        DealProbability::Low
    } else if comfortable && position <= Decimal::new(5, 1) {
        DealProbability::High
    } else {
        DealProbability::Medium
    }
}
