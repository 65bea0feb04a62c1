//! Vendor route definitions and segment pricing

use crate::error::{FreightError, Result};
use crate::types::{PartyId, RouteId, VehicleType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::geo::GeoPoint;

/// An intermediate stop on a vendor route
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteStop {
    pub city: String,
    pub location: GeoPoint,
    /// Position in the route, starting at 1
    pub stop_order: u32,
    pub distance_from_origin_km: f64,
    pub can_pickup: bool,
    pub can_drop: bool,
}

/// Pricing for one city-pair segment of a route and one vehicle type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoutePricing {
    pub vehicle_type: VehicleType,
    pub from_city: String,
    pub to_city: String,
    pub segment_distance_km: Decimal,
    pub base_price: Decimal,
    pub price_per_km: Decimal,
    pub fuel_charges: Decimal,
    pub toll_charges: Decimal,
    pub loading_charges: Decimal,
    pub unloading_charges: Decimal,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub max_weight_capacity_kg: Decimal,
    pub available_vehicles: u32,
    pub active: bool,
}

/// A vendor's predefined route with optional intermediate stops.
/// Shared read-only by shipment matching; mutated only by its owning vendor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub vendor: PartyId,
    pub name: String,
    pub origin_city: String,
    pub origin: GeoPoint,
    pub destination_city: String,
    pub destination: GeoPoint,
    pub stops: Vec<RouteStop>,
    pub total_distance_km: f64,
    pub estimated_duration_hours: f64,
    pub active: bool,
    pub pricing: Vec<RoutePricing>,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Validate the stop sequence: strictly increasing order numbers and
    /// distances monotonic from the origin, all within the route length.
    pub fn validate(&self) -> Result<()> {
        let mut previous_order = 0u32;
        let mut previous_distance = 0.0f64;

        for stop in &self.stops {
            if stop.stop_order <= previous_order {
                return Err(FreightError::InvalidRoute(format!(
                    "stop '{}' breaks the stop ordering (order {} after {})",
                    stop.city, stop.stop_order, previous_order
                )));
            }
            if stop.distance_from_origin_km <= previous_distance {
                return Err(FreightError::InvalidRoute(format!(
                    "stop '{}' is not distance-monotonic from the origin",
                    stop.city
                )));
            }
            if stop.distance_from_origin_km >= self.total_distance_km {
                return Err(FreightError::InvalidRoute(format!(
                    "stop '{}' lies beyond the route length",
                    stop.city
                )));
            }
            previous_order = stop.stop_order;
            previous_distance = stop.distance_from_origin_km;
        }

        Ok(())
    }

    /// Active pricing rows for the given vehicle type with enough vehicles
    /// and weight capacity for the request
    pub fn eligible_pricing(
        &self,
        vehicle_type: &VehicleType,
        vehicle_count: u32,
        weight_kg: Decimal,
    ) -> impl Iterator<Item = &RoutePricing> + '_ {
        let vehicle_type = vehicle_type.clone();
        self.pricing.iter().filter(move |p| {
            p.active
                && p.vehicle_type.matches(&vehicle_type)
                && p.available_vehicles >= vehicle_count
                && p.max_weight_capacity_kg >= weight_kg
        })
    }
}
