//! Matches shipment requests against vendor routes and prices the matches

use crate::pricing;
use crate::quotation::{PriceRange, RouteKind, ShipmentRequest};
use crate::types::{DealProbability, PartyId, RouteId};
use rust_decimal::Decimal;
use std::collections::HashSet;

use super::types::Route;

/// Operational matching tolerance: a pickup or drop point counts as served
/// by a route point when it lies within this radius.
pub const MATCH_TOLERANCE_KM: f64 = 50.0;

/// Markup band applied to miscellaneous (off-network) estimates
const MISC_MARKUP_MIN: Decimal = Decimal::from_parts(12, 0, 0, false, 1);
const MISC_MARKUP_MAX: Decimal = Decimal::from_parts(15, 0, 0, false, 1);
const MISC_MARKUP_MID: Decimal = Decimal::from_parts(135, 0, 0, false, 2);

/// Fallback per-km rate when no vendor pricing exists at all
const MISC_DEFAULT_RATE_PER_KM: Decimal = Decimal::from_parts(25, 0, 0, false, 0);

/// One priced (route, pricing row) match before band aggregation
struct Candidate {
    route_id: RouteId,
    vendor: PartyId,
    total: Decimal,
    band_min: Decimal,
    band_max: Decimal,
    available_vehicles: u32,
    kind: RouteKind,
    duration_hours: f64,
}

/// Matches a shipment request against vendor routes within a fixed
/// distance tolerance and aggregates the results into anonymized
/// price ranges.
pub struct RouteMatcher {
    tolerance_km: f64,
}

impl RouteMatcher {
    pub fn new() -> Self {
        Self {
            tolerance_km: MATCH_TOLERANCE_KM,
        }
    }

    #[cfg(test)]
    fn with_tolerance(tolerance_km: f64) -> Self {
        Self { tolerance_km }
    }

    /// Produce one or more price ranges for the request. A request no route
    /// serves is classified miscellaneous and priced by estimate, never
    /// rejected.
    pub fn match_and_price(&self, request: &ShipmentRequest, routes: &[Route]) -> Vec<PriceRange> {
        let mut candidates = Vec::new();

        for route in routes.iter().filter(|r| r.active) {
            let Some(kind) = self.classify(request, route) else {
                continue;
            };

            for row in route.eligible_pricing(
                &request.vehicle_type,
                request.vehicle_count,
                request.weight_kg,
            ) {
                let total = match pricing::quote_total(row, request.vehicle_count) {
                    Ok(total) => total,
                    Err(err) => {
                        tracing::warn!(
                            route = %route.id,
                            segment = %format!("{} -> {}", row.from_city, row.to_city),
                            error = %err,
                            "Skipping misconfigured pricing row"
                        );
                        continue;
                    }
                };

                let count = Decimal::from(request.vehicle_count);
                candidates.push(Candidate {
                    route_id: route.id.clone(),
                    vendor: route.vendor.clone(),
                    total,
                    band_min: (row.min_price * count).round_dp(2),
                    band_max: (row.max_price * count).round_dp(2),
                    available_vehicles: row.available_vehicles,
                    kind,
                    duration_hours: route.estimated_duration_hours,
                });
            }
        }

        if candidates.is_empty() {
            return vec![self.miscellaneous_range(request, routes)];
        }

        merge_into_ranges(candidates, request.vehicle_count)
    }

    /// Classify how a route serves the request, if at all.
    ///
    /// Direct: both endpoints within tolerance of origin and destination.
    /// Via stops: pickup at the origin or a pickup-capable stop, drop at the
    /// destination or a later drop-capable stop; stop order is preserved,
    /// so a drop can never precede its pickup along the route.
    fn classify(&self, request: &ShipmentRequest, route: &Route) -> Option<RouteKind> {
        let pickup_at_origin = request.pickup.within(&route.origin, self.tolerance_km);
        let drop_at_destination = request.drop.within(&route.destination, self.tolerance_km);

        if pickup_at_origin && drop_at_destination {
            return Some(RouteKind::Direct);
        }

        // Pickup position along the route: 0 for the origin, else the first
        // pickup-capable stop within tolerance.
        let pickup_order = if pickup_at_origin {
            Some(0)
        } else {
            route
                .stops
                .iter()
                .find(|stop| stop.can_pickup && request.pickup.within(&stop.location, self.tolerance_km))
                .map(|stop| stop.stop_order)
        };
        let pickup_order = pickup_order?;

        if drop_at_destination {
            return Some(RouteKind::ViaStops);
        }

        let drop_matches_later_stop = route.stops.iter().any(|stop| {
            stop.can_drop
                && stop.stop_order > pickup_order
                && request.drop.within(&stop.location, self.tolerance_km)
        });

        drop_matches_later_stop.then_some(RouteKind::ViaStops)
    }

    /// Price an off-network request from the average per-km rate of the
    /// requested vehicle type (all rates when the type has none), marked up.
    fn miscellaneous_range(&self, request: &ShipmentRequest, routes: &[Route]) -> PriceRange {
        let rates: Vec<Decimal> = routes
            .iter()
            .flat_map(|r| r.pricing.iter())
            .filter(|p| p.active && p.vehicle_type.matches(&request.vehicle_type))
            .map(|p| p.price_per_km)
            .collect();

        let rates = if rates.is_empty() {
            routes
                .iter()
                .flat_map(|r| r.pricing.iter())
                .filter(|p| p.active)
                .map(|p| p.price_per_km)
                .collect()
        } else {
            rates
        };

        let rate = if rates.is_empty() {
            MISC_DEFAULT_RATE_PER_KM
        } else {
            rates.iter().copied().sum::<Decimal>() / Decimal::from(rates.len())
        };

        let distance_km = request.pickup.distance_km(&request.drop);
        let distance = Decimal::from_f64_retain(distance_km).unwrap_or(Decimal::ZERO);
        let base = rate * distance * Decimal::from(request.vehicle_count);

        tracing::debug!(
            request = %request.id,
            rate = %rate,
            distance_km,
            "No route match; pricing as miscellaneous"
        );

        PriceRange {
            min_price: (base * MISC_MARKUP_MIN).round_dp(2),
            max_price: (base * MISC_MARKUP_MAX).round_dp(2),
            estimated_price: (base * MISC_MARKUP_MID).round_dp(2),
            vehicles_available: 1,
            vendors_count: 1,
            deal_probability: DealProbability::Medium,
            route_kind: RouteKind::Miscellaneous,
            estimated_duration_hours: distance_km / 60.0,
            supporting_routes: Vec::new(),
        }
    }
}

impl Default for RouteMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge candidates whose price bands overlap into single ranges.
/// Disjoint bands stay separate; each range carries the union of supporting
/// routes and the sum of available vehicles.
fn merge_into_ranges(mut candidates: Vec<Candidate>, requested_vehicles: u32) -> Vec<PriceRange> {
    // Band order for interval merging
    candidates.sort_by(|a, b| {
        a.band_min
            .cmp(&b.band_min)
            .then(a.total.cmp(&b.total))
            .then(b.available_vehicles.cmp(&a.available_vehicles))
    });

    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    let mut group_max = Decimal::MIN;

    for candidate in candidates {
        let starts_new_group = groups.is_empty() || candidate.band_min > group_max;
        if starts_new_group {
            group_max = candidate.band_max;
            groups.push(vec![candidate]);
        } else {
            group_max = group_max.max(candidate.band_max);
            if let Some(group) = groups.last_mut() {
                group.push(candidate);
            }
        }
    }

    groups
        .into_iter()
        .map(|group| {
            // The bracket winner: lowest total, then most vehicles
            let winner = group
                .iter()
                .min_by(|a, b| {
                    a.total
                        .cmp(&b.total)
                        .then(b.available_vehicles.cmp(&a.available_vehicles))
                })
                .expect("merge groups are never empty");

            let band_min = group.iter().map(|c| c.band_min).min().unwrap_or_default();
            let band_max = group.iter().map(|c| c.band_max).max().unwrap_or_default();
            let estimated = (group.iter().map(|c| c.total).sum::<Decimal>()
                / Decimal::from(group.len()))
            .round_dp(2);

            let vehicles: u32 = group.iter().map(|c| c.available_vehicles).sum();
            let vendors: HashSet<&PartyId> = group.iter().map(|c| &c.vendor).collect();

            let mut supporting: Vec<RouteId> = Vec::new();
            for candidate in &group {
                if !supporting.contains(&candidate.route_id) {
                    supporting.push(candidate.route_id.clone());
                }
            }

            PriceRange {
                min_price: band_min,
                max_price: band_max,
                estimated_price: estimated,
                vehicles_available: vehicles,
                vendors_count: vendors.len() as u32,
                deal_probability: pricing::deal_probability(
                    vehicles,
                    requested_vehicles,
                    estimated,
                    band_min,
                    band_max,
                ),
                route_kind: winner.kind,
                estimated_duration_hours: winner.duration_hours,
                supporting_routes: supporting,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::types::{RoutePricing, RouteStop};
    use crate::routing::GeoPoint;
    use crate::types::{RequestId, VehicleType};
    use chrono::Utc;

    const MUMBAI: GeoPoint = GeoPoint {
        latitude: 18.9322,
        longitude: 72.8264,
    };
    const NASHIK: GeoPoint = GeoPoint {
        latitude: 19.9975,
        longitude: 73.7898,
    };
    const INDORE: GeoPoint = GeoPoint {
        latitude: 22.7196,
        longitude: 75.8577,
    };
    const DELHI: GeoPoint = GeoPoint {
        latitude: 28.6139,
        longitude: 77.2090,
    };
    const KOLKATA: GeoPoint = GeoPoint {
        latitude: 22.5726,
        longitude: 88.3639,
    };

    fn request(pickup: GeoPoint, drop: GeoPoint, vehicles: u32) -> ShipmentRequest {
        ShipmentRequest {
            id: RequestId::generate(),
            customer: PartyId("cust_1".to_string()),
            pickup,
            pickup_address: "pickup".to_string(),
            drop,
            drop_address: "drop".to_string(),
            pickup_date: Utc::now(),
            expected_delivery_date: Utc::now() + chrono::Duration::days(3),
            vehicle_type: VehicleType::new("Container"),
            vehicle_count: vehicles,
            weight_kg: Decimal::from(10000),
            cargo_description: "steel coils".to_string(),
            budget_min: None,
            budget_max: None,
            created_at: Utc::now(),
        }
    }

    fn pricing_row(min: i64, max: i64, per_km: i64, available: u32) -> RoutePricing {
        RoutePricing {
            vehicle_type: VehicleType::new("Container"),
            from_city: "Mumbai".to_string(),
            to_city: "Delhi".to_string(),
            segment_distance_km: Decimal::from(1400),
            base_price: Decimal::from(8000),
            price_per_km: Decimal::from(per_km),
            fuel_charges: Decimal::from(5000),
            toll_charges: Decimal::from(2000),
            loading_charges: Decimal::from(1000),
            unloading_charges: Decimal::from(1000),
            min_price: Decimal::from(min),
            max_price: Decimal::from(max),
            max_weight_capacity_kg: Decimal::from(25000),
            available_vehicles: available,
            active: true,
        }
    }

    fn route(vendor: &str, stops: Vec<RouteStop>, pricing: Vec<RoutePricing>) -> Route {
        Route {
            id: RouteId::generate(),
            vendor: PartyId(vendor.to_string()),
            name: "Mumbai to Delhi".to_string(),
            origin_city: "Mumbai".to_string(),
            origin: MUMBAI,
            destination_city: "Delhi".to_string(),
            destination: DELHI,
            stops,
            total_distance_km: 1400.0,
            estimated_duration_hours: 24.0,
            active: true,
            pricing,
            created_at: Utc::now(),
        }
    }

    fn stop(location: GeoPoint, order: u32, distance: f64, pickup: bool, drop: bool) -> RouteStop {
        RouteStop {
            city: format!("stop_{}", order),
            location,
            stop_order: order,
            distance_from_origin_km: distance,
            can_pickup: pickup,
            can_drop: drop,
        }
    }

    #[test]
    fn test_direct_match() {
        let matcher = RouteMatcher::new();
        let routes = vec![route("vend_1", vec![], vec![pricing_row(20000, 45000, 15, 4)])];

        let ranges = matcher.match_and_price(&request(MUMBAI, DELHI, 2), &routes);

        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].route_kind, RouteKind::Direct);
        assert_eq!(ranges[0].vendors_count, 1);
        // 38000 per vehicle, two vehicles
        assert_eq!(ranges[0].estimated_price, Decimal::from(76000));
        assert_eq!(ranges[0].min_price, Decimal::from(40000));
        assert_eq!(ranges[0].max_price, Decimal::from(90000));
    }

    #[test]
    fn test_via_stop_pickup() {
        let matcher = RouteMatcher::new();
        let routes = vec![route(
            "vend_1",
            vec![stop(NASHIK, 1, 170.0, true, true)],
            vec![pricing_row(20000, 45000, 15, 4)],
        )];

        // Pickup at the intermediate stop, drop at the destination
        let ranges = matcher.match_and_price(&request(NASHIK, DELHI, 1), &routes);
        assert_eq!(ranges[0].route_kind, RouteKind::ViaStops);
    }

    #[test]
    fn test_via_stop_drop_after_pickup() {
        let matcher = RouteMatcher::new();
        let routes = vec![route(
            "vend_1",
            vec![
                stop(NASHIK, 1, 170.0, true, false),
                stop(INDORE, 2, 600.0, false, true),
            ],
            vec![pricing_row(20000, 45000, 15, 4)],
        )];

        let ranges = matcher.match_and_price(&request(NASHIK, INDORE, 1), &routes);
        assert_eq!(ranges[0].route_kind, RouteKind::ViaStops);
    }

    #[test]
    fn test_backward_match_refused() {
        let matcher = RouteMatcher::new();
        let routes = vec![route(
            "vend_1",
            vec![
                stop(NASHIK, 1, 170.0, true, true),
                stop(INDORE, 2, 600.0, true, true),
            ],
            vec![pricing_row(20000, 45000, 15, 4)],
        )];

        // Pickup at the later stop, drop at the earlier one: off-network
        let ranges = matcher.match_and_price(&request(INDORE, NASHIK, 1), &routes);
        assert_eq!(ranges[0].route_kind, RouteKind::Miscellaneous);
    }

    #[test]
    fn test_pickup_incapable_stop_ignored() {
        let matcher = RouteMatcher::new();
        let routes = vec![route(
            "vend_1",
            vec![stop(NASHIK, 1, 170.0, false, true)],
            vec![pricing_row(20000, 45000, 15, 4)],
        )];

        let ranges = matcher.match_and_price(&request(NASHIK, DELHI, 1), &routes);
        assert_eq!(ranges[0].route_kind, RouteKind::Miscellaneous);
    }

    #[test]
    fn test_out_of_tolerance_is_miscellaneous() {
        let matcher = RouteMatcher::new();
        let routes = vec![route("vend_1", vec![], vec![pricing_row(20000, 45000, 15, 4)])];

        let ranges = matcher.match_and_price(&request(KOLKATA, DELHI, 1), &routes);

        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].route_kind, RouteKind::Miscellaneous);
        assert!(ranges[0].min_price > Decimal::ZERO);
        assert!(ranges[0].max_price > ranges[0].min_price);
    }

    #[test]
    fn test_miscellaneous_uses_markup_band() {
        let matcher = RouteMatcher::new();
        let ranges = matcher.match_and_price(&request(KOLKATA, DELHI, 1), &[]);

        let distance = Decimal::from_f64_retain(KOLKATA.distance_km(&DELHI)).unwrap();
        let base = MISC_DEFAULT_RATE_PER_KM * distance;

        let range = &ranges[0];
        assert_eq!(range.min_price, (base * MISC_MARKUP_MIN).round_dp(2));
        assert_eq!(range.max_price, (base * MISC_MARKUP_MAX).round_dp(2));
        assert_eq!(range.estimated_price, (base * MISC_MARKUP_MID).round_dp(2));
        assert_eq!(range.deal_probability, DealProbability::Medium);
    }

    #[test]
    fn test_insufficient_vehicles_excludes_row() {
        let matcher = RouteMatcher::new();
        let routes = vec![route("vend_1", vec![], vec![pricing_row(20000, 45000, 15, 1)])];

        // Request needs 3 vehicles, the row offers 1
        let ranges = matcher.match_and_price(&request(MUMBAI, DELHI, 3), &routes);
        assert_eq!(ranges[0].route_kind, RouteKind::Miscellaneous);
    }

    #[test]
    fn test_overlapping_bands_merge() {
        let matcher = RouteMatcher::new();
        let routes = vec![
            route("vend_1", vec![], vec![pricing_row(20000, 45000, 15, 4)]),
            route("vend_2", vec![], vec![pricing_row(30000, 60000, 18, 2)]),
        ];

        let ranges = matcher.match_and_price(&request(MUMBAI, DELHI, 1), &routes);

        assert_eq!(ranges.len(), 1);
        let range = &ranges[0];
        assert_eq!(range.min_price, Decimal::from(20000));
        assert_eq!(range.max_price, Decimal::from(60000));
        assert_eq!(range.vendors_count, 2);
        assert_eq!(range.vehicles_available, 6);
        assert_eq!(range.supporting_routes.len(), 2);
    }

    #[test]
    fn test_disjoint_bands_stay_separate() {
        let matcher = RouteMatcher::new();
        let mut premium = pricing_row(100000, 150000, 80, 2);
        premium.base_price = Decimal::from(90000);
        let routes = vec![
            route("vend_1", vec![], vec![pricing_row(20000, 45000, 15, 4)]),
            route("vend_2", vec![], vec![premium]),
        ];

        let ranges = matcher.match_and_price(&request(MUMBAI, DELHI, 1), &routes);

        assert_eq!(ranges.len(), 2);
        assert!(ranges[0].min_price < ranges[1].min_price);
        assert_eq!(ranges[0].vendors_count, 1);
        assert_eq!(ranges[1].vendors_count, 1);
    }

    #[test]
    fn test_misconfigured_row_skipped() {
        let matcher = RouteMatcher::new();
        let mut broken = pricing_row(50000, 20000, 15, 4); // min above max
        broken.from_city = "Mumbai".to_string();
        let routes = vec![route(
            "vend_1",
            vec![],
            vec![broken, pricing_row(20000, 45000, 15, 4)],
        )];

        let ranges = matcher.match_and_price(&request(MUMBAI, DELHI, 1), &routes);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].route_kind, RouteKind::Direct);
    }

    #[test]
    fn test_tight_tolerance_rejects_nearby_point() {
        let matcher = RouteMatcher::with_tolerance(5.0);
        let near_mumbai = GeoPoint::new(19.0760, 72.8777); // ~17 km out
        let routes = vec![route("vend_1", vec![], vec![pricing_row(20000, 45000, 15, 4)])];

        let ranges = matcher.match_and_price(&request(near_mumbai, DELHI, 1), &routes);
        assert_eq!(ranges[0].route_kind, RouteKind::Miscellaneous);
    }
}
