//! Scripted end-to-end scenario for the demo subcommand

use crate::error::Result;
use crate::fleet::{Driver, Truck, TruckAvailability};
use crate::marketplace::Marketplace;
use crate::order::{OrderStatus, StatusContext};
use crate::quotation::{QuotationItem, ShipmentRequest};
use crate::routing::{GeoPoint, Route, RoutePricing, RouteStop};
use crate::types::{DriverId, Principal, RequestId, Role, RouteId, TruckId, VehicleType};
use chrono::Utc;
use rust_decimal::Decimal;

const MUMBAI: GeoPoint = GeoPoint {
    latitude: 18.9322,
    longitude: 72.8264,
};
const NASHIK: GeoPoint = GeoPoint {
    latitude: 19.9975,
    longitude: 73.7898,
};
const DELHI: GeoPoint = GeoPoint {
    latitude: 28.6139,
    longitude: 77.2090,
};

/// Walk one shipment from enquiry through negotiation to a completed order
pub async fn run_demo() -> Result<()> {
    let (market, mut events) = Marketplace::new();

    let vendor = Principal::new("vend_sharma_logistics", Role::Vendor);
    let customer = Principal::new("cust_apex_steel", Role::Customer);

    // Vendor network: one Mumbai-Delhi route with a Nashik stop
    let route = Route {
        id: RouteId::generate(),
        vendor: vendor.id.clone(),
        name: "Mumbai to Delhi via Nashik".to_string(),
        origin_city: "Mumbai".to_string(),
        origin: MUMBAI,
        destination_city: "Delhi".to_string(),
        destination: DELHI,
        stops: vec![RouteStop {
            city: "Nashik".to_string(),
            location: NASHIK,
            stop_order: 1,
            distance_from_origin_km: 170.0,
            can_pickup: true,
            can_drop: true,
        }],
        total_distance_km: 1400.0,
        estimated_duration_hours: 26.0,
        active: true,
        pricing: vec![RoutePricing {
            vehicle_type: VehicleType::new("Container"),
            from_city: "Mumbai".to_string(),
            to_city: "Delhi".to_string(),
            segment_distance_km: Decimal::from(1400),
            base_price: Decimal::from(8000),
            price_per_km: Decimal::from(15),
            fuel_charges: Decimal::from(5000),
            toll_charges: Decimal::from(2000),
            loading_charges: Decimal::from(1000),
            unloading_charges: Decimal::from(1000),
            min_price: Decimal::from(20000),
            max_price: Decimal::from(45000),
            max_weight_capacity_kg: Decimal::from(25000),
            available_vehicles: 4,
            active: true,
        }],
        created_at: Utc::now(),
    };
    market.register_route(&vendor, route).await?;

    let truck_id = market
        .register_truck(
            &vendor,
            Truck {
                id: TruckId::generate(),
                vendor: vendor.id.clone(),
                vehicle_type: VehicleType::new("Container"),
                registration_number: "MH04AB1234".to_string(),
                capacity_kg: Decimal::from(25000),
                availability: TruckAvailability::Available,
            },
        )
        .await?;
    let driver_id = market
        .register_driver(
            &vendor,
            Driver {
                id: DriverId::generate(),
                vendor: vendor.id.clone(),
                name: "R. Sharma".to_string(),
                license_number: "DL-0420110012345".to_string(),
            },
        )
        .await?;

    // Customer enquiry
    let request_id = market
        .submit_request(
            &customer,
            ShipmentRequest {
                id: RequestId::generate(),
                customer: customer.id.clone(),
                pickup: MUMBAI,
                pickup_address: "Apex Steel yard, Mumbai".to_string(),
                drop: DELHI,
                drop_address: "Okhla industrial area, Delhi".to_string(),
                pickup_date: Utc::now() + chrono::Duration::days(2),
                expected_delivery_date: Utc::now() + chrono::Duration::days(5),
                vehicle_type: VehicleType::new("Container"),
                vehicle_count: 2,
                weight_kg: Decimal::from(18000),
                cargo_description: "steel coils".to_string(),
                budget_min: None,
                budget_max: Some(Decimal::from(100000)),
                created_at: Utc::now(),
            },
        )
        .await?;

    let ranges = market.match_routes_and_price(&customer, &request_id).await?;
    for range in &ranges {
        tracing::info!(
            min = %range.min_price,
            max = %range.max_price,
            estimated = %range.estimated_price,
            probability = ?range.deal_probability,
            kind = ?range.route_kind,
            "Price range offered"
        );
    }

    // Vendor quotes, the two sides negotiate, the customer accepts
    let quotation = market
        .submit_quotation(
            &vendor,
            &request_id,
            None,
            vec![QuotationItem {
                vehicle_type: VehicleType::new("Container"),
                truck: None,
                quantity: 2,
                unit_price: Decimal::from(25000),
            }],
            Decimal::from(50000),
            24,
        )
        .await?;

    market
        .create_negotiation(
            &customer,
            &quotation.id,
            Decimal::from(45000),
            None,
            "Can you close at 45000?",
        )
        .await?;
    let counter = market
        .create_negotiation(
            &vendor,
            &quotation.id,
            Decimal::from(47000),
            None,
            "47000 is the best we can do",
        )
        .await?;

    let (quotation, order) = market.accept_negotiation(&customer, &counter.id).await?;
    tracing::info!(
        quotation = %quotation.id,
        order = %order.order_number,
        final_amount = %order.total_amount,
        "Deal closed"
    );

    // Fulfilment
    market
        .update_order_status(&vendor, &order.id, OrderStatus::Confirmed, StatusContext::default())
        .await?;
    market
        .update_order_status(
            &vendor,
            &order.id,
            OrderStatus::DriverAssigned,
            StatusContext {
                driver_id: Some(driver_id),
                truck_id: Some(truck_id),
                ..Default::default()
            },
        )
        .await?;
    for status in [
        OrderStatus::Pickup,
        OrderStatus::PickedUp,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ] {
        market
            .update_order_status(&vendor, &order.id, status, StatusContext::default())
            .await?;
    }

    market
        .confirm_delivery_code(&customer, &order.id, &order.delivery_code)
        .await?;
    let (order, _) = market
        .update_order_status(&vendor, &order.id, OrderStatus::Completed, StatusContext::default())
        .await?;
    tracing::info!(order = %order.order_number, status = %order.status, "Order complete");

    let mut emitted = 0;
    while events.try_recv().is_ok() {
        emitted += 1;
    }
    tracing::info!(emitted, "Domain events emitted during the demo");

    Ok(())
}
