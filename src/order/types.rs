//! Orders, the order status graph and the status history log

use crate::routing::GeoPoint;
use crate::types::{DriverId, OrderId, PartyId, QuotationId, Role, TruckId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle status. Transitions follow a fixed directed graph;
/// `Completed` and `Cancelled` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    Confirmed,
    DriverAssigned,
    Pickup,
    PickedUp,
    InTransit,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Legal successor statuses. Cancellation is only reachable before the
    /// cargo is picked up.
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Created => &[Confirmed, Cancelled],
            Confirmed => &[DriverAssigned, Cancelled],
            DriverAssigned => &[Pickup, Cancelled],
            Pickup => &[PickedUp, Cancelled],
            PickedUp => &[InTransit],
            InTransit => &[Delivered],
            Delivered => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Created => "created",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::DriverAssigned => "driver_assigned",
            OrderStatus::Pickup => "pickup",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// One entry in an order's append-only status history
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderStatusRecord {
    /// None for the initial entry written at order creation
    pub previous_status: Option<OrderStatus>,
    pub new_status: OrderStatus,
    pub actor: PartyId,
    pub actor_role: Role,
    pub location: Option<GeoPoint>,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// An order materialized from exactly one accepted quotation.
/// Exclusively owns its status history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub quotation_id: QuotationId,
    pub customer: PartyId,
    pub vendor: PartyId,
    pub truck: Option<TruckId>,
    pub driver: Option<DriverId>,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub delivery: GeoPoint,
    pub delivery_address: String,
    pub scheduled_pickup: DateTime<Utc>,
    pub scheduled_delivery: DateTime<Utc>,
    pub actual_pickup: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub total_amount: Decimal,
    pub estimated_weight_kg: Decimal,
    pub actual_weight_kg: Option<Decimal>,
    /// Six-digit code the recipient confirms at delivery
    pub delivery_code: String,
    pub code_verified: bool,
    pub status: OrderStatus,
    pub history: Vec<OrderStatusRecord>,
    pub created_at: DateTime<Utc>,
}
