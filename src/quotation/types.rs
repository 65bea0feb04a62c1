//! Shipment requests, quotations and derived price ranges

use crate::negotiation::Negotiation;
use crate::routing::GeoPoint;
use crate::types::{DealProbability, PartyId, QuotationId, RequestId, RouteId, Role, TruckId, VehicleType};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A customer's transport need. Immutable once matched, apart from
/// administrative fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub id: RequestId,
    pub customer: PartyId,
    pub pickup: GeoPoint,
    pub pickup_address: String,
    pub drop: GeoPoint,
    pub drop_address: String,
    pub pickup_date: DateTime<Utc>,
    pub expected_delivery_date: DateTime<Utc>,
    pub vehicle_type: VehicleType,
    pub vehicle_count: u32,
    pub weight_kg: Decimal,
    pub cargo_description: String,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// How a price range was matched against vendor routes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Direct,
    ViaStops,
    Miscellaneous,
}

/// An anonymized price band shown to the customer before vendor selection.
/// Supporting routes are carried by id only; vendor identity stays hidden.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceRange {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub estimated_price: Decimal,
    pub vehicles_available: u32,
    pub vendors_count: u32,
    pub deal_probability: DealProbability,
    pub route_kind: RouteKind,
    pub estimated_duration_hours: f64,
    pub supporting_routes: Vec<RouteId>,
}

/// Lifecycle status of a quotation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Pending,
    Sent,
    Negotiating,
    Accepted,
    Rejected,
    Expired,
}

impl QuotationStatus {
    /// Terminal statuses permit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QuotationStatus::Accepted | QuotationStatus::Rejected | QuotationStatus::Expired
        )
    }

    /// Statuses from which counter-offers may still be made
    pub fn is_negotiable(&self) -> bool {
        matches!(
            self,
            QuotationStatus::Pending | QuotationStatus::Sent | QuotationStatus::Negotiating
        )
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuotationStatus::Pending => "pending",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Negotiating => "negotiating",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Rejected => "rejected",
            QuotationStatus::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// One vehicle selection within a quotation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotationItem {
    pub vehicle_type: VehicleType,
    /// A concrete truck, when the vendor committed one up front
    pub truck: Option<TruckId>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// One vendor's priced offer against a shipment request.
/// Exclusively owns its append-only negotiation history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quotation {
    pub id: QuotationId,
    pub request_id: RequestId,
    pub vendor: PartyId,
    /// Which side originated the offer; the enquiry-origination path
    /// (manager-routed or customer-direct) is decided upstream.
    pub created_by: Role,
    pub items: Vec<QuotationItem>,
    /// The initial quoted amount. Stays fixed through negotiation so that
    /// reported savings have a stable reference point.
    pub total_amount: Decimal,
    /// The latest proposed amount, tracking the negotiation
    pub current_amount: Decimal,
    /// Binding amount recorded on acceptance
    pub final_amount: Option<Decimal>,
    pub validity_hours: u32,
    pub status: QuotationStatus,
    pub created_at: DateTime<Utc>,
    pub negotiations: Vec<Negotiation>,
}

impl Quotation {
    pub fn new(
        request_id: RequestId,
        vendor: PartyId,
        created_by: Role,
        items: Vec<QuotationItem>,
        total_amount: Decimal,
        validity_hours: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: QuotationId::generate(),
            request_id,
            vendor,
            created_by,
            items,
            total_amount,
            current_amount: total_amount,
            final_amount: None,
            validity_hours,
            status: QuotationStatus::Pending,
            created_at,
            negotiations: Vec::new(),
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(i64::from(self.validity_hours))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn latest_negotiation(&self) -> Option<&Negotiation> {
        self.negotiations.last()
    }

    /// Sequence number for the next appended negotiation
    pub fn next_sequence(&self) -> u64 {
        self.negotiations.len() as u64 + 1
    }
}
