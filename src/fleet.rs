//! Vendor fleet: trucks and drivers

use crate::types::{DriverId, PartyId, TruckId, VehicleType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Availability of a truck. `Busy` is claimed by the order lifecycle when a
/// driver is assigned and released on completion or cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruckAvailability {
    Available,
    Busy,
    Maintenance,
    Inactive,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub vendor: PartyId,
    pub vehicle_type: VehicleType,
    pub registration_number: String,
    pub capacity_kg: Decimal,
    pub availability: TruckAvailability,
}

impl Truck {
    pub fn is_available(&self) -> bool {
        self.availability == TruckAvailability::Available
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub vendor: PartyId,
    pub name: String,
    pub license_number: String,
}
