//! Core identifiers and shared types used throughout Freightlink

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Random hex suffix appended to generated identifiers so that two ids
/// created in the same millisecond stay distinct.
fn unique_suffix() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn generate_id(prefix: &str) -> String {
    format!("{}_{}_{}", prefix, Utc::now().timestamp_millis(), unique_suffix())
}

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:expr) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a new unique id with a timestamp and random suffix
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a customer's shipment request
    RequestId,
    "req"
);
id_type!(
    /// Unique identifier for a vendor's quotation
    QuotationId,
    "quo"
);
id_type!(
    /// Unique identifier for a single counter-offer within a quotation
    NegotiationId,
    "neg"
);
id_type!(
    /// Unique identifier for an order
    OrderId,
    "ord"
);
id_type!(
    /// Unique identifier for a vendor route
    RouteId,
    "route"
);
id_type!(
    /// Unique identifier for a truck
    TruckId,
    "truck"
);
id_type!(
    /// Unique identifier for a driver
    DriverId,
    "drv"
);

/// Stable identifier for an authenticated party, issued by the identity
/// provider. The core never generates these.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyId(pub String);

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of an authenticated caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Vendor,
    Manager,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Manager => "manager",
            Role::Admin => "admin",
        };
        write!(f, "{}", name)
    }
}

/// Authenticated principal supplied by the identity collaborator.
/// The core trusts only the pair (id, role).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PartyId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: PartyId(id.into()),
            role,
        }
    }
}

/// Vehicle category requested by customers and offered by vendors,
/// matched case-insensitively (e.g. "Container", "container").
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleType(pub String);

impl VehicleType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn matches(&self, other: &VehicleType) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Qualitative likelihood that a price band will be honored
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealProbability {
    Low,
    Medium,
    High,
}
