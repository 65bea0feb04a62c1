//! Freightlink: quotation negotiation and order lifecycle engine
//!
//! The core of a logistics marketplace connecting shippers to truck
//! operators:
//! - route matching and anonymized price-range generation
//! - a turn-based counter-offer protocol between customer and vendor
//! - the quotation state machine with atomic sibling rejection
//! - a role-gated order lifecycle with truck-availability side effects
//!
//! Identity, geocoding, payments and notifications are external
//! collaborators; the core trusts an authenticated `(principal, role)` pair,
//! consumes coordinates, and emits state-change events for dispatch.

pub mod cli;
pub mod error;
pub mod events;
pub mod fleet;
pub mod marketplace;
pub mod negotiation;
pub mod order;
pub mod permissions;
pub mod pricing;
pub mod quotation;
pub mod routing;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, FreightError, Result};
pub use events::DomainEvent;
pub use marketplace::Marketplace;
pub use negotiation::{ChargeBreakdown, Negotiation, NegotiationEngine};
pub use order::{Order, OrderLifecycle, OrderStatus, StatusContext};
pub use quotation::{PriceRange, Quotation, QuotationLifecycle, QuotationStatus, ShipmentRequest};
pub use routing::{GeoPoint, Route, RouteMatcher};
pub use types::{Principal, Role};
