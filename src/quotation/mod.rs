//! Shipment requests, quotations and the quotation state machine

pub mod lifecycle;
pub mod types;

pub use lifecycle::QuotationLifecycle;
pub use types::{
    PriceRange, Quotation, QuotationItem, QuotationStatus, RouteKind, ShipmentRequest,
};
