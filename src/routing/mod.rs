//! Vendor routes, geographic matching and price-range generation

pub mod geo;
pub mod matcher;
pub mod types;

pub use geo::GeoPoint;
pub use matcher::{RouteMatcher, MATCH_TOLERANCE_KM};
pub use types::{Route, RoutePricing, RouteStop};
