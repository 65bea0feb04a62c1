//! Orders and the order lifecycle

pub mod lifecycle;
pub mod types;

pub use lifecycle::{OrderLifecycle, StatusContext};
pub use types::{Order, OrderStatus, OrderStatusRecord};
