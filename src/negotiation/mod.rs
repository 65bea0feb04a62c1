//! Turn-based counter-offer protocol

pub mod engine;
pub mod types;

pub use engine::{AcceptedTerms, NegotiationEngine, MAX_NEGOTIATION_ROUNDS};
pub use types::{ChargeBreakdown, Negotiation, BREAKDOWN_TOLERANCE};
