//! Counter-offer records forming a quotation's audit trail

use crate::types::{NegotiationId, Role};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rounding tolerance when checking a breakdown against its proposed amount:
/// one smallest currency unit.
pub const BREAKDOWN_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Optional itemization of a proposed amount
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub base: Decimal,
    pub fuel: Decimal,
    pub toll: Decimal,
    pub loading: Decimal,
    pub unloading: Decimal,
    pub other: Decimal,
}

impl ChargeBreakdown {
    pub fn component_sum(&self) -> Decimal {
        self.base + self.fuel + self.toll + self.loading + self.unloading + self.other
    }

    /// Whether the components sum to the proposed amount, allowing for
    /// rounding by one smallest currency unit
    pub fn matches_amount(&self, amount: Decimal) -> bool {
        (self.component_sum() - amount).abs() <= BREAKDOWN_TOLERANCE
    }
}

/// A single counter-offer within a quotation's negotiation history.
/// Records are append-only; the ordered sequence is the full audit trail
/// and is never mutated or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Negotiation {
    pub id: NegotiationId,
    /// Position in the quotation's history, starting at 1
    pub sequence: u64,
    pub initiated_by: Role,
    pub proposed_amount: Decimal,
    pub breakdown: Option<ChargeBreakdown>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
