//! Turn-based counter-offer protocol for a single quotation

use crate::error::{FreightError, Result};
use crate::quotation::{Quotation, QuotationStatus};
use crate::types::{NegotiationId, Role};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::types::{ChargeBreakdown, Negotiation};

/// Maximum counter-offers per quotation (five rounds each side)
pub const MAX_NEGOTIATION_ROUNDS: usize = 10;

/// A proposal may never fall below this share of the original amount
const FLOOR_RATIO: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Terms produced by accepting the latest offer. The final amount is binding;
/// savings are measured against the quotation's initial total so the
/// reference point stays stable across rounds.
#[derive(Clone, Debug, PartialEq)]
pub struct AcceptedTerms {
    pub final_amount: Decimal,
    pub savings: Decimal,
}

/// Negotiation engine: validates and records counter-offers on a quotation
pub struct NegotiationEngine {
    max_rounds: usize,
}

impl NegotiationEngine {
    pub fn new() -> Self {
        Self {
            max_rounds: MAX_NEGOTIATION_ROUNDS,
        }
    }

    /// The side whose turn it is: whoever did not initiate the most recent
    /// offer, or, with no offers yet, whoever did not create the quotation.
    pub fn next_negotiator(&self, quotation: &Quotation) -> Role {
        let last_actor = quotation
            .latest_negotiation()
            .map(|n| n.initiated_by)
            .unwrap_or(quotation.created_by);
        opposite(last_actor)
    }

    /// Whether the quotation can still be negotiated: a non-terminal,
    /// negotiable status and an unexpired validity window.
    pub fn can_negotiate(&self, quotation: &Quotation, now: DateTime<Utc>) -> bool {
        quotation.status.is_negotiable() && !quotation.is_expired(now)
    }

    /// Record a counter-offer.
    ///
    /// On success the offer is appended to the audit trail, the quotation
    /// moves to `Negotiating` and its current amount tracks the proposal.
    pub fn create_offer(
        &self,
        quotation: &mut Quotation,
        actor_role: Role,
        proposed_amount: Decimal,
        breakdown: Option<ChargeBreakdown>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Negotiation> {
        if !matches!(actor_role, Role::Customer | Role::Vendor) {
            return Err(FreightError::InsufficientPermission {
                role: actor_role,
                action: "negotiate a quotation".to_string(),
            });
        }

        if !quotation.status.is_negotiable() {
            return Err(FreightError::InvalidState(quotation.status));
        }
        if quotation.is_expired(now) {
            // Not yet swept, but the validity window has elapsed
            return Err(FreightError::InvalidState(QuotationStatus::Expired));
        }

        if proposed_amount <= Decimal::ZERO {
            return Err(FreightError::InvalidAmount(proposed_amount));
        }

        if let Some(ref breakdown) = breakdown {
            if !breakdown.matches_amount(proposed_amount) {
                return Err(FreightError::BreakdownMismatch {
                    proposed: proposed_amount,
                    component_sum: breakdown.component_sum(),
                });
            }
        }

        let expected = self.next_negotiator(quotation);
        if actor_role != expected {
            return Err(FreightError::OutOfTurn { expected });
        }

        if quotation.negotiations.len() >= self.max_rounds {
            return Err(FreightError::TooManyRounds(self.max_rounds));
        }

        let floor = (quotation.total_amount * FLOOR_RATIO).round_dp(2);
        if proposed_amount < floor {
            return Err(FreightError::ExcessiveVariance {
                proposed: proposed_amount,
                floor,
            });
        }

        let negotiation = Negotiation {
            id: NegotiationId::generate(),
            sequence: quotation.next_sequence(),
            initiated_by: actor_role,
            proposed_amount,
            breakdown,
            message: message.into(),
            created_at: now,
        };

        quotation.negotiations.push(negotiation.clone());
        quotation.status = QuotationStatus::Negotiating;
        quotation.current_amount = proposed_amount;

        tracing::info!(
            quotation = %quotation.id,
            initiated_by = %actor_role,
            amount = %proposed_amount,
            round = negotiation.sequence,
            "Counter-offer recorded"
        );

        Ok(negotiation)
    }

    /// Accept the latest offer on behalf of `accepting_role`.
    ///
    /// A party cannot accept its own proposal; the counterparty's latest
    /// amount becomes the binding final amount. The caller hands the returned
    /// terms to the quotation lifecycle for the actual state transition.
    pub fn accept_latest(&self, quotation: &Quotation, accepting_role: Role) -> Result<AcceptedTerms> {
        if !matches!(accepting_role, Role::Customer | Role::Vendor) {
            return Err(FreightError::InsufficientPermission {
                role: accepting_role,
                action: "accept an offer".to_string(),
            });
        }

        let latest = quotation
            .latest_negotiation()
            .ok_or(FreightError::NoOffersToAccept)?;

        if latest.initiated_by == accepting_role {
            return Err(FreightError::SelfAcceptance);
        }

        let final_amount = latest.proposed_amount;
        Ok(AcceptedTerms {
            final_amount,
            savings: (quotation.total_amount - final_amount).abs(),
        })
    }
}

impl Default for NegotiationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn opposite(role: Role) -> Role {
    match role {
        Role::Customer => Role::Vendor,
        _ => Role::Customer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotation::QuotationItem;
    use crate::types::{PartyId, RequestId, VehicleType};

    fn quotation() -> Quotation {
        Quotation::new(
            RequestId::generate(),
            PartyId("vend_1".to_string()),
            Role::Vendor,
            vec![QuotationItem {
                vehicle_type: VehicleType::new("Container"),
                truck: None,
                quantity: 2,
                unit_price: Decimal::from(25000),
            }],
            Decimal::new(5000000, 2), // 50000.00
            24,
            Utc::now(),
        )
    }

    fn amount(value: i64) -> Decimal {
        Decimal::new(value * 100, 2)
    }

    #[test]
    fn test_customer_opens_on_vendor_quotation() {
        let engine = NegotiationEngine::new();
        let q = quotation();
        assert_eq!(engine.next_negotiator(&q), Role::Customer);
    }

    #[test]
    fn test_turns_alternate() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let now = Utc::now();

        engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "offer", now)
            .unwrap();
        assert_eq!(engine.next_negotiator(&q), Role::Vendor);

        engine
            .create_offer(&mut q, Role::Vendor, amount(47000), None, "counter", now)
            .unwrap();
        assert_eq!(engine.next_negotiator(&q), Role::Customer);

        // No two consecutive records share an initiator
        for pair in q.negotiations.windows(2) {
            assert_ne!(pair[0].initiated_by, pair[1].initiated_by);
        }
    }

    #[test]
    fn test_consecutive_offer_is_out_of_turn() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let now = Utc::now();

        engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "", now)
            .unwrap();
        let err = engine
            .create_offer(&mut q, Role::Customer, amount(44000), None, "", now)
            .unwrap_err();

        assert!(matches!(err, FreightError::OutOfTurn { expected: Role::Vendor }));
        assert_eq!(q.negotiations.len(), 1);
    }

    #[test]
    fn test_vendor_cannot_open_its_own_quotation() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let err = engine
            .create_offer(&mut q, Role::Vendor, amount(48000), None, "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, FreightError::OutOfTurn { expected: Role::Customer }));
    }

    #[test]
    fn test_offer_moves_quotation_to_negotiating() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();

        engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "", Utc::now())
            .unwrap();

        assert_eq!(q.status, QuotationStatus::Negotiating);
        assert_eq!(q.current_amount, amount(45000));
        assert_eq!(q.total_amount, amount(50000)); // reference point untouched
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let err = engine
            .create_offer(&mut q, Role::Customer, Decimal::ZERO, None, "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, FreightError::InvalidAmount(_)));
    }

    #[test]
    fn test_breakdown_mismatch_rejected() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let breakdown = ChargeBreakdown {
            base: amount(30000),
            fuel: amount(8000),
            toll: amount(4000),
            loading: amount(1500),
            unloading: amount(1500),
            other: Decimal::ZERO,
        }; // sums to 45000
        let err = engine
            .create_offer(
                &mut q,
                Role::Customer,
                amount(46000),
                Some(breakdown),
                "",
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, FreightError::BreakdownMismatch { .. }));
        assert!(q.negotiations.is_empty());
    }

    #[test]
    fn test_matching_breakdown_accepted() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let breakdown = ChargeBreakdown {
            base: amount(30000),
            fuel: amount(8000),
            toll: amount(4000),
            loading: amount(1500),
            unloading: amount(1500),
            other: Decimal::ZERO,
        };
        let negotiation = engine
            .create_offer(
                &mut q,
                Role::Customer,
                amount(45000),
                Some(breakdown),
                "itemized",
                Utc::now(),
            )
            .unwrap();
        assert_eq!(negotiation.sequence, 1);
    }

    #[test]
    fn test_offer_on_resolved_quotation_rejected() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        q.status = QuotationStatus::Rejected;
        let err = engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, FreightError::InvalidState(QuotationStatus::Rejected)));
    }

    #[test]
    fn test_offer_after_validity_window_rejected() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let late = q.created_at + chrono::Duration::hours(25);
        let err = engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "", late)
            .unwrap_err();
        assert!(matches!(err, FreightError::InvalidState(QuotationStatus::Expired)));
    }

    #[test]
    fn test_manager_cannot_negotiate() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let err = engine
            .create_offer(&mut q, Role::Manager, amount(45000), None, "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, FreightError::InsufficientPermission { .. }));
    }

    #[test]
    fn test_round_limit_enforced() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let now = Utc::now();

        let mut actor = Role::Customer;
        for round in 0..MAX_NEGOTIATION_ROUNDS {
            engine
                .create_offer(&mut q, actor, amount(45000 + round as i64), None, "", now)
                .unwrap();
            actor = opposite(actor);
        }

        let err = engine
            .create_offer(&mut q, actor, amount(46000), None, "", now)
            .unwrap_err();
        assert!(matches!(err, FreightError::TooManyRounds(MAX_NEGOTIATION_ROUNDS)));
    }

    #[test]
    fn test_floor_of_half_the_original_enforced() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let err = engine
            .create_offer(&mut q, Role::Customer, amount(24000), None, "", Utc::now())
            .unwrap_err();
        assert!(matches!(err, FreightError::ExcessiveVariance { .. }));
    }

    #[test]
    fn test_accept_with_empty_history_rejected() {
        let engine = NegotiationEngine::new();
        let q = quotation();
        let err = engine.accept_latest(&q, Role::Customer).unwrap_err();
        assert!(matches!(err, FreightError::NoOffersToAccept));
    }

    #[test]
    fn test_self_acceptance_rejected() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let now = Utc::now();

        engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "", now)
            .unwrap();
        let err = engine.accept_latest(&q, Role::Customer).unwrap_err();
        assert!(matches!(err, FreightError::SelfAcceptance));

        // Holds at every history length
        engine
            .create_offer(&mut q, Role::Vendor, amount(47000), None, "", now)
            .unwrap();
        let err = engine.accept_latest(&q, Role::Vendor).unwrap_err();
        assert!(matches!(err, FreightError::SelfAcceptance));
    }

    #[test]
    fn test_accept_latest_reports_savings_from_original() {
        let engine = NegotiationEngine::new();
        let mut q = quotation();
        let now = Utc::now();

        engine
            .create_offer(&mut q, Role::Customer, amount(45000), None, "", now)
            .unwrap();
        engine
            .create_offer(&mut q, Role::Vendor, amount(47000), None, "", now)
            .unwrap();

        let terms = engine.accept_latest(&q, Role::Customer).unwrap();
        assert_eq!(terms.final_amount, amount(47000));
        // Against the original 50000, not the first counter-offer
        assert_eq!(terms.savings, amount(3000));
    }
}
