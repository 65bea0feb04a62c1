//! Quotation state machine: acceptance, rejection and expiry

use crate::error::{FreightError, Result};
use crate::types::QuotationId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::types::{Quotation, QuotationStatus};

/// Outcome of accepting a quotation: the winner and the siblings that were
/// rejected in the same atomic unit.
#[derive(Clone, Debug)]
pub struct AcceptOutcome {
    pub accepted: QuotationId,
    pub final_amount: Decimal,
    pub rejected_siblings: Vec<QuotationId>,
}

/// Drives quotations through `pending → {sent, negotiating} → {accepted,
/// rejected, expired}`. Terminal states permit no further transition; that
/// guard is what makes the expiry sweep safe to run alongside user actions.
pub struct QuotationLifecycle;

impl QuotationLifecycle {
    pub fn new() -> Self {
        Self
    }

    /// Accept a quotation at the given binding amount and reject every other
    /// quotation of the same shipment request, as one atomic unit over the
    /// book. The fulfilled-guard is re-checked immediately before commit so
    /// two accepts on sibling quotations cannot both succeed.
    pub fn accept(
        &self,
        book: &mut HashMap<QuotationId, Quotation>,
        id: &QuotationId,
        final_amount: Decimal,
    ) -> Result<AcceptOutcome> {
        let quotation = book
            .get(id)
            .ok_or_else(|| FreightError::QuotationNotFound(id.0.clone()))?;
        let request_id = quotation.request_id.clone();
        let target_status = quotation.status;

        // Optimistic guard, re-read immediately before commit: a sibling that
        // already won means the losing accept reports the fulfilled request,
        // not the rejection it just received.
        let fulfilled = book.values().any(|q| {
            q.request_id == request_id && q.id != *id && q.status == QuotationStatus::Accepted
        });
        if fulfilled {
            return Err(FreightError::RequestAlreadyFulfilled);
        }

        if target_status.is_terminal() {
            return Err(FreightError::AlreadyResolved(target_status));
        }

        let mut rejected_siblings = Vec::new();
        for (other_id, other) in book.iter_mut() {
            if other.request_id != request_id {
                continue;
            }
            if other_id == id {
                other.status = QuotationStatus::Accepted;
                other.final_amount = Some(final_amount);
                other.current_amount = final_amount;
            } else if !other.status.is_terminal() {
                other.status = QuotationStatus::Rejected;
                rejected_siblings.push(other_id.clone());
            }
        }

        tracing::info!(
            quotation = %id,
            amount = %final_amount,
            siblings_rejected = rejected_siblings.len(),
            "Quotation accepted"
        );

        Ok(AcceptOutcome {
            accepted: id.clone(),
            final_amount,
            rejected_siblings,
        })
    }

    /// Reject a quotation. Allowed from any non-terminal state; siblings are
    /// unaffected.
    pub fn reject(&self, book: &mut HashMap<QuotationId, Quotation>, id: &QuotationId) -> Result<()> {
        let quotation = book
            .get_mut(id)
            .ok_or_else(|| FreightError::QuotationNotFound(id.0.clone()))?;

        if quotation.status.is_terminal() {
            return Err(FreightError::AlreadyResolved(quotation.status));
        }

        quotation.status = QuotationStatus::Rejected;
        tracing::info!(quotation = %id, "Quotation rejected");
        Ok(())
    }

    /// Expire every quotation whose validity window has elapsed. Idempotent;
    /// the terminal-state guard means the sweep never overwrites an accept or
    /// reject that landed first. Returns the ids of the quotations expired.
    pub fn expire_due(
        &self,
        book: &mut HashMap<QuotationId, Quotation>,
        now: DateTime<Utc>,
    ) -> Vec<QuotationId> {
        let mut expired = Vec::new();

        for quotation in book.values_mut() {
            if !quotation.status.is_negotiable() {
                continue;
            }
            if quotation.is_expired(now) {
                quotation.status = QuotationStatus::Expired;
                expired.push(quotation.id.clone());
                tracing::info!(quotation = %quotation.id, "Quotation expired");
            }
        }

        expired
    }
}

impl Default for QuotationLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotation::QuotationItem;
    use crate::types::{PartyId, RequestId, Role, VehicleType};

    fn quotation_for(request_id: &RequestId, vendor: &str, amount: i64) -> Quotation {
        Quotation::new(
            request_id.clone(),
            PartyId(vendor.to_string()),
            Role::Vendor,
            vec![QuotationItem {
                vehicle_type: VehicleType::new("Container"),
                truck: None,
                quantity: 1,
                unit_price: Decimal::from(amount),
            }],
            Decimal::from(amount),
            24,
            Utc::now(),
        )
    }

    fn book_with_siblings(count: usize) -> (HashMap<QuotationId, Quotation>, Vec<QuotationId>) {
        let request_id = RequestId::generate();
        let mut book = HashMap::new();
        let mut ids = Vec::new();
        for i in 0..count {
            let q = quotation_for(&request_id, &format!("vend_{}", i), 50000 + i as i64 * 1000);
            ids.push(q.id.clone());
            book.insert(q.id.clone(), q);
        }
        (book, ids)
    }

    #[test]
    fn test_accept_rejects_all_siblings() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(4);

        let outcome = lifecycle
            .accept(&mut book, &ids[1], Decimal::from(48000))
            .unwrap();

        assert_eq!(outcome.rejected_siblings.len(), 3);
        let accepted: Vec<_> = book
            .values()
            .filter(|q| q.status == QuotationStatus::Accepted)
            .collect();
        let rejected = book
            .values()
            .filter(|q| q.status == QuotationStatus::Rejected)
            .count();

        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, ids[1]);
        assert_eq!(accepted[0].final_amount, Some(Decimal::from(48000)));
        assert_eq!(rejected, 3);
    }

    #[test]
    fn test_second_accept_on_sibling_fails() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(2);

        lifecycle
            .accept(&mut book, &ids[0], Decimal::from(48000))
            .unwrap();
        let err = lifecycle
            .accept(&mut book, &ids[1], Decimal::from(47000))
            .unwrap_err();

        // The loser learns the request is taken, not that it "was rejected"
        assert!(matches!(err, FreightError::RequestAlreadyFulfilled));
    }

    #[test]
    fn test_fulfilled_guard_without_terminal_target() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(2);

        lifecycle
            .accept(&mut book, &ids[0], Decimal::from(48000))
            .unwrap();

        // Resurrect the sibling to a negotiable status to isolate the guard
        book.get_mut(&ids[1]).unwrap().status = QuotationStatus::Sent;
        let err = lifecycle
            .accept(&mut book, &ids[1], Decimal::from(47000))
            .unwrap_err();
        assert!(matches!(err, FreightError::RequestAlreadyFulfilled));
    }

    #[test]
    fn test_accept_terminal_quotation_fails() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(1);
        book.get_mut(&ids[0]).unwrap().status = QuotationStatus::Expired;

        let err = lifecycle
            .accept(&mut book, &ids[0], Decimal::from(48000))
            .unwrap_err();
        assert!(matches!(
            err,
            FreightError::AlreadyResolved(QuotationStatus::Expired)
        ));
    }

    #[test]
    fn test_accept_leaves_expired_siblings_untouched() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(3);
        book.get_mut(&ids[2]).unwrap().status = QuotationStatus::Expired;

        let outcome = lifecycle
            .accept(&mut book, &ids[0], Decimal::from(48000))
            .unwrap();

        assert_eq!(outcome.rejected_siblings, vec![ids[1].clone()]);
        assert_eq!(book[&ids[2]].status, QuotationStatus::Expired);
    }

    #[test]
    fn test_reject_is_isolated() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(2);

        lifecycle.reject(&mut book, &ids[0]).unwrap();

        assert_eq!(book[&ids[0]].status, QuotationStatus::Rejected);
        assert_eq!(book[&ids[1]].status, QuotationStatus::Pending);
    }

    #[test]
    fn test_reject_terminal_fails() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(1);
        book.get_mut(&ids[0]).unwrap().status = QuotationStatus::Accepted;

        let err = lifecycle.reject(&mut book, &ids[0]).unwrap_err();
        assert!(matches!(err, FreightError::AlreadyResolved(_)));
    }

    #[test]
    fn test_missing_quotation() {
        let lifecycle = QuotationLifecycle::new();
        let mut book = HashMap::new();
        let err = lifecycle
            .accept(&mut book, &QuotationId::generate(), Decimal::from(1))
            .unwrap_err();
        assert!(matches!(err, FreightError::QuotationNotFound(_)));
    }

    #[test]
    fn test_expiry_sweep() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(3);
        // One quotation with a longer validity window stays live
        book.get_mut(&ids[2]).unwrap().validity_hours = 72;

        let later = Utc::now() + chrono::Duration::hours(25);
        let expired = lifecycle.expire_due(&mut book, later);

        assert_eq!(expired.len(), 2);
        assert_eq!(book[&ids[0]].status, QuotationStatus::Expired);
        assert_eq!(book[&ids[1]].status, QuotationStatus::Expired);
        assert_eq!(book[&ids[2]].status, QuotationStatus::Pending);
    }

    #[test]
    fn test_expiry_sweep_is_idempotent() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, _) = book_with_siblings(3);

        let later = Utc::now() + chrono::Duration::hours(25);
        assert_eq!(lifecycle.expire_due(&mut book, later).len(), 3);
        assert!(lifecycle.expire_due(&mut book, later).is_empty());
    }

    #[test]
    fn test_expiry_never_overwrites_terminal_state() {
        let lifecycle = QuotationLifecycle::new();
        let (mut book, ids) = book_with_siblings(2);
        lifecycle
            .accept(&mut book, &ids[0], Decimal::from(48000))
            .unwrap();

        let later = Utc::now() + chrono::Duration::hours(25);
        lifecycle.expire_due(&mut book, later);

        assert_eq!(book[&ids[0]].status, QuotationStatus::Accepted);
        assert_eq!(book[&ids[1]].status, QuotationStatus::Rejected);
    }
}
