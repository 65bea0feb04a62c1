//! State-change events emitted for the notification collaborator
//!
//! The core exposes poll-able state; events are the only outbound signal.
//! Consumers drain the channel at their own pace.

use crate::order::OrderStatus;
use crate::types::{NegotiationId, OrderId, QuotationId, RequestId, Role};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A state change inside the marketplace core
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    QuotationSubmitted {
        quotation_id: QuotationId,
        request_id: RequestId,
        total_amount: Decimal,
    },
    NegotiationCreated {
        quotation_id: QuotationId,
        negotiation_id: NegotiationId,
        initiated_by: Role,
        proposed_amount: Decimal,
    },
    QuotationAccepted {
        quotation_id: QuotationId,
        final_amount: Decimal,
        rejected_siblings: Vec<QuotationId>,
    },
    QuotationRejected {
        quotation_id: QuotationId,
    },
    QuotationExpired {
        quotation_id: QuotationId,
    },
    OrderCreated {
        order_id: OrderId,
        quotation_id: QuotationId,
        total_amount: Decimal,
    },
    OrderStatusChanged {
        order_id: OrderId,
        previous: OrderStatus,
        new: OrderStatus,
    },
}
