//! Error types for Freightlink

use crate::order::OrderStatus;
use crate::quotation::QuotationStatus;
use crate::types::Role;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for Freightlink
#[derive(Error, Debug)]
pub enum FreightError {
    // Validation errors
    #[error("Proposed amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Breakdown components sum to {component_sum}, proposed amount is {proposed}")]
    BreakdownMismatch {
        proposed: Decimal,
        component_sum: Decimal,
    },

    #[error("Missing required context: {0}")]
    MissingContext(String),

    #[error("Invalid pricing configuration: {0}")]
    InvalidPricingConfiguration(String),

    #[error("Invalid route definition: {0}")]
    InvalidRoute(String),

    #[error("Proposed amount {proposed} is below the floor of {floor} (50% of original)")]
    ExcessiveVariance { proposed: Decimal, floor: Decimal },

    // State conflict errors
    #[error("Quotation is not negotiable in status '{0}'")]
    InvalidState(QuotationStatus),

    #[error("Out of turn: waiting for the {expected} to respond")]
    OutOfTurn { expected: Role },

    #[error("No offers to accept: negotiation history is empty")]
    NoOffersToAccept,

    #[error("Cannot accept an offer initiated by your own side")]
    SelfAcceptance,

    #[error("Quotation already resolved with status '{0}'")]
    AlreadyResolved(QuotationStatus),

    #[error("Shipment request already has an accepted quotation")]
    RequestAlreadyFulfilled,

    #[error("Invalid order status transition from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order already exists for quotation {0}")]
    DuplicateOrder(String),

    #[error("Vendor already quoted on this shipment request")]
    DuplicateQuotation,

    #[error("Maximum negotiation rounds ({0}) reached")]
    TooManyRounds(usize),

    #[error("Offer is no longer the latest for its quotation")]
    StaleOffer,

    #[error("Quotation is not accepted (status '{0}')")]
    NotAccepted(QuotationStatus),

    #[error("Delivery verification code has not been confirmed")]
    OtpNotVerified,

    #[error("Delivery verification code does not match")]
    CodeMismatch,

    #[error("Truck is not available for assignment")]
    TruckUnavailable,

    // Permission errors
    #[error("Role '{role}' is not permitted to {action}")]
    InsufficientPermission { role: Role, action: String },

    // Not-found errors
    #[error("Shipment request not found: {0}")]
    RequestNotFound(String),

    #[error("Quotation not found: {0}")]
    QuotationNotFound(String),

    #[error("Negotiation not found: {0}")]
    NegotiationNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Truck not found: {0}")]
    TruckNotFound(String),

    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an error, used by the request layer to map
/// failures onto its response surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; recoverable, surfaced verbatim to the caller
    Validation,
    /// Operation rejected against current authoritative state
    StateConflict,
    /// Caller's role lacks the capability
    Permission,
    /// Resource id does not resolve (or is invisible to the caller)
    NotFound,
    /// Everything else
    Internal,
}

impl FreightError {
    /// Classify this error into the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        use FreightError::*;
        match self {
            InvalidAmount(_)
            | BreakdownMismatch { .. }
            | MissingContext(_)
            | InvalidPricingConfiguration(_)
            | InvalidRoute(_)
            | ExcessiveVariance { .. } => ErrorKind::Validation,

            InvalidState(_)
            | OutOfTurn { .. }
            | NoOffersToAccept
            | SelfAcceptance
            | AlreadyResolved(_)
            | RequestAlreadyFulfilled
            | InvalidTransition { .. }
            | DuplicateOrder(_)
            | DuplicateQuotation
            | TooManyRounds(_)
            | StaleOffer
            | NotAccepted(_)
            | OtpNotVerified
            | CodeMismatch
            | TruckUnavailable => ErrorKind::StateConflict,

            InsufficientPermission { .. } => ErrorKind::Permission,

            RequestNotFound(_)
            | QuotationNotFound(_)
            | NegotiationNotFound(_)
            | OrderNotFound(_)
            | RouteNotFound(_)
            | TruckNotFound(_)
            | DriverNotFound(_) => ErrorKind::NotFound,

            Io(_) | Json(_) | Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias for Freightlink operations
pub type Result<T> = std::result::Result<T, FreightError>;
