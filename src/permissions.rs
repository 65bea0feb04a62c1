//! Role-capability table
//!
//! One explicit mapping from (role, action) to allow/deny, consulted by the
//! negotiation and order services. No role inherits from another.

use crate::order::OrderStatus;
use crate::types::Role;

/// An action a principal may attempt against the core
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Negotiate,
    AcceptOffer,
    AcceptQuotation,
    RejectQuotation,
    SetOrderStatus(OrderStatus),
    ConfirmDeliveryCode,
}

/// Whether `role` may perform `action`
pub fn is_allowed(role: Role, action: Action) -> bool {
    use Action::*;
    use OrderStatus::*;

    match (role, action) {
        (Role::Customer, Negotiate) => true,
        (Role::Customer, AcceptOffer) => true,
        (Role::Customer, AcceptQuotation) => true,
        (Role::Customer, RejectQuotation) => true,
        (Role::Customer, SetOrderStatus(status)) => status == Cancelled,
        (Role::Customer, ConfirmDeliveryCode) => true,

        (Role::Vendor, Negotiate) => true,
        (Role::Vendor, AcceptOffer) => true,
        (Role::Vendor, AcceptQuotation) => false,
        (Role::Vendor, RejectQuotation) => false,
        (Role::Vendor, SetOrderStatus(_)) => true,
        (Role::Vendor, ConfirmDeliveryCode) => true,

        (Role::Manager, Negotiate) => false,
        (Role::Manager, AcceptOffer) => false,
        (Role::Manager, AcceptQuotation) => false,
        (Role::Manager, RejectQuotation) => true,
        (Role::Manager, SetOrderStatus(_)) => true,
        (Role::Manager, ConfirmDeliveryCode) => true,

        (Role::Admin, Negotiate) => false,
        (Role::Admin, AcceptOffer) => false,
        (Role::Admin, AcceptQuotation) => false,
        (Role::Admin, RejectQuotation) => true,
        (Role::Admin, SetOrderStatus(_)) => true,
        (Role::Admin, ConfirmDeliveryCode) => true,
    }
}

/// Managers and admins may force order transitions off the status graph
/// (intervention escape hatch). The terminal-state guard still applies.
pub fn may_force_transition(role: Role) -> bool {
    matches!(role, Role::Manager | Role::Admin)
}
