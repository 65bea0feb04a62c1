//! Order creation and role-gated status progression

use crate::error::{FreightError, Result};
use crate::fleet::{Driver, Truck, TruckAvailability};
use crate::permissions::{self, Action};
use crate::quotation::{Quotation, QuotationStatus, ShipmentRequest};
use crate::routing::GeoPoint;
use crate::types::{DriverId, OrderId, Principal, TruckId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::types::{Order, OrderStatus, OrderStatusRecord};

/// Caller-supplied context for a status update
#[derive(Clone, Debug, Default)]
pub struct StatusContext {
    pub driver_id: Option<DriverId>,
    pub truck_id: Option<TruckId>,
    pub actual_weight_kg: Option<Decimal>,
    pub location: Option<GeoPoint>,
    pub note: String,
}

/// Generate a six-digit delivery verification code
fn generate_delivery_code() -> String {
    use rand::Rng;
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

fn generate_order_number(now: DateTime<Utc>) -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("ORD{}{}", now.format("%Y%m%d%H%M%S"), hex::encode(bytes))
}

/// Order lifecycle service: creates orders from accepted quotations and
/// advances them through the status graph, applying each transition's side
/// effects in the same mutation as the status change.
pub struct OrderLifecycle;

impl OrderLifecycle {
    pub fn new() -> Self {
        Self
    }

    /// Materialize an order from an accepted quotation.
    ///
    /// The order starts at `Created` with a generated order number and
    /// delivery verification code, and the initial history entry already
    /// appended. No truck is claimed yet; that happens at `DriverAssigned`.
    pub fn create_from_quotation(
        &self,
        quotation: &Quotation,
        request: &ShipmentRequest,
        orders: &HashMap<OrderId, Order>,
        actor: &Principal,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        if quotation.status != QuotationStatus::Accepted {
            return Err(FreightError::NotAccepted(quotation.status));
        }

        if orders.values().any(|o| o.quotation_id == quotation.id) {
            return Err(FreightError::DuplicateOrder(quotation.id.0.clone()));
        }

        let total_amount = quotation.final_amount.unwrap_or(quotation.total_amount);
        let order_id = OrderId::generate();

        let initial_record = OrderStatusRecord {
            previous_status: None,
            new_status: OrderStatus::Created,
            actor: actor.id.clone(),
            actor_role: actor.role,
            location: None,
            note: "Order created from accepted quotation".to_string(),
            timestamp: now,
        };

        let order = Order {
            id: order_id,
            order_number: generate_order_number(now),
            quotation_id: quotation.id.clone(),
            customer: request.customer.clone(),
            vendor: quotation.vendor.clone(),
            truck: None,
            driver: None,
            pickup: request.pickup,
            pickup_address: request.pickup_address.clone(),
            delivery: request.drop,
            delivery_address: request.drop_address.clone(),
            scheduled_pickup: request.pickup_date,
            scheduled_delivery: request.expected_delivery_date,
            actual_pickup: None,
            actual_delivery: None,
            total_amount,
            estimated_weight_kg: request.weight_kg,
            actual_weight_kg: None,
            delivery_code: generate_delivery_code(),
            code_verified: false,
            status: OrderStatus::Created,
            history: vec![initial_record],
            created_at: now,
        };

        tracing::info!(
            order = %order.id,
            order_number = %order.order_number,
            quotation = %quotation.id,
            amount = %total_amount,
            "Order created"
        );

        Ok(order)
    }

    /// Advance an order to `new_status`.
    ///
    /// The edge must exist in the status graph (managers and admins may force
    /// transitions off the graph, but never out of a terminal state), the
    /// actor's role must allow the target status, and the target's side
    /// effects are applied in the same mutation as the status change.
    pub fn update_status(
        &self,
        order: &mut Order,
        new_status: OrderStatus,
        actor: &Principal,
        ctx: StatusContext,
        trucks: &mut HashMap<TruckId, Truck>,
        drivers: &HashMap<DriverId, Driver>,
        now: DateTime<Utc>,
    ) -> Result<OrderStatusRecord> {
        let current = order.status;

        if current.is_terminal() {
            return Err(FreightError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        if !permissions::is_allowed(actor.role, Action::SetOrderStatus(new_status)) {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: format!("set order status to '{}'", new_status),
            });
        }

        let forced = !current.can_transition_to(new_status);
        if forced {
            if !permissions::may_force_transition(actor.role) {
                return Err(FreightError::InvalidTransition {
                    from: current,
                    to: new_status,
                });
            }
            tracing::warn!(
                order = %order.id,
                from = %current,
                to = %new_status,
                actor = %actor.id,
                "Forced order transition"
            );
        }

        match new_status {
            OrderStatus::DriverAssigned => {
                let driver_id = ctx
                    .driver_id
                    .clone()
                    .ok_or_else(|| FreightError::MissingContext("driver_id".to_string()))?;
                if !drivers.contains_key(&driver_id) {
                    return Err(FreightError::DriverNotFound(driver_id.0.clone()));
                }

                // Validate the truck before mutating anything so a failed
                // claim leaves the order untouched
                if let Some(truck_id) = ctx.truck_id.clone() {
                    let truck = trucks
                        .get_mut(&truck_id)
                        .ok_or_else(|| FreightError::TruckNotFound(truck_id.0.clone()))?;
                    if !truck.is_available() {
                        return Err(FreightError::TruckUnavailable);
                    }
                    truck.availability = TruckAvailability::Busy;
                    order.truck = Some(truck_id);
                }
                order.driver = Some(driver_id);
            }
            OrderStatus::PickedUp => {
                order.actual_pickup = Some(now);
                if let Some(weight) = ctx.actual_weight_kg {
                    order.actual_weight_kg = Some(weight);
                }
            }
            OrderStatus::Delivered => {
                order.actual_delivery = Some(now);
            }
            OrderStatus::Completed => {
                if !order.code_verified {
                    return Err(FreightError::OtpNotVerified);
                }
                release_truck(order, trucks);
            }
            OrderStatus::Cancelled => {
                release_truck(order, trucks);
            }
            _ => {}
        }

        let record = OrderStatusRecord {
            previous_status: Some(current),
            new_status,
            actor: actor.id.clone(),
            actor_role: actor.role,
            location: ctx.location,
            note: if ctx.note.is_empty() {
                format!("Status updated to {}", new_status)
            } else {
                ctx.note
            },
            timestamp: now,
        };

        order.status = new_status;
        order.history.push(record.clone());

        tracing::info!(
            order = %order.id,
            from = %current,
            to = %new_status,
            actor = %actor.id,
            "Order status updated"
        );

        Ok(record)
    }

    /// Confirm the delivery verification code, gating the `Completed`
    /// transition.
    pub fn confirm_delivery_code(&self, order: &mut Order, code: &str) -> Result<()> {
        if order.delivery_code != code {
            return Err(FreightError::CodeMismatch);
        }
        order.code_verified = true;
        tracing::info!(order = %order.id, "Delivery code confirmed");
        Ok(())
    }
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Free the bound truck, if any. Applied on completion and cancellation.
fn release_truck(order: &Order, trucks: &mut HashMap<TruckId, Truck>) {
    if let Some(ref truck_id) = order.truck {
        if let Some(truck) = trucks.get_mut(truck_id) {
            truck.availability = TruckAvailability::Available;
            tracing::info!(order = %order.id, truck = %truck_id, "Truck released");
        }
    }
}
