//! Marketplace facade integrating matching, negotiation and order lifecycle
//!
//! Every public operation acquires the state lock exactly once; that
//! critical section is the request-scoped atomic unit. Guard conditions are
//! re-checked inside it, so a losing concurrent request fails fast with a
//! conflict error instead of blocking.

use crate::error::{FreightError, Result};
use crate::events::DomainEvent;
use crate::fleet::{Driver, Truck};
use crate::negotiation::{ChargeBreakdown, Negotiation, NegotiationEngine};
use crate::order::{Order, OrderLifecycle, OrderStatus, OrderStatusRecord, StatusContext};
use crate::permissions::{self, Action};
use crate::quotation::{
    PriceRange, Quotation, QuotationItem, QuotationLifecycle, QuotationStatus, ShipmentRequest,
};
use crate::routing::{Route, RouteMatcher};
use crate::types::{
    DriverId, NegotiationId, OrderId, PartyId, Principal, QuotationId, RequestId, Role, RouteId,
    TruckId,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// All shared mutable state, guarded by one lock
#[derive(Default)]
struct MarketState {
    requests: HashMap<RequestId, ShipmentRequest>,
    quotations: HashMap<QuotationId, Quotation>,
    orders: HashMap<OrderId, Order>,
    routes: HashMap<RouteId, Route>,
    trucks: HashMap<TruckId, Truck>,
    drivers: HashMap<DriverId, Driver>,
    negotiation_index: HashMap<NegotiationId, QuotationId>,
}

/// The marketplace core exposed to the request layer
#[derive(Clone)]
pub struct Marketplace {
    state: Arc<Mutex<MarketState>>,
    matcher: Arc<RouteMatcher>,
    negotiation: Arc<NegotiationEngine>,
    quotation_lifecycle: Arc<QuotationLifecycle>,
    order_lifecycle: Arc<OrderLifecycle>,
    events: mpsc::UnboundedSender<DomainEvent>,
}

impl Marketplace {
    /// Create the marketplace and the event stream the notification
    /// collaborator consumes
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Arc::new(Mutex::new(MarketState::default())),
                matcher: Arc::new(RouteMatcher::new()),
                negotiation: Arc::new(NegotiationEngine::new()),
                quotation_lifecycle: Arc::new(QuotationLifecycle::new()),
                order_lifecycle: Arc::new(OrderLifecycle::new()),
                events: tx,
            },
            rx,
        )
    }

    fn emit(&self, event: DomainEvent) {
        // The receiver may have been dropped; events are best-effort
        let _ = self.events.send(event);
    }

    // ---- Upstream producer surface ----

    /// Register a vendor route after validating its stop sequence
    pub async fn register_route(&self, actor: &Principal, route: Route) -> Result<RouteId> {
        if actor.role != Role::Vendor || route.vendor != actor.id {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "register a route".to_string(),
            });
        }
        route.validate()?;

        let id = route.id.clone();
        self.state.lock().await.routes.insert(id.clone(), route);
        tracing::info!(route = %id, vendor = %actor.id, "Route registered");
        Ok(id)
    }

    pub async fn register_truck(&self, actor: &Principal, truck: Truck) -> Result<TruckId> {
        if actor.role != Role::Vendor || truck.vendor != actor.id {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "register a truck".to_string(),
            });
        }
        let id = truck.id.clone();
        self.state.lock().await.trucks.insert(id.clone(), truck);
        Ok(id)
    }

    pub async fn register_driver(&self, actor: &Principal, driver: Driver) -> Result<DriverId> {
        if actor.role != Role::Vendor || driver.vendor != actor.id {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "register a driver".to_string(),
            });
        }
        let id = driver.id.clone();
        self.state.lock().await.drivers.insert(id.clone(), driver);
        Ok(id)
    }

    /// Record a customer's shipment request
    pub async fn submit_request(&self, actor: &Principal, request: ShipmentRequest) -> Result<RequestId> {
        if actor.role != Role::Customer || request.customer != actor.id {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "submit a shipment request".to_string(),
            });
        }
        let id = request.id.clone();
        self.state.lock().await.requests.insert(id.clone(), request);
        tracing::info!(request = %id, customer = %actor.id, "Shipment request submitted");
        Ok(id)
    }

    /// Submit a quotation against a request. Vendors quote on their own
    /// behalf; a customer may originate one toward a chosen vendor (the
    /// direct-selection flow), in which case the vendor responds first.
    pub async fn submit_quotation(
        &self,
        actor: &Principal,
        request_id: &RequestId,
        target_vendor: Option<PartyId>,
        items: Vec<QuotationItem>,
        total_amount: Decimal,
        validity_hours: u32,
    ) -> Result<Quotation> {
        if items.is_empty() {
            return Err(FreightError::MissingContext("items".to_string()));
        }
        if total_amount <= Decimal::ZERO {
            return Err(FreightError::InvalidAmount(total_amount));
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let request = state
            .requests
            .get(request_id)
            .ok_or_else(|| FreightError::RequestNotFound(request_id.0.clone()))?;

        let vendor = match actor.role {
            Role::Vendor => actor.id.clone(),
            Role::Customer if request.customer == actor.id => target_vendor
                .ok_or_else(|| FreightError::MissingContext("vendor".to_string()))?,
            _ => {
                return Err(FreightError::InsufficientPermission {
                    role: actor.role,
                    action: "submit a quotation".to_string(),
                })
            }
        };

        let duplicate = state
            .quotations
            .values()
            .any(|q| q.request_id == *request_id && q.vendor == vendor);
        if duplicate {
            return Err(FreightError::DuplicateQuotation);
        }

        let quotation = Quotation::new(
            request_id.clone(),
            vendor,
            actor.role,
            items,
            total_amount,
            validity_hours,
            Utc::now(),
        );
        state
            .quotations
            .insert(quotation.id.clone(), quotation.clone());

        self.emit(DomainEvent::QuotationSubmitted {
            quotation_id: quotation.id.clone(),
            request_id: request_id.clone(),
            total_amount,
        });
        tracing::info!(
            quotation = %quotation.id,
            request = %request_id,
            amount = %total_amount,
            "Quotation submitted"
        );

        Ok(quotation)
    }

    /// Mark a pending quotation as sent to the customer. Which channel
    /// forwards it (manager workflow or direct flow) is decided upstream.
    pub async fn mark_quotation_sent(
        &self,
        actor: &Principal,
        quotation_id: &QuotationId,
    ) -> Result<Quotation> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        check_quotation_visibility(state, quotation_id, actor)?;

        let quotation = state
            .quotations
            .get_mut(quotation_id)
            .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))?;

        if quotation.status != QuotationStatus::Pending {
            return Err(FreightError::InvalidState(quotation.status));
        }
        quotation.status = QuotationStatus::Sent;
        tracing::info!(quotation = %quotation_id, "Quotation sent to customer");

        Ok(quotation.clone())
    }

    // ---- Core operations ----

    /// Match a shipment request against all active vendor routes and return
    /// anonymized price ranges
    pub async fn match_routes_and_price(
        &self,
        actor: &Principal,
        request_id: &RequestId,
    ) -> Result<Vec<PriceRange>> {
        let state = self.state.lock().await;

        let request = state
            .requests
            .get(request_id)
            .ok_or_else(|| FreightError::RequestNotFound(request_id.0.clone()))?;

        match actor.role {
            Role::Customer if request.customer == actor.id => {}
            Role::Manager | Role::Admin => {}
            _ => return Err(FreightError::RequestNotFound(request_id.0.clone())),
        }

        let routes: Vec<Route> = state.routes.values().cloned().collect();
        let mut ranges = self.matcher.match_and_price(request, &routes);
        ranges.sort_by(|a, b| a.min_price.cmp(&b.min_price));

        tracing::info!(
            request = %request_id,
            ranges = ranges.len(),
            "Request matched and priced"
        );
        Ok(ranges)
    }

    /// Record a counter-offer on a quotation
    pub async fn create_negotiation(
        &self,
        actor: &Principal,
        quotation_id: &QuotationId,
        proposed_amount: Decimal,
        breakdown: Option<ChargeBreakdown>,
        message: impl Into<String>,
    ) -> Result<Negotiation> {
        if !permissions::is_allowed(actor.role, Action::Negotiate) {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "negotiate a quotation".to_string(),
            });
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        check_quotation_visibility(state, quotation_id, actor)?;

        let quotation = state
            .quotations
            .get_mut(quotation_id)
            .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))?;

        let negotiation = self.negotiation.create_offer(
            quotation,
            actor.role,
            proposed_amount,
            breakdown,
            message,
            Utc::now(),
        )?;

        state
            .negotiation_index
            .insert(negotiation.id.clone(), quotation_id.clone());

        self.emit(DomainEvent::NegotiationCreated {
            quotation_id: quotation_id.clone(),
            negotiation_id: negotiation.id.clone(),
            initiated_by: negotiation.initiated_by,
            proposed_amount,
        });

        Ok(negotiation)
    }

    /// Accept a counter-offer, resolving the quotation and materializing the
    /// order in the same atomic unit. The offer must still be the latest on
    /// its quotation.
    pub async fn accept_negotiation(
        &self,
        actor: &Principal,
        negotiation_id: &NegotiationId,
    ) -> Result<(Quotation, Order)> {
        if !permissions::is_allowed(actor.role, Action::AcceptOffer) {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "accept an offer".to_string(),
            });
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let quotation_id = state
            .negotiation_index
            .get(negotiation_id)
            .cloned()
            .ok_or_else(|| FreightError::NegotiationNotFound(negotiation_id.0.clone()))?;

        check_quotation_visibility(state, &quotation_id, actor)?;

        let quotation = state
            .quotations
            .get(&quotation_id)
            .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))?;

        let latest = quotation
            .latest_negotiation()
            .ok_or(FreightError::NoOffersToAccept)?;
        if latest.id != *negotiation_id {
            return Err(FreightError::StaleOffer);
        }

        let terms = self.negotiation.accept_latest(quotation, actor.role)?;

        let outcome =
            self.quotation_lifecycle
                .accept(&mut state.quotations, &quotation_id, terms.final_amount)?;
        self.emit(DomainEvent::QuotationAccepted {
            quotation_id: quotation_id.clone(),
            final_amount: outcome.final_amount,
            rejected_siblings: outcome.rejected_siblings.clone(),
        });

        tracing::info!(
            quotation = %quotation_id,
            final_amount = %terms.final_amount,
            savings = %terms.savings,
            "Offer accepted"
        );

        let (quotation, order) = self.materialize_order(state, &quotation_id, actor)?;
        Ok((quotation, order))
    }

    /// Accept a quotation at its originally quoted amount
    pub async fn accept_quotation_directly(
        &self,
        actor: &Principal,
        quotation_id: &QuotationId,
    ) -> Result<(Quotation, Order)> {
        if !permissions::is_allowed(actor.role, Action::AcceptQuotation) {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "accept a quotation".to_string(),
            });
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        check_quotation_visibility(state, quotation_id, actor)?;

        let quotation = state
            .quotations
            .get(quotation_id)
            .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))?;

        if !quotation.status.is_terminal() && quotation.is_expired(Utc::now()) {
            return Err(FreightError::InvalidState(QuotationStatus::Expired));
        }

        let final_amount = quotation.total_amount;
        let outcome =
            self.quotation_lifecycle
                .accept(&mut state.quotations, quotation_id, final_amount)?;
        self.emit(DomainEvent::QuotationAccepted {
            quotation_id: quotation_id.clone(),
            final_amount: outcome.final_amount,
            rejected_siblings: outcome.rejected_siblings.clone(),
        });

        let (quotation, order) = self.materialize_order(state, quotation_id, actor)?;
        Ok((quotation, order))
    }

    /// Reject a quotation; siblings are unaffected
    pub async fn reject_quotation(
        &self,
        actor: &Principal,
        quotation_id: &QuotationId,
    ) -> Result<Quotation> {
        if !permissions::is_allowed(actor.role, Action::RejectQuotation) {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "reject a quotation".to_string(),
            });
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        check_quotation_visibility(state, quotation_id, actor)?;

        self.quotation_lifecycle.reject(&mut state.quotations, quotation_id)?;
        self.emit(DomainEvent::QuotationRejected {
            quotation_id: quotation_id.clone(),
        });

        state
            .quotations
            .get(quotation_id)
            .cloned()
            .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))
    }

    /// Advance an order through the status graph
    pub async fn update_order_status(
        &self,
        actor: &Principal,
        order_id: &OrderId,
        new_status: OrderStatus,
        ctx: StatusContext,
    ) -> Result<(Order, OrderStatusRecord)> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| FreightError::OrderNotFound(order_id.0.clone()))?;
        check_order_visibility(order, actor, order_id)?;

        let record = self.order_lifecycle.update_status(
            order,
            new_status,
            actor,
            ctx,
            &mut state.trucks,
            &state.drivers,
            Utc::now(),
        )?;

        if let Some(previous) = record.previous_status {
            self.emit(DomainEvent::OrderStatusChanged {
                order_id: order_id.clone(),
                previous,
                new: record.new_status,
            });
        }

        Ok((order.clone(), record))
    }

    /// Confirm an order's delivery verification code
    pub async fn confirm_delivery_code(
        &self,
        actor: &Principal,
        order_id: &OrderId,
        code: &str,
    ) -> Result<Order> {
        if !permissions::is_allowed(actor.role, Action::ConfirmDeliveryCode) {
            return Err(FreightError::InsufficientPermission {
                role: actor.role,
                action: "confirm the delivery code".to_string(),
            });
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| FreightError::OrderNotFound(order_id.0.clone()))?;
        check_order_visibility(order, actor, order_id)?;

        self.order_lifecycle.confirm_delivery_code(order, code)?;
        Ok(order.clone())
    }

    /// One pass of the expiry sweep. Idempotent and safe to run alongside
    /// user-triggered operations; returns the number of quotations expired.
    pub async fn expire_quotations(&self) -> usize {
        let mut guard = self.state.lock().await;
        let expired = self.quotation_lifecycle.expire_due(&mut guard.quotations, Utc::now());

        for quotation_id in &expired {
            self.emit(DomainEvent::QuotationExpired {
                quotation_id: quotation_id.clone(),
            });
        }
        expired.len()
    }

    /// Run the expiry sweep on a fixed interval. The only operation not
    /// triggered by a caller.
    pub async fn run_expiry_sweep(&self, period: std::time::Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let expired = self.expire_quotations().await;
            if expired > 0 {
                tracing::info!(expired, "Expiry sweep pass complete");
            }
        }
    }

    // ---- Queries ----

    pub async fn get_quotation(&self, quotation_id: &QuotationId) -> Option<Quotation> {
        self.state.lock().await.quotations.get(quotation_id).cloned()
    }

    pub async fn get_order(&self, order_id: &OrderId) -> Option<Order> {
        self.state.lock().await.orders.get(order_id).cloned()
    }

    pub async fn get_truck(&self, truck_id: &TruckId) -> Option<Truck> {
        self.state.lock().await.trucks.get(truck_id).cloned()
    }

    pub async fn quotations_for_request(&self, request_id: &RequestId) -> Vec<Quotation> {
        self.state
            .lock()
            .await
            .quotations
            .values()
            .filter(|q| q.request_id == *request_id)
            .cloned()
            .collect()
    }

    // ---- Internal ----

    /// Create and store the order for a freshly accepted quotation
    fn materialize_order(
        &self,
        state: &mut MarketState,
        quotation_id: &QuotationId,
        actor: &Principal,
    ) -> Result<(Quotation, Order)> {
        let quotation = state
            .quotations
            .get(quotation_id)
            .cloned()
            .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))?;
        let request = state
            .requests
            .get(&quotation.request_id)
            .ok_or_else(|| FreightError::RequestNotFound(quotation.request_id.0.clone()))?;

        let order = self
            .order_lifecycle
            .create_from_quotation(&quotation, request, &state.orders, actor, Utc::now())?;
        state.orders.insert(order.id.clone(), order.clone());

        self.emit(DomainEvent::OrderCreated {
            order_id: order.id.clone(),
            quotation_id: quotation_id.clone(),
            total_amount: order.total_amount,
        });

        Ok((quotation, order))
    }
}

/// Resolve a quotation for an actor without leaking existence: a principal
/// with no relationship to it sees not-found, never a permission error.
fn check_quotation_visibility(
    state: &MarketState,
    quotation_id: &QuotationId,
    actor: &Principal,
) -> Result<()> {
    let quotation = state
        .quotations
        .get(quotation_id)
        .ok_or_else(|| FreightError::QuotationNotFound(quotation_id.0.clone()))?;

    match actor.role {
        Role::Manager | Role::Admin => Ok(()),
        Role::Vendor if quotation.vendor == actor.id => Ok(()),
        Role::Customer => {
            let owns_request = state
                .requests
                .get(&quotation.request_id)
                .map(|r| r.customer == actor.id)
                .unwrap_or(false);
            if owns_request {
                Ok(())
            } else {
                Err(FreightError::QuotationNotFound(quotation_id.0.clone()))
            }
        }
        _ => Err(FreightError::QuotationNotFound(quotation_id.0.clone())),
    }
}

fn check_order_visibility(order: &Order, actor: &Principal, order_id: &OrderId) -> Result<()> {
    match actor.role {
        Role::Manager | Role::Admin => Ok(()),
        Role::Vendor if order.vendor == actor.id => Ok(()),
        Role::Customer if order.customer == actor.id => Ok(()),
        _ => Err(FreightError::OrderNotFound(order_id.0.clone())),
    }
}
