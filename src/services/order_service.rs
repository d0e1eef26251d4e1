//! Order lifecycle: checkout into an immutable order, then status transitions.
//!
//! ```text
//! placed -> confirmed -> packed -> shipped -> out_for_delivery -> delivered -> returned
//!    \________\__________________________________________________ cancelled
//! ```
//! Only `placed` and `confirmed` may be cancelled. `cancelled` and
//! `returned` are terminal.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    models::{
        CreateOrderRequest, LineItem, Order, OrderInsert, OrderStatus, PaymentMethod,
        PaymentStatus, Pricing, Product, Session, ShippingAddress, StatusChange, StatusEntry,
    },
    services::{
        cart_service,
        pricing_service::{self, PricingPolicy},
    },
    store::Store,
};

const MAX_ORDER_ID_ATTEMPTS: usize = 5;
const ORDER_ID_SUFFIX_LEN: usize = 5;
const PLACED_NOTE: &str = "Order placed successfully";
const DEFAULT_CANCEL_REASON: &str = "Cancelled by user";
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchMode {
    /// Refuse the order when client and server totals disagree.
    Reject,
    /// Persist the server figures and log the disagreement.
    Override,
}

#[derive(Debug, Clone)]
pub struct OrderPolicy {
    pub tolerance: Decimal,
    pub mismatch: MismatchMode,
    pub estimated_delivery_days: i64,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 2),
            mismatch: MismatchMode::Reject,
            estimated_delivery_days: 7,
        }
    }
}

/// Outcome of checking a client's pricing against the server computation.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingVerdict {
    Accepted(Pricing),
    Adjusted { client: Pricing, server: Pricing },
    Rejected { client: Pricing, server: Pricing },
}

pub fn verify_pricing(policy: &OrderPolicy, server: Pricing, client: Option<&Pricing>) -> PricingVerdict {
    let Some(client) = client else {
        return PricingVerdict::Accepted(server);
    };

    if *client == server {
        return PricingVerdict::Accepted(server);
    }

    let drift = (client.total - server.total).abs();
    if drift <= policy.tolerance || policy.mismatch == MismatchMode::Override {
        PricingVerdict::Adjusted {
            client: *client,
            server,
        }
    } else {
        PricingVerdict::Rejected {
            client: *client,
            server,
        }
    }
}

pub fn next_statuses(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;

    match from {
        Placed => &[Confirmed, Cancelled],
        Confirmed => &[Packed, Cancelled],
        Packed => &[Shipped],
        Shipped => &[OutForDelivery],
        OutForDelivery => &[Delivered],
        Delivered => &[Returned],
        Cancelled | Returned => &[],
    }
}

pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    next_statuses(from).contains(&to)
}

pub fn initial_payment_status(method: PaymentMethod) -> PaymentStatus {
    match method {
        PaymentMethod::Cod => PaymentStatus::Pending,
        PaymentMethod::Upi | PaymentMethod::Card | PaymentMethod::Netbanking | PaymentMethod::Wallet => {
            PaymentStatus::Completed
        }
    }
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// `ORD-<base36 millis>-<5 random base36>`, e.g. `ORD-MC4Z1K2A-7Q0XD`.
pub fn generate_order_id(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or_default();

    format!("ORD-{}-{}", to_base36(millis), suffix)
}

pub fn validate_shipping_address(address: &ShippingAddress) -> Result<()> {
    let required = [
        ("fullName", &address.full_name),
        ("phone", &address.phone),
        ("line1", &address.line1),
        ("city", &address.city),
        ("state", &address.state),
        ("pincode", &address.pincode),
    ];

    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "shippingAddress.{} is required",
                field
            )));
        }
    }

    Ok(())
}

/// Copies catalog name, image and price into each line. Client-sent prices
/// are ignored.
pub fn snapshot_items(items: &[LineItem], catalog: &HashMap<String, Product>) -> Result<Vec<LineItem>> {
    let lines = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let product = catalog.get(&item.product_ref).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "items[{}].productRef '{}' is not in the catalog",
                    index, item.product_ref
                ))
            })?;

            if !product.sizes.is_empty() && !product.sizes.contains(&item.size) {
                return Err(AppError::BadRequest(format!(
                    "items[{}].size '{}' is not available",
                    index, item.size
                )));
            }

            if let Some(color) = &item.color {
                if !product.colors.is_empty() && !product.colors.contains(color) {
                    return Err(AppError::BadRequest(format!(
                        "items[{}].color '{}' is not available",
                        index, color
                    )));
                }
            }

            Ok(LineItem {
                product_ref: product.slug.clone(),
                name: product.name.clone(),
                image: product.image.clone(),
                unit_price: product.price,
                quantity: item.quantity,
                size: item.size.clone(),
                color: item.color.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cart_service::merge_items(&[], &lines))
}

/// Everything needed to build an order, already validated.
pub struct Checkout<'a> {
    pub session: &'a Session,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub client_pricing: Option<Pricing>,
    pub idempotency_key: Option<String>,
}

pub fn build_order(
    pricing_policy: &PricingPolicy,
    policy: &OrderPolicy,
    checkout: Checkout<'_>,
    now: DateTime<Utc>,
) -> Result<Order> {
    // No voucher engine: the server never grants a discount on its own
    let server = pricing_service::price_items(pricing_policy, &checkout.items, Decimal::ZERO);

    let pricing = match verify_pricing(policy, server, checkout.client_pricing.as_ref()) {
        PricingVerdict::Accepted(pricing) => pricing,
        PricingVerdict::Adjusted { client, server } => {
            tracing::warn!(
                owner_id = %checkout.session.owner_id,
                client_total = %client.total,
                server_total = %server.total,
                "Client pricing adjusted to server figures"
            );
            server
        }
        PricingVerdict::Rejected { client, server } => {
            tracing::warn!(
                owner_id = %checkout.session.owner_id,
                client_total = %client.total,
                server_total = %server.total,
                "Client pricing rejected"
            );
            return Err(AppError::PricingRejected(format!(
                "pricing.total {} does not match the current total {}",
                client.total, server.total
            )));
        }
    };

    Ok(Order {
        order_id: generate_order_id(now),
        owner_id: checkout.session.owner_id.clone(),
        owner_email: checkout.session.email.clone(),
        items: checkout.items,
        shipping_address: checkout.shipping_address,
        payment_method: checkout.payment_method,
        payment_status: initial_payment_status(checkout.payment_method),
        order_status: OrderStatus::Placed,
        subtotal: pricing.subtotal,
        shipping_charges: pricing.shipping_charges,
        tax: pricing.tax,
        discount: pricing.discount,
        total: pricing.total,
        status_history: vec![StatusEntry {
            status: OrderStatus::Placed,
            timestamp: now,
            note: PLACED_NOTE.to_string(),
        }],
        tracking_number: None,
        estimated_delivery: now + Duration::days(policy.estimated_delivery_days),
        delivered_at: None,
        cancelled_at: None,
        cancellation_reason: None,
        idempotency_key: checkout.idempotency_key,
        created_at: now,
        updated_at: now,
    })
}

#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    /// True when an earlier request with the same idempotency key created it.
    pub replayed: bool,
}

/// Runs order operations against a store.
pub struct OrderLifecycle<'a> {
    store: &'a dyn Store,
    pricing: &'a PricingPolicy,
    policy: &'a OrderPolicy,
}

impl<'a> OrderLifecycle<'a> {
    pub fn new(store: &'a dyn Store, pricing: &'a PricingPolicy, policy: &'a OrderPolicy) -> Self {
        Self {
            store,
            pricing,
            policy,
        }
    }

    pub async fn create(
        &self,
        session: &Session,
        req: CreateOrderRequest,
        idempotency_key: Option<String>,
    ) -> Result<PlacedOrder> {
        let idempotency_key = idempotency_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        if let Some(key) = idempotency_key.as_deref() {
            if let Some(order) = self
                .store
                .find_order_by_idempotency_key(&session.owner_id, key)
                .await?
            {
                tracing::info!(owner_id = %session.owner_id, order_id = %order.order_id, "Order replayed");
                return Ok(PlacedOrder {
                    order,
                    replayed: true,
                });
            }
        }

        let items = cart_service::normalize_items(req.items)?;
        if items.is_empty() {
            return Err(AppError::BadRequest("items: cart is empty".to_string()));
        }

        let shipping_address = match (req.shipping_address, req.address_id) {
            (Some(address), _) => address,
            (None, Some(address_id)) => self
                .store
                .find_address(&session.owner_id, address_id)
                .await?
                .ok_or_else(|| AppError::BadRequest("addressId: address not found".to_string()))?
                .snapshot(),
            (None, None) => {
                return Err(AppError::BadRequest("shippingAddress is required".to_string()));
            }
        };
        validate_shipping_address(&shipping_address)?;

        let payment_method = req
            .payment_method
            .ok_or_else(|| AppError::BadRequest("paymentMethod is required".to_string()))?;

        let slugs: Vec<String> = items.iter().map(|i| i.product_ref.clone()).collect();
        let catalog = self.store.find_products(&slugs).await?;
        let items = snapshot_items(&items, &catalog)?;

        let mut order = build_order(
            self.pricing,
            self.policy,
            Checkout {
                session,
                items,
                shipping_address,
                payment_method,
                client_pricing: req.pricing,
                idempotency_key,
            },
            Utc::now(),
        )?;

        let mut attempts = 0;
        let (order, replayed) = loop {
            attempts += 1;
            match self.store.insert_order(&order).await? {
                OrderInsert::Created(created) => break (created, false),
                OrderInsert::Replayed(existing) => break (existing, true),
                OrderInsert::OrderIdTaken if attempts < MAX_ORDER_ID_ATTEMPTS => {
                    tracing::warn!(order_id = %order.order_id, "Order id collision, regenerating");
                    order.order_id = generate_order_id(Utc::now());
                }
                OrderInsert::OrderIdTaken => {
                    return Err(AppError::InternalError(format!(
                        "could not allocate a unique order id for owner {}",
                        session.owner_id
                    )));
                }
            }
        };

        if !replayed {
            tracing::info!(
                owner_id = %session.owner_id,
                order_id = %order.order_id,
                total = %order.total,
                "Order placed"
            );

            // The order stands even if the cart cannot be emptied
            if let Err(e) = self.store.clear_cart(&session.owner_id).await {
                tracing::warn!(
                    owner_id = %session.owner_id,
                    order_id = %order.order_id,
                    error = %e,
                    "Failed to clear cart after order placement"
                );
            }
        }

        Ok(PlacedOrder { order, replayed })
    }

    pub async fn list(&self, session: &Session) -> Result<Vec<Order>> {
        self.store.list_orders(&session.owner_id).await
    }

    /// Orders owned by someone else are reported exactly like missing ones.
    pub async fn get(&self, session: &Session, order_id: &str) -> Result<Order> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|order| order.owner_id == session.owner_id)
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
    }

    pub async fn cancel(&self, session: &Session, order_id: &str, reason: Option<String>) -> Result<Order> {
        let order = self.get(session, order_id).await?;

        if !can_transition(order.order_status, OrderStatus::Cancelled) {
            return Err(AppError::InvalidTransition(format!(
                "Order cannot be cancelled at this stage (status: {})",
                order.order_status
            )));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());
        let now = Utc::now();

        let change = StatusChange {
            to: OrderStatus::Cancelled,
            entry: StatusEntry {
                status: OrderStatus::Cancelled,
                timestamp: now,
                note: reason.clone(),
            },
            tracking_number: None,
            delivered_at: None,
            cancelled_at: Some(now),
            cancellation_reason: Some(reason),
            payment_status: None,
        };

        let cancelled = self.apply(&order, &change).await?;
        tracing::info!(owner_id = %session.owner_id, order_id = %order_id, "Order cancelled");
        Ok(cancelled)
    }

    /// Moves an order along the state machine on behalf of the store staff.
    pub async fn advance(
        &self,
        order_id: &str,
        to: OrderStatus,
        note: Option<String>,
        tracking_number: Option<String>,
    ) -> Result<Order> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

        if !can_transition(order.order_status, to) {
            return Err(AppError::InvalidTransition(format!(
                "Order cannot move from {} to {}",
                order.order_status, to
            )));
        }

        let now = Utc::now();
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Order {}", to.as_str().replace('_', " ")));

        let change = StatusChange {
            to,
            entry: StatusEntry {
                status: to,
                timestamp: now,
                note: note.clone(),
            },
            tracking_number: tracking_number.filter(|t| !t.trim().is_empty()),
            delivered_at: (to == OrderStatus::Delivered).then_some(now),
            cancelled_at: (to == OrderStatus::Cancelled).then_some(now),
            cancellation_reason: (to == OrderStatus::Cancelled).then_some(note),
            payment_status: None,
        };

        let updated = self.apply(&order, &change).await?;
        tracing::info!(order_id = %order_id, status = %to, "Order status updated");
        Ok(updated)
    }

    async fn apply(&self, order: &Order, change: &StatusChange) -> Result<Order> {
        self.store
            .update_order_status(&order.order_id, order.order_status, change)
            .await?
            .ok_or_else(|| {
                AppError::Conflict("Order status changed concurrently, please retry".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pricing(total: Decimal) -> Pricing {
        Pricing {
            subtotal: dec!(120),
            shipping_charges: Decimal::ZERO,
            tax: dec!(21.6),
            discount: Decimal::ZERO,
            total,
        }
    }

    #[test]
    fn only_placed_and_confirmed_are_cancellable() {
        use OrderStatus::*;

        for status in [Placed, Confirmed] {
            assert!(can_transition(status, Cancelled), "{status}");
        }
        for status in [Packed, Shipped, OutForDelivery, Delivered, Cancelled, Returned] {
            assert!(!can_transition(status, Cancelled), "{status}");
        }
    }

    #[test]
    fn forward_path_reaches_delivered_then_returned() {
        use OrderStatus::*;

        let path = [Placed, Confirmed, Packed, Shipped, OutForDelivery, Delivered, Returned];
        for pair in path.windows(2) {
            assert!(can_transition(pair[0], pair[1]));
        }
        assert!(!can_transition(Placed, Shipped));
        assert!(!can_transition(Delivered, Placed));
        assert!(next_statuses(Cancelled).is_empty());
        assert!(next_statuses(Returned).is_empty());
    }

    #[test]
    fn cash_on_delivery_starts_pending() {
        assert_eq!(initial_payment_status(PaymentMethod::Cod), PaymentStatus::Pending);
        assert_eq!(initial_payment_status(PaymentMethod::Upi), PaymentStatus::Completed);
        assert_eq!(initial_payment_status(PaymentMethod::Card), PaymentStatus::Completed);
    }

    #[test]
    fn order_ids_are_prefixed_and_distinct() {
        let now = Utc::now();
        let a = generate_order_id(now);
        let b = generate_order_id(now);

        assert!(a.starts_with("ORD-"));
        assert_eq!(a.split('-').count(), 3);
        assert_eq!(a, a.to_uppercase());
        assert_ne!(a, b);
    }

    #[test]
    fn base36_encoding() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn verdicts() {
        let policy = OrderPolicy::default();
        let server = pricing(dec!(141.6));

        assert_eq!(verify_pricing(&policy, server, None), PricingVerdict::Accepted(server));
        assert_eq!(
            verify_pricing(&policy, server, Some(&server)),
            PricingVerdict::Accepted(server)
        );
        assert!(matches!(
            verify_pricing(&policy, server, Some(&pricing(dec!(141.605)))),
            PricingVerdict::Adjusted { .. }
        ));
        assert!(matches!(
            verify_pricing(&policy, server, Some(&pricing(dec!(1)))),
            PricingVerdict::Rejected { .. }
        ));

        let lenient = OrderPolicy {
            mismatch: MismatchMode::Override,
            ..OrderPolicy::default()
        };
        assert!(matches!(
            verify_pricing(&lenient, server, Some(&pricing(dec!(1)))),
            PricingVerdict::Adjusted { .. }
        ));
    }

    #[test]
    fn missing_address_fields_are_named() {
        let address = ShippingAddress {
            full_name: "Asha Rao".to_string(),
            phone: "9876543210".to_string(),
            line1: "12 MG Road".to_string(),
            line2: None,
            city: " ".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
            country: "India".to_string(),
        };

        let err = validate_shipping_address(&address).unwrap_err();
        assert!(err.to_string().contains("shippingAddress.city"));
    }
}
