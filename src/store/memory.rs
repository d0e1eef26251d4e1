use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{DUPLICATE_REVIEW, SYNC_TOKEN_RETENTION_DAYS, Store, version_conflict};
use crate::{
    error::{AppError, Result},
    models::{
        Address, AddressRequest, Cart, LineItem, Order, OrderInsert, OrderStatus, Product,
        ProductPage, ProductQuery, Review, SortBy, StatusChange,
    },
    services::cart_service,
};

struct StoredCart {
    cart: Cart,
    /// Applied sync tokens and when they were applied.
    sync_tokens: HashMap<String, DateTime<Utc>>,
}

#[derive(Default)]
struct State {
    carts: HashMap<String, StoredCart>,
    products: HashMap<String, Product>,
    orders: Vec<Order>,
    addresses: Vec<Address>,
    reviews: Vec<Review>,
}

/// In-process store. One lock guards all state, so every operation is
/// atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_cart_clear: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state
            .lock()
            .await
            .products
            .insert(product.slug.clone(), product);
    }

    /// Makes `clear_cart` fail, to exercise best-effort cleanup paths.
    pub fn fail_cart_clear(&self, fail: bool) {
        self.fail_cart_clear.store(fail, Ordering::SeqCst);
    }
}

impl State {
    fn cart_entry(&mut self, owner_id: &str) -> &mut StoredCart {
        self.carts
            .entry(owner_id.to_string())
            .or_insert_with(|| StoredCart {
                cart: Cart::empty(owner_id),
                sync_tokens: HashMap::new(),
            })
    }

    fn write_cart(&mut self, owner_id: &str, items: Vec<LineItem>) -> Cart {
        let stored = self.cart_entry(owner_id);
        stored.cart.items = items;
        stored.cart.version += 1;
        stored.cart.last_updated = Utc::now();
        stored.cart.clone()
    }

    fn build_address(owner_id: &str, id: Uuid, req: &AddressRequest) -> Address {
        Address {
            id,
            owner_id: owner_id.to_string(),
            full_name: req.full_name.clone(),
            phone: req.phone.clone(),
            line1: req.line1.clone(),
            line2: req.line2.clone(),
            city: req.city.clone(),
            state: req.state.clone(),
            pincode: req.pincode.clone(),
            country: req.country.clone(),
            is_default: req.is_default,
            address_type: req.address_type,
            created_at: Utc::now(),
        }
    }

    fn unset_defaults(&mut self, owner_id: &str, except: Option<Uuid>) {
        for address in self
            .addresses
            .iter_mut()
            .filter(|a| a.owner_id == owner_id && Some(a.id) != except)
        {
            address.is_default = false;
        }
    }
}

fn matches_filters(product: &Product, query: &ProductQuery) -> bool {
    let categories = query.categories();
    if !categories.is_empty() && !categories.contains(&product.category) {
        return false;
    }

    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let q = q.to_lowercase();
        if !product.name.to_lowercase().contains(&q)
            && !product.description.to_lowercase().contains(&q)
        {
            return false;
        }
    }

    if query.min_price.is_some_and(|min| product.price < min)
        || query.max_price.is_some_and(|max| product.price > max)
    {
        return false;
    }

    let sizes = query.sizes();
    if !sizes.is_empty() && !product.sizes.iter().any(|s| sizes.contains(s)) {
        return false;
    }

    let colors = query.colors();
    if !colors.is_empty() && !product.colors.iter().any(|c| colors.contains(c)) {
        return false;
    }

    !query.rating.is_some_and(|rating| product.rating < rating)
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn get_or_create_cart(&self, owner_id: &str) -> Result<Cart> {
        let mut state = self.state.lock().await;
        Ok(state.cart_entry(owner_id).cart.clone())
    }

    async fn merge_cart(
        &self,
        owner_id: &str,
        local: &[LineItem],
        sync_token: Option<&str>,
    ) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let stored = state.cart_entry(owner_id);

        if let Some(token) = sync_token {
            let now = Utc::now();
            let cutoff = now - Duration::days(SYNC_TOKEN_RETENTION_DAYS);
            stored.sync_tokens.retain(|_, applied_at| *applied_at > cutoff);

            if stored.sync_tokens.contains_key(token) {
                return Ok(stored.cart.clone());
            }
            stored.sync_tokens.insert(token.to_string(), now);
        }

        let merged = cart_service::merge_items(&stored.cart.items, local);
        Ok(state.write_cart(owner_id, merged))
    }

    async fn replace_cart(
        &self,
        owner_id: &str,
        items: &[LineItem],
        expected_version: Option<i64>,
    ) -> Result<Cart> {
        let mut state = self.state.lock().await;
        let current = state.cart_entry(owner_id).cart.version;

        if let Some(expected) = expected_version {
            if expected != current {
                return Err(version_conflict(expected, current));
            }
        }

        Ok(state.write_cart(owner_id, items.to_vec()))
    }

    async fn clear_cart(&self, owner_id: &str) -> Result<()> {
        if self.fail_cart_clear.load(Ordering::SeqCst) {
            return Err(AppError::InternalError("cart storage unavailable".to_string()));
        }

        let mut state = self.state.lock().await;
        if state.carts.contains_key(owner_id) {
            state.write_cart(owner_id, Vec::new());
        }
        Ok(())
    }

    async fn find_product(&self, slug: &str) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(slug).cloned())
    }

    async fn find_products(&self, slugs: &[String]) -> Result<HashMap<String, Product>> {
        let state = self.state.lock().await;
        Ok(slugs
            .iter()
            .filter_map(|slug| state.products.get(slug))
            .map(|product| (product.slug.clone(), product.clone()))
            .collect())
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let state = self.state.lock().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| matches_filters(product, query))
            .cloned()
            .collect();

        products.sort_by(|a, b| {
            let primary = match query.sort {
                Some(SortBy::PriceAsc) => a.price.cmp(&b.price),
                Some(SortBy::PriceDesc) => b.price.cmp(&a.price),
                Some(SortBy::Rating) => b.rating.cmp(&a.rating),
                Some(SortBy::Popular) => b.reviews.cmp(&a.reviews),
                Some(SortBy::Newest) | None => b.created_at.cmp(&a.created_at),
            };
            primary.then_with(|| a.slug.cmp(&b.slug))
        });

        let total = products.len() as i64;
        let limit = query.page_limit();
        let offset = query.page_offset();
        let products = products
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        Ok(ProductPage {
            products,
            total,
            limit,
            offset,
        })
    }

    async fn insert_order(&self, order: &Order) -> Result<OrderInsert> {
        let mut state = self.state.lock().await;

        if let Some(key) = order.idempotency_key.as_deref() {
            if let Some(existing) = state.orders.iter().find(|o| {
                o.owner_id == order.owner_id && o.idempotency_key.as_deref() == Some(key)
            }) {
                return Ok(OrderInsert::Replayed(existing.clone()));
            }
        }

        if state.orders.iter().any(|o| o.order_id == order.order_id) {
            return Ok(OrderInsert::OrderIdTaken);
        }

        state.orders.push(order.clone());
        Ok(OrderInsert::Created(order.clone()))
    }

    async fn find_order(&self, order_id: &str) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.order_id == order_id).cloned())
    }

    async fn find_order_by_idempotency_key(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.owner_id == owner_id && o.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list_orders(&self, owner_id: &str) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.owner_id == owner_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        change: &StatusChange,
    ) -> Result<Option<Order>> {
        let mut state = self.state.lock().await;
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| o.order_id == order_id && o.order_status == from)
        else {
            return Ok(None);
        };

        order.order_status = change.to;
        order.status_history.push(change.entry.clone());
        if let Some(tracking) = &change.tracking_number {
            order.tracking_number = Some(tracking.clone());
        }
        if let Some(at) = change.delivered_at {
            order.delivered_at = Some(at);
        }
        if let Some(at) = change.cancelled_at {
            order.cancelled_at = Some(at);
        }
        if let Some(reason) = &change.cancellation_reason {
            order.cancellation_reason = Some(reason.clone());
        }
        if let Some(payment_status) = change.payment_status {
            order.payment_status = payment_status;
        }
        order.updated_at = Utc::now();

        Ok(Some(order.clone()))
    }

    async fn list_addresses(&self, owner_id: &str) -> Result<Vec<Address>> {
        let state = self.state.lock().await;
        let mut addresses: Vec<Address> = state
            .addresses
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        addresses.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(addresses)
    }

    async fn find_address(&self, owner_id: &str, id: Uuid) -> Result<Option<Address>> {
        let state = self.state.lock().await;
        Ok(state
            .addresses
            .iter()
            .find(|a| a.owner_id == owner_id && a.id == id)
            .cloned())
    }

    async fn insert_address(&self, owner_id: &str, req: &AddressRequest) -> Result<Address> {
        let mut state = self.state.lock().await;
        if req.is_default {
            state.unset_defaults(owner_id, None);
        }

        let address = State::build_address(owner_id, Uuid::new_v4(), req);
        state.addresses.push(address.clone());
        Ok(address)
    }

    async fn update_address(
        &self,
        owner_id: &str,
        id: Uuid,
        req: &AddressRequest,
    ) -> Result<Option<Address>> {
        let mut state = self.state.lock().await;
        let Some(position) = state
            .addresses
            .iter()
            .position(|a| a.owner_id == owner_id && a.id == id)
        else {
            return Ok(None);
        };

        if req.is_default {
            state.unset_defaults(owner_id, Some(id));
        }

        let created_at = state.addresses[position].created_at;
        let mut updated = State::build_address(owner_id, id, req);
        updated.created_at = created_at;
        state.addresses[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_address(&self, owner_id: &str, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        let before = state.addresses.len();
        state
            .addresses
            .retain(|a| !(a.owner_id == owner_id && a.id == id));
        Ok(state.addresses.len() < before)
    }

    async fn insert_review(&self, review: &Review) -> Result<Review> {
        let mut state = self.state.lock().await;
        let duplicate = state
            .reviews
            .iter()
            .any(|r| r.product_slug == review.product_slug && r.user.id == review.user.id);
        if duplicate {
            return Err(AppError::Conflict(DUPLICATE_REVIEW.to_string()));
        }

        state.reviews.push(review.clone());
        Ok(review.clone())
    }

    async fn list_public_reviews(&self, product_slug: &str) -> Result<Vec<Review>> {
        let state = self.state.lock().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|r| r.product_slug == product_slug && r.is_public())
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn rating_stats(&self, product_slug: &str) -> Result<(Option<f64>, i64)> {
        let state = self.state.lock().await;
        let ratings: Vec<f64> = state
            .reviews
            .iter()
            .filter(|r| r.product_slug == product_slug && r.is_public())
            .map(|r| f64::from(r.rating))
            .collect();

        if ratings.is_empty() {
            return Ok((None, 0));
        }
        let average = ratings.iter().sum::<f64>() / ratings.len() as f64;
        Ok((Some(average), ratings.len() as i64))
    }
}
