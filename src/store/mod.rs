//! Persistence seam.
//!
//! Every implementation must enforce the same uniqueness guarantees:
//! one cart per owner, unique order ids, one idempotency key per owner,
//! at most one default address per owner and one review per
//! (product, user). Cart merges and replacements for the same owner are
//! serialized by the store itself.

mod memory;
mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        Address, AddressRequest, Cart, LineItem, Order, OrderInsert, OrderStatus, Product,
        ProductPage, ProductQuery, Review, StatusChange,
    },
};

pub use memory::MemoryStore;

/// How long an applied sync token keeps suppressing repeat merges.
pub const SYNC_TOKEN_RETENTION_DAYS: i64 = 30;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name reported by the readiness probe.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<()>;

    // Carts

    async fn get_or_create_cart(&self, owner_id: &str) -> Result<Cart>;

    /// Merges `local` into the owner's cart while holding the owner's cart
    /// lock. A `sync_token` already applied to this cart (from any tab, within
    /// [`SYNC_TOKEN_RETENTION_DAYS`]) leaves the cart untouched.
    async fn merge_cart(
        &self,
        owner_id: &str,
        local: &[LineItem],
        sync_token: Option<&str>,
    ) -> Result<Cart>;

    /// Replaces the owner's items. Fails with a conflict when
    /// `expected_version` is given and no longer matches.
    async fn replace_cart(
        &self,
        owner_id: &str,
        items: &[LineItem],
        expected_version: Option<i64>,
    ) -> Result<Cart>;

    async fn clear_cart(&self, owner_id: &str) -> Result<()>;

    // Catalog

    async fn find_product(&self, slug: &str) -> Result<Option<Product>>;
    async fn find_products(&self, slugs: &[String]) -> Result<HashMap<String, Product>>;
    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage>;

    // Orders

    async fn insert_order(&self, order: &Order) -> Result<OrderInsert>;
    async fn find_order(&self, order_id: &str) -> Result<Option<Order>>;
    async fn find_order_by_idempotency_key(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<Order>>;
    async fn list_orders(&self, owner_id: &str) -> Result<Vec<Order>>;

    /// Applies `change` only if the order is still in status `from`.
    /// Returns `None` when the order is missing or was changed meanwhile.
    async fn update_order_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        change: &StatusChange,
    ) -> Result<Option<Order>>;

    // Addresses

    async fn list_addresses(&self, owner_id: &str) -> Result<Vec<Address>>;
    async fn find_address(&self, owner_id: &str, id: Uuid) -> Result<Option<Address>>;
    async fn insert_address(&self, owner_id: &str, req: &AddressRequest) -> Result<Address>;
    async fn update_address(
        &self,
        owner_id: &str,
        id: Uuid,
        req: &AddressRequest,
    ) -> Result<Option<Address>>;
    async fn delete_address(&self, owner_id: &str, id: Uuid) -> Result<bool>;

    // Reviews

    /// Fails with a conflict when the user already reviewed the product.
    async fn insert_review(&self, review: &Review) -> Result<Review>;
    async fn list_public_reviews(&self, product_slug: &str) -> Result<Vec<Review>>;

    /// Average and count over approved, non-hidden reviews.
    async fn rating_stats(&self, product_slug: &str) -> Result<(Option<f64>, i64)>;
}

pub(crate) const DUPLICATE_REVIEW: &str =
    "Duplicate review not allowed. You have already reviewed this product.";
pub(crate) const DEFAULT_ADDRESS_RACE: &str =
    "Another default address was saved at the same time, please retry";

pub(crate) fn version_conflict(expected: i64, found: i64) -> crate::error::AppError {
    crate::error::AppError::Conflict(format!(
        "Cart was modified concurrently (expected version {}, found {})",
        expected, found
    ))
}
