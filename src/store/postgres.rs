use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::Store;
use crate::{
    database,
    error::Result,
    models::{
        Address, AddressRequest, Cart, LineItem, Order, OrderInsert, OrderStatus, Product,
        ProductPage, ProductQuery, Review, StatusChange,
    },
    queries::{address_queries, cart_queries, order_queries, product_queries, review_queries},
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        database::check_health(&self.pool).await
    }

    async fn get_or_create_cart(&self, owner_id: &str) -> Result<Cart> {
        cart_queries::get_or_create_cart(&self.pool, owner_id).await
    }

    async fn merge_cart(
        &self,
        owner_id: &str,
        local: &[LineItem],
        sync_token: Option<&str>,
    ) -> Result<Cart> {
        cart_queries::merge_cart(&self.pool, owner_id, local, sync_token).await
    }

    async fn replace_cart(
        &self,
        owner_id: &str,
        items: &[LineItem],
        expected_version: Option<i64>,
    ) -> Result<Cart> {
        cart_queries::replace_cart(&self.pool, owner_id, items, expected_version).await
    }

    async fn clear_cart(&self, owner_id: &str) -> Result<()> {
        cart_queries::clear_cart(&self.pool, owner_id).await
    }

    async fn find_product(&self, slug: &str) -> Result<Option<Product>> {
        product_queries::find_by_slug(&self.pool, slug).await
    }

    async fn find_products(&self, slugs: &[String]) -> Result<HashMap<String, Product>> {
        product_queries::find_by_slugs(&self.pool, slugs).await
    }

    async fn search_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        product_queries::search_products(&self.pool, query).await
    }

    async fn insert_order(&self, order: &Order) -> Result<OrderInsert> {
        order_queries::insert_order(&self.pool, order).await
    }

    async fn find_order(&self, order_id: &str) -> Result<Option<Order>> {
        order_queries::find_order(&self.pool, order_id).await
    }

    async fn find_order_by_idempotency_key(
        &self,
        owner_id: &str,
        key: &str,
    ) -> Result<Option<Order>> {
        order_queries::find_by_idempotency_key(&self.pool, owner_id, key).await
    }

    async fn list_orders(&self, owner_id: &str) -> Result<Vec<Order>> {
        order_queries::get_user_orders(&self.pool, owner_id).await
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        change: &StatusChange,
    ) -> Result<Option<Order>> {
        order_queries::update_order_status(&self.pool, order_id, from, change).await
    }

    async fn list_addresses(&self, owner_id: &str) -> Result<Vec<Address>> {
        address_queries::get_user_addresses(&self.pool, owner_id).await
    }

    async fn find_address(&self, owner_id: &str, id: Uuid) -> Result<Option<Address>> {
        address_queries::find_user_address(&self.pool, owner_id, id).await
    }

    async fn insert_address(&self, owner_id: &str, req: &AddressRequest) -> Result<Address> {
        address_queries::add_user_address(&self.pool, owner_id, req).await
    }

    async fn update_address(
        &self,
        owner_id: &str,
        id: Uuid,
        req: &AddressRequest,
    ) -> Result<Option<Address>> {
        address_queries::update_user_address(&self.pool, owner_id, id, req).await
    }

    async fn delete_address(&self, owner_id: &str, id: Uuid) -> Result<bool> {
        address_queries::delete_user_address(&self.pool, owner_id, id).await
    }

    async fn insert_review(&self, review: &Review) -> Result<Review> {
        review_queries::insert_review(&self.pool, review).await
    }

    async fn list_public_reviews(&self, product_slug: &str) -> Result<Vec<Review>> {
        review_queries::get_public_reviews(&self.pool, product_slug).await
    }

    async fn rating_stats(&self, product_slug: &str) -> Result<(Option<f64>, i64)> {
        review_queries::get_rating_stats(&self.pool, product_slug).await
    }
}
