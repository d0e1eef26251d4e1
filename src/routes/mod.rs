mod admin;
mod cart;
mod health;
mod orders;
mod products;
mod reviews;
mod user_addresses;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
};

use crate::{
    AppState,
    middleware::{admin_middleware, auth_middleware},
};

pub fn create_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/products", get(products::search_products))
        .route("/products/{slug}", get(products::get_product))
        .route("/reviews/{product_slug}", get(reviews::get_reviews))
        .route("/reviews/{product_slug}/summary", get(reviews::get_summary));

    let authenticated = Router::new()
        .route(
            "/cart",
            get(cart::get_cart)
                .put(cart::replace_cart)
                .delete(cart::clear_cart),
        )
        .route("/cart/sync", post(cart::sync_cart))
        .route("/orders", get(orders::get_orders))
        .route("/orders/create", post(orders::create_order))
        .route("/orders/{order_id}", get(orders::get_order))
        .route("/orders/{order_id}/cancel", patch(orders::cancel_order))
        .route("/reviews/submit", post(reviews::submit_review))
        .route(
            "/users/addresses",
            get(user_addresses::get_addresses).post(user_addresses::add_address),
        )
        .route(
            "/users/addresses/{id}",
            put(user_addresses::update_address).delete(user_addresses::delete_address),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route(
            "/admin/orders/{order_id}/status",
            patch(admin::update_order_status),
        )
        .route_layer(from_fn_with_state(state, admin_middleware));

    public.merge(authenticated).merge(admin)
}
