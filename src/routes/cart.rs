use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::Result,
    models::{Cart, ReplaceCartRequest, Session, SyncCartRequest},
    services::cart_service,
};

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Cart>> {
    let cart = cart_service::get_cart(state.store.as_ref(), &session).await?;

    Ok(Json(cart))
}

pub async fn sync_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SyncCartRequest>,
) -> Result<Json<Cart>> {
    let cart = cart_service::sync_cart(state.store.as_ref(), &session, payload).await?;

    Ok(Json(cart))
}

pub async fn replace_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ReplaceCartRequest>,
) -> Result<Json<Cart>> {
    let cart = cart_service::replace_cart(state.store.as_ref(), &session, payload).await?;

    Ok(Json(cart))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>> {
    cart_service::clear_cart(state.store.as_ref(), &session).await?;

    Ok(Json(json!({ "message": "Cart cleared" })))
}
