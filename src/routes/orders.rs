use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{CancelOrderRequest, CreateOrderRequest, Order, Session},
    services::{email_service, order_service::OrderLifecycle},
    utils::extractors::extract_idempotency_key,
};

fn lifecycle(state: &AppState) -> OrderLifecycle<'_> {
    OrderLifecycle::new(state.store.as_ref(), &state.pricing, &state.orders)
}

pub async fn create_order(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let idempotency_key = extract_idempotency_key(&headers)?;
    let placed = lifecycle(&state)
        .create(&session, payload, idempotency_key)
        .await?;

    if placed.replayed {
        return Ok((StatusCode::OK, Json(placed.order)));
    }

    email_service::spawn_order_confirmation(state.mailer.clone(), placed.order.clone());

    Ok((StatusCode::CREATED, Json(placed.order)))
}

pub async fn get_orders(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Order>>> {
    let orders = lifecycle(&state).list(&session).await?;

    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>> {
    let order = lifecycle(&state).get(&session, &order_id).await?;

    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(order_id): Path<String>,
    body: Bytes,
) -> Result<Json<Order>> {
    // The body is optional; an empty one means "no reason given"
    let payload: CancelOrderRequest = if body.is_empty() {
        CancelOrderRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?
    };
    let reason = payload.reason;
    let order = lifecycle(&state)
        .cancel(&session, &order_id, reason)
        .await?;

    Ok(Json(order))
}
