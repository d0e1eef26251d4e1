use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::Result,
    models::{Order, Session, UpdateStatusRequest},
    services::order_service::OrderLifecycle,
};

/// Moves an order along the fulfilment state machine on behalf of staff.
pub async fn update_order_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(order_id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Order>> {
    tracing::info!(
        admin = %session.email,
        order_id = %order_id,
        status = %payload.status,
        "Admin status change requested"
    );

    let order = OrderLifecycle::new(state.store.as_ref(), &state.pricing, &state.orders)
        .advance(
            &order_id,
            payload.status,
            payload.note,
            payload.tracking_number,
        )
        .await?;

    Ok(Json(order))
}
