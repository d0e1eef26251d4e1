use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Address, AddressRequest, Session},
};

fn validate(payload: &AddressRequest) -> Result<()> {
    let required = [
        ("fullName", &payload.full_name),
        ("phone", &payload.phone),
        ("line1", &payload.line1),
        ("city", &payload.city),
        ("state", &payload.state),
        ("pincode", &payload.pincode),
    ];

    match required.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(AppError::BadRequest(format!("{} is required", field))),
        None => Ok(()),
    }
}

pub async fn get_addresses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Address>>> {
    let addresses = state.store.list_addresses(&session.owner_id).await?;

    Ok(Json(addresses))
}

pub async fn add_address(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    validate(&payload)?;

    let address = state
        .store
        .insert_address(&session.owner_id, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(address)))
}

pub async fn update_address(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> Result<Json<Address>> {
    validate(&payload)?;

    let address = state
        .store
        .update_address(&session.owner_id, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

    Ok(Json(address))
}

pub async fn delete_address(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    if !state.store.delete_address(&session.owner_id, id).await? {
        return Err(AppError::NotFound("Address not found".to_string()));
    }

    Ok(Json(json!({ "message": "Address deleted" })))
}
