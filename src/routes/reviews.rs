use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::Result,
    models::{RatingSummary, ReviewListResponse, Session, SubmitReviewRequest, SubmitReviewResponse},
    services::review_service,
};

pub async fn submit_review(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<SubmitReviewResponse>)> {
    let response = review_service::submit_review(state.store.as_ref(), &session, payload).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_reviews(
    State(state): State<AppState>,
    Path(product_slug): Path<String>,
) -> Result<Json<ReviewListResponse>> {
    let response = review_service::list_reviews(state.store.as_ref(), &product_slug).await?;

    Ok(Json(response))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(product_slug): Path<String>,
) -> Result<Json<RatingSummary>> {
    let summary = review_service::rating_summary(state.store.as_ref(), &product_slug).await?;

    Ok(Json(summary))
}
