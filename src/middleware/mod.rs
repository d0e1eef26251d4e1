use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    error::AppError,
    models::Session,
    utils::{extractors::extract_bearer_token, jwt::verify_token},
};

fn authenticate(state: &AppState, req: &Request) -> Result<Session, AppError> {
    let token = extract_bearer_token(req.headers())?;
    let claims = verify_token(&state.auth.jwt_secret, token)?;
    Ok(Session::from(claims))
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate(&state, &req)?;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

pub async fn admin_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate(&state, &req)?;

    if !state.auth.admin_emails.contains(&session.email) {
        tracing::warn!(owner_id = %session.owner_id, "Admin access denied");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}
