use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use crate::{
    error::{AppError, Result},
    models::{Cart, LineItem},
};

/// Server-side copy of the signed-in owner's cart.
#[async_trait]
pub trait RemoteCart: Send + Sync {
    /// Merges `items` into the remote cart. The server skips a token it
    /// has already applied.
    async fn sync(&self, items: &[LineItem], sync_token: &str) -> Result<Cart>;

    /// Overwrites the remote cart with `items`.
    async fn replace(&self, items: &[LineItem]) -> Result<Cart>;
}

pub struct HttpRemoteCart {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpRemoteCart {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Cart> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::InternalError(format!("Cart API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Cart API error response");
            return Err(match status {
                StatusCode::CONFLICT => AppError::Conflict(body),
                StatusCode::UNAUTHORIZED => AppError::Unauthorized(body),
                StatusCode::BAD_REQUEST => AppError::BadRequest(body),
                _ => AppError::InternalError(format!("Cart API returned {}", status)),
            });
        }

        response
            .json::<Cart>()
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to parse cart response: {}", e)))
    }
}

#[async_trait]
impl RemoteCart for HttpRemoteCart {
    async fn sync(&self, items: &[LineItem], sync_token: &str) -> Result<Cart> {
        let request = self
            .client
            .post(format!("{}/cart/sync", self.base_url))
            .json(&json!({ "items": items, "syncToken": sync_token }));

        self.send(request).await
    }

    async fn replace(&self, items: &[LineItem]) -> Result<Cart> {
        let request = self
            .client
            .put(format!("{}/cart", self.base_url))
            .json(&json!({ "items": items }));

        self.send(request).await
    }
}
