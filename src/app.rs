use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{AppConfig, AuthConfig, StorageBackend, load_ses_client},
    database,
    error::Result,
    routes,
    services::{
        email_service::OrderMailer, order_service::OrderPolicy, pricing_service::PricingPolicy,
    },
    store::{MemoryStore, PgStore, Store},
    utils::extractors::IDEMPOTENCY_KEY_HEADER,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub pricing: PricingPolicy,
    pub orders: OrderPolicy,
    pub auth: AuthConfig,
    pub mailer: Option<Arc<OrderMailer>>,
}

impl AppState {
    /// State without email delivery, over any store.
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            store,
            pricing: config.pricing.clone(),
            orders: config.orders.clone(),
            auth: config.auth.clone(),
            mailer: None,
        }
    }
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let store: Arc<dyn Store> = match &config.storage {
        StorageBackend::Postgres(db) => Arc::new(PgStore::new(database::create_pool(db).await?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mut state = AppState::new(store, config);

    if let Some(sender) = &config.email.sender {
        let client = load_ses_client(&config.email).await?;
        state.mailer = Some(Arc::new(OrderMailer::new(client, sender.clone())));
    }

    router(state, config)
}

pub fn router(state: AppState, config: &AppConfig) -> Result<Router> {
    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                crate::error::AppError::ConfigError(format!("Invalid CORS origin: {}", origin))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::header::AUTHORIZATION,
            http::HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
        ])
        .allow_origin(allowed_origins);

    let app = routes::create_router(state.clone())
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}
