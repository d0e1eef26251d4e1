use std::{collections::HashMap, env, str::FromStr};

use rust_decimal::Decimal;

use crate::{
    error::{AppError, Result},
    services::{
        order_service::{MismatchMode, OrderPolicy},
        pricing_service::PricingPolicy,
    },
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub pricing: PricingPolicy,
    pub orders: OrderPolicy,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub enum StorageBackend {
    Postgres(DatabaseConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    /// Order confirmations are only sent when a sender is configured.
    pub sender: Option<String>,
    pub region: String,
}

type Lookup<'a> = &'a dyn Fn(&str) -> std::result::Result<String, env::VarError>;

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key| env::var(key))
    }

    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(&|key| vars.get(key).cloned().ok_or(env::VarError::NotPresent))
    }

    fn from_lookup(var: Lookup<'_>) -> Result<Self> {
        let storage = match var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .as_str()
        {
            "postgres" => StorageBackend::Postgres(DatabaseConfig {
                url: var("DB_URL")
                    .map_err(|_| AppError::ConfigError("DB_URL not set".to_string()))?,
                max_connections: parse_or(var, "DB_MAX_CONNECTIONS", 20)?,
                acquire_timeout_secs: parse_or(var, "DB_ACQUIRE_TIMEOUT_SECS", 5)?,
            }),
            "memory" => StorageBackend::Memory,
            other => {
                return Err(AppError::ConfigError(format!(
                    "Invalid STORAGE_BACKEND value: {}",
                    other
                )));
            }
        };

        let mismatch = match var("PRICING_MISMATCH")
            .unwrap_or_else(|_| "reject".to_string())
            .as_str()
        {
            "reject" => MismatchMode::Reject,
            "override" => MismatchMode::Override,
            other => {
                return Err(AppError::ConfigError(format!(
                    "Invalid PRICING_MISMATCH value: {}",
                    other
                )));
            }
        };

        Ok(Self {
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or(var, "PORT", 3001)?,
                max_body_size: parse_or(var, "MAX_BODY_SIZE", 1_048_576)?,
            },
            storage,
            cors: CorsConfig {
                allowed_origins: split_list(&var("FRONTEND_URL")?),
            },
            auth: AuthConfig {
                jwt_secret: var("JWT_SECRET")
                    .map_err(|_| AppError::ConfigError("JWT_SECRET not set".to_string()))?,
                admin_emails: var("ADMIN_EMAILS")
                    .map(|v| {
                        split_list(&v)
                            .into_iter()
                            .map(|email| email.to_lowercase())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            pricing: PricingPolicy {
                free_shipping_threshold: parse_or(var, "FREE_SHIPPING_THRESHOLD", Decimal::ONE_HUNDRED)?,
                flat_shipping_fee: parse_or(var, "FLAT_SHIPPING_FEE", Decimal::TEN)?,
                tax_rate: parse_or(var, "TAX_RATE", Decimal::new(18, 2))?,
            },
            orders: OrderPolicy {
                tolerance: parse_or(var, "PRICING_TOLERANCE", Decimal::new(1, 2))?,
                mismatch,
                estimated_delivery_days: parse_or(var, "ESTIMATED_DELIVERY_DAYS", 7)?,
            },
            email: EmailConfig {
                sender: var("SES_SENDER_EMAIL").ok().filter(|s| !s.trim().is_empty()),
                region: var("AWS_REGION").unwrap_or_else(|_| "ap-south-1".to_string()),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_or<T: FromStr>(var: Lookup<'_>, key: &str, default: T) -> Result<T> {
    match var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("Invalid {} value", key))),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
