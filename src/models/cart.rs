use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// One (product, size, color, quantity) entry within a cart or an order.
///
/// Inside an order this is a frozen copy: later catalog price changes never
/// reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(alias = "slug", alias = "productSlug")]
    pub product_ref: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    pub quantity: i32,
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LineItem {
    pub fn key(&self) -> LineKey<'_> {
        LineKey {
            product_ref: &self.product_ref,
            size: &self.size,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Identity of a line within a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey<'a> {
    pub product_ref: &'a str,
    pub size: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub owner_id: String,
    pub items: Vec<LineItem>,
    pub version: i64,
    pub last_updated: DateTime<Utc>,
}

impl Cart {
    pub fn empty(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            items: Vec::new(),
            version: 0,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartRow {
    pub owner_id: String,
    pub items: Json<Vec<LineItem>>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            owner_id: row.owner_id,
            items: row.items.0,
            version: row.version,
            last_updated: row.updated_at,
        }
    }
}

// Request types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCartRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Identifies one login transition; a token already applied is not merged again.
    pub sync_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCartRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub expected_version: Option<i64>,
}
