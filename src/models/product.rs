use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub slug: String,
    pub name: String,
    pub category: String,
    pub image: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub badge: Option<String>,
    pub rating: Decimal,
    pub reviews: i32,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub features: Vec<String>,
    pub care_instructions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    PriceAsc,
    PriceDesc,
    Newest,
    Rating,
    Popular,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Comma-separated list.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub q: Option<String>,
    pub sort: Option<SortBy>,
    /// Comma-separated list.
    pub size: Option<String>,
    /// Comma-separated list.
    pub color: Option<String>,
    pub rating: Option<Decimal>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

impl ProductQuery {
    pub fn page_limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page_offset(&self) -> i64 {
        self.offset.filter(|o| *o > 0).unwrap_or(0)
    }

    pub fn categories(&self) -> Vec<String> {
        split_csv(self.category.as_deref())
    }

    pub fn sizes(&self) -> Vec<String> {
        split_csv(self.size.as_deref())
    }

    pub fn colors(&self) -> Vec<String> {
        split_csv(self.color.as_deref())
    }
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
