use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_slug: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub size_purchased: Option<String>,
    pub image_url: Option<String>,
    pub recommended: bool,
    pub verified: bool,
    #[serde(skip_serializing)]
    pub is_approved: bool,
    #[serde(skip_serializing)]
    pub is_hidden: bool,
    pub user: ReviewUser,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn is_public(&self) -> bool {
        self.is_approved && !self.is_hidden
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub product_slug: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub size_purchased: Option<String>,
    pub image_url: Option<String>,
    pub recommended: bool,
    pub verified: bool,
    pub is_approved: bool,
    pub is_hidden: bool,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_slug: row.product_slug,
            rating: row.rating,
            title: row.title,
            comment: row.comment,
            size_purchased: row.size_purchased,
            image_url: row.image_url,
            recommended: row.recommended,
            verified: row.verified,
            is_approved: row.is_approved,
            is_hidden: row.is_hidden,
            user: ReviewUser {
                id: row.user_id,
                email: row.user_email,
                name: row.user_name,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub product_slug: String,
    pub average_rating: f64,
    pub total_reviews: i64,
}

// Request types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    #[serde(default)]
    pub product_slug: String,
    pub rating: Option<f64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    pub size_purchased: Option<String>,
    pub image_url: Option<String>,
    pub recommended: Option<bool>,
    pub user_name: Option<String>,
}

// Response types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewResponse {
    pub message: String,
    pub review: Review,
    pub rating_summary: RatingSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListResponse {
    #[serde(flatten)]
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}
