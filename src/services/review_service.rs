use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        RatingSummary, Review, ReviewListResponse, ReviewUser, Session, SubmitReviewRequest,
        SubmitReviewResponse,
    },
    store::Store,
};

const TITLE_LEN: std::ops::RangeInclusive<usize> = 3..=120;
const COMMENT_LEN: std::ops::RangeInclusive<usize> = 10..=2000;
const MISSING_FIELDS: &str = "productSlug, rating, title, and comment are required";
const ANONYMOUS: &str = "Anonymous";

pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

/// Average rounded to one decimal; zero when there are no reviews.
pub fn summarize(product_slug: &str, stats: (Option<f64>, i64)) -> RatingSummary {
    let (average, total_reviews) = stats;
    let average_rating = match average {
        Some(avg) if total_reviews > 0 => (avg * 10.0).round() / 10.0,
        _ => 0.0,
    };

    RatingSummary {
        product_slug: product_slug.to_string(),
        average_rating,
        total_reviews,
    }
}

fn reviewer_name(session: &Session, requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| session.email_local_part())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// Validates a submission and builds the review that would be stored.
pub fn build_review(session: &Session, req: SubmitReviewRequest) -> Result<Review> {
    let product_slug = normalize_slug(&req.product_slug);
    let title = req.title.trim().to_string();
    let comment = req.comment.trim().to_string();

    let Some(rating) = req.rating else {
        return Err(AppError::BadRequest(MISSING_FIELDS.to_string()));
    };
    if product_slug.is_empty() || title.is_empty() || comment.is_empty() {
        return Err(AppError::BadRequest(MISSING_FIELDS.to_string()));
    }

    if rating.fract() != 0.0 || !(1.0..=5.0).contains(&rating) {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    let title_len = title.chars().count();
    if !TITLE_LEN.contains(&title_len) {
        return Err(AppError::BadRequest(format!(
            "title must be between {} and {} characters",
            TITLE_LEN.start(),
            TITLE_LEN.end()
        )));
    }

    let comment_len = comment.chars().count();
    if !COMMENT_LEN.contains(&comment_len) {
        return Err(AppError::BadRequest(format!(
            "comment must be between {} and {} characters",
            COMMENT_LEN.start(),
            COMMENT_LEN.end()
        )));
    }

    Ok(Review {
        id: Uuid::new_v4(),
        product_slug,
        rating: rating as i16,
        title,
        comment,
        size_purchased: req.size_purchased.filter(|s| !s.trim().is_empty()),
        image_url: req.image_url.filter(|s| !s.trim().is_empty()),
        recommended: req.recommended.unwrap_or(true),
        verified: false,
        is_approved: true,
        is_hidden: false,
        user: ReviewUser {
            id: session.owner_id.clone(),
            email: session.email.clone(),
            name: reviewer_name(session, req.user_name.as_deref()),
        },
        created_at: Utc::now(),
    })
}

pub async fn submit_review(
    store: &dyn Store,
    session: &Session,
    req: SubmitReviewRequest,
) -> Result<SubmitReviewResponse> {
    let review = build_review(session, req)?;

    if store.find_product(&review.product_slug).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let review = store.insert_review(&review).await?;
    let stats = store.rating_stats(&review.product_slug).await?;

    tracing::info!(
        owner_id = %session.owner_id,
        product_slug = %review.product_slug,
        rating = review.rating,
        "Review submitted"
    );

    Ok(SubmitReviewResponse {
        message: "Review submitted successfully".to_string(),
        rating_summary: summarize(&review.product_slug, stats),
        review,
    })
}

pub async fn rating_summary(store: &dyn Store, product_slug: &str) -> Result<RatingSummary> {
    let slug = normalize_slug(product_slug);
    let stats = store.rating_stats(&slug).await?;
    Ok(summarize(&slug, stats))
}

pub async fn list_reviews(store: &dyn Store, product_slug: &str) -> Result<ReviewListResponse> {
    let slug = normalize_slug(product_slug);
    if slug.is_empty() {
        return Err(AppError::BadRequest("productSlug is required".to_string()));
    }

    let reviews = store.list_public_reviews(&slug).await?;
    let stats = store.rating_stats(&slug).await?;

    Ok(ReviewListResponse {
        summary: summarize(&slug, stats),
        reviews,
    })
}
