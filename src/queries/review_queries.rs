use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::{Review, ReviewRow},
    store::DUPLICATE_REVIEW,
};

/// The (product_slug, user_id) unique index is the final word on duplicates.
pub async fn insert_review(pool: &PgPool, review: &Review) -> Result<Review> {
    let row = sqlx::query_as::<_, ReviewRow>(
        "INSERT INTO reviews (id, product_slug, rating, title, comment, size_purchased, image_url,
         recommended, verified, is_approved, is_hidden, user_id, user_email, user_name, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
         RETURNING *",
    )
    .bind(review.id)
    .bind(&review.product_slug)
    .bind(review.rating)
    .bind(&review.title)
    .bind(&review.comment)
    .bind(&review.size_purchased)
    .bind(&review.image_url)
    .bind(review.recommended)
    .bind(review.verified)
    .bind(review.is_approved)
    .bind(review.is_hidden)
    .bind(&review.user.id)
    .bind(&review.user.email)
    .bind(&review.user.name)
    .bind(review.created_at)
    .fetch_one(pool)
    .await
    .map_err(|err| match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(DUPLICATE_REVIEW.to_string())
        }
        _ => AppError::DatabaseError(err),
    })?;

    Ok(row.into())
}

pub async fn get_public_reviews(pool: &PgPool, product_slug: &str) -> Result<Vec<Review>> {
    let rows = sqlx::query_as::<_, ReviewRow>(
        "SELECT * FROM reviews
         WHERE product_slug = $1 AND is_approved AND NOT is_hidden
         ORDER BY created_at DESC",
    )
    .bind(product_slug)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Review::from).collect())
}

pub async fn get_rating_stats(pool: &PgPool, product_slug: &str) -> Result<(Option<f64>, i64)> {
    let stats = sqlx::query_as::<_, (Option<f64>, i64)>(
        "SELECT AVG(rating)::float8, COUNT(*)
         FROM reviews
         WHERE product_slug = $1 AND is_approved AND NOT is_hidden",
    )
    .bind(product_slug)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
