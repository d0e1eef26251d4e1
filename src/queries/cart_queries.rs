use sqlx::{PgPool, Postgres, Transaction, types::Json};

use crate::{
    error::Result,
    models::{Cart, CartRow, LineItem},
    services::cart_service,
    store::{SYNC_TOKEN_RETENTION_DAYS, version_conflict},
};

/// Creates the owner's cart row if missing, then locks it for the rest of `tx`.
async fn lock_cart(tx: &mut Transaction<'_, Postgres>, owner_id: &str) -> Result<CartRow> {
    sqlx::query("INSERT INTO carts (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING")
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;

    let row = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE owner_id = $1 FOR UPDATE")
        .bind(owner_id)
        .fetch_one(&mut **tx)
        .await?;

    Ok(row)
}

pub async fn get_or_create_cart(pool: &PgPool, owner_id: &str) -> Result<Cart> {
    sqlx::query("INSERT INTO carts (owner_id) VALUES ($1) ON CONFLICT (owner_id) DO NOTHING")
        .bind(owner_id)
        .execute(pool)
        .await?;

    let row = sqlx::query_as::<_, CartRow>("SELECT * FROM carts WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(pool)
        .await?;

    Ok(row.into())
}

pub async fn merge_cart(
    pool: &PgPool,
    owner_id: &str,
    local: &[LineItem],
    sync_token: Option<&str>,
) -> Result<Cart> {
    let mut tx = pool.begin().await?;

    let current = lock_cart(&mut tx, owner_id).await?;

    if let Some(token) = sync_token {
        sqlx::query(
            "DELETE FROM cart_sync_tokens
             WHERE owner_id = $1 AND applied_at < NOW() - make_interval(days => $2)",
        )
        .bind(owner_id)
        .bind(SYNC_TOKEN_RETENTION_DAYS as i32)
        .execute(&mut *tx)
        .await?;

        let recorded = sqlx::query(
            "INSERT INTO cart_sync_tokens (owner_id, token) VALUES ($1, $2)
             ON CONFLICT (owner_id, token) DO NOTHING",
        )
        .bind(owner_id)
        .bind(token)
        .execute(&mut *tx)
        .await?;

        // Login transition already merged, possibly from another tab
        if recorded.rows_affected() == 0 {
            tx.commit().await?;
            return Ok(current.into());
        }
    }

    let merged = cart_service::merge_items(&current.items.0, local);

    let row = sqlx::query_as::<_, CartRow>(
        "UPDATE carts
         SET items = $2, version = version + 1, updated_at = NOW()
         WHERE owner_id = $1
         RETURNING *",
    )
    .bind(owner_id)
    .bind(Json(&merged))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row.into())
}

pub async fn replace_cart(
    pool: &PgPool,
    owner_id: &str,
    items: &[LineItem],
    expected_version: Option<i64>,
) -> Result<Cart> {
    let mut tx = pool.begin().await?;

    let current = lock_cart(&mut tx, owner_id).await?;

    if let Some(expected) = expected_version {
        if expected != current.version {
            tx.rollback().await?;
            return Err(version_conflict(expected, current.version));
        }
    }

    let row = sqlx::query_as::<_, CartRow>(
        "UPDATE carts SET items = $2, version = version + 1, updated_at = NOW()
         WHERE owner_id = $1
         RETURNING *",
    )
    .bind(owner_id)
    .bind(Json(items))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row.into())
}

pub async fn clear_cart(pool: &PgPool, owner_id: &str) -> Result<()> {
    sqlx::query(
        "UPDATE carts SET items = '[]'::jsonb, version = version + 1, updated_at = NOW()
         WHERE owner_id = $1",
    )
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(())
}
