use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Address, AddressRequest},
    store::DEFAULT_ADDRESS_RACE,
};

const DEFAULT_ADDRESS_INDEX: &str = "user_addresses_one_default_idx";

fn map_default_race(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() && db_err.constraint() == Some(DEFAULT_ADDRESS_INDEX) =>
        {
            AppError::Conflict(DEFAULT_ADDRESS_RACE.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

pub async fn get_user_addresses(pool: &PgPool, owner_id: &str) -> Result<Vec<Address>> {
    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM user_addresses WHERE owner_id = $1 ORDER BY is_default DESC, created_at ASC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(addresses)
}

pub async fn find_user_address(pool: &PgPool, owner_id: &str, id: Uuid) -> Result<Option<Address>> {
    let address =
        sqlx::query_as::<_, Address>("SELECT * FROM user_addresses WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?;

    Ok(address)
}

pub async fn add_user_address(pool: &PgPool, owner_id: &str, req: &AddressRequest) -> Result<Address> {
    let mut tx = pool.begin().await?;

    if req.is_default {
        sqlx::query("UPDATE user_addresses SET is_default = false WHERE owner_id = $1 AND is_default")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO user_addresses (id, owner_id, full_name, phone, line1, line2, city, state,
         pincode, country, is_default, address_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(&req.full_name)
    .bind(&req.phone)
    .bind(&req.line1)
    .bind(&req.line2)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.pincode)
    .bind(&req.country)
    .bind(req.is_default)
    .bind(req.address_type)
    .fetch_one(&mut *tx)
    .await
    .map_err(map_default_race)?;

    tx.commit().await?;
    Ok(address)
}

pub async fn update_user_address(
    pool: &PgPool,
    owner_id: &str,
    id: Uuid,
    req: &AddressRequest,
) -> Result<Option<Address>> {
    let mut tx = pool.begin().await?;

    if req.is_default {
        sqlx::query(
            "UPDATE user_addresses SET is_default = false
             WHERE owner_id = $1 AND id <> $2 AND is_default",
        )
        .bind(owner_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        "UPDATE user_addresses
         SET full_name = $3, phone = $4, line1 = $5, line2 = $6, city = $7, state = $8,
             pincode = $9, country = $10, is_default = $11, address_type = $12
         WHERE id = $1 AND owner_id = $2
         RETURNING *",
    )
    .bind(id)
    .bind(owner_id)
    .bind(&req.full_name)
    .bind(&req.phone)
    .bind(&req.line1)
    .bind(&req.line2)
    .bind(&req.city)
    .bind(&req.state)
    .bind(&req.pincode)
    .bind(&req.country)
    .bind(req.is_default)
    .bind(req.address_type)
    .fetch_optional(&mut *tx)
    .await
    .map_err(map_default_race)?;

    // Nothing to update: leave the other defaults as they were
    if address.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(address)
}

pub async fn delete_user_address(pool: &PgPool, owner_id: &str, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM user_addresses WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
