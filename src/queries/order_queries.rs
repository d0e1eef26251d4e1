use sqlx::{PgPool, types::Json};

use crate::{
    error::Result,
    models::{Order, OrderInsert, OrderRow, OrderStatus, StatusChange},
};

const ORDER_ID_CONSTRAINT: &str = "orders_order_id_key";
const IDEMPOTENCY_CONSTRAINT: &str = "orders_owner_idempotency_key";

/// Inserts the order; the unique constraints decide collisions and replays.
pub async fn insert_order(pool: &PgPool, order: &Order) -> Result<OrderInsert> {
    let inserted = sqlx::query_as::<_, OrderRow>(
        "INSERT INTO orders (order_id, owner_id, owner_email, items, shipping_address,
         payment_method, payment_status, order_status, subtotal, shipping_charges, tax,
         discount, total, status_history, tracking_number, estimated_delivery,
         idempotency_key, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
         RETURNING *",
    )
    .bind(&order.order_id)
    .bind(&order.owner_id)
    .bind(&order.owner_email)
    .bind(Json(&order.items))
    .bind(Json(&order.shipping_address))
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.order_status)
    .bind(order.subtotal)
    .bind(order.shipping_charges)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.total)
    .bind(Json(&order.status_history))
    .bind(&order.tracking_number)
    .bind(order.estimated_delivery)
    .bind(&order.idempotency_key)
    .bind(order.created_at)
    .bind(order.updated_at)
    .fetch_one(pool)
    .await;

    match inserted {
        Ok(row) => Ok(OrderInsert::Created(row.into())),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            let constraint = db_err.constraint().map(str::to_owned);
            match constraint.as_deref() {
                Some(IDEMPOTENCY_CONSTRAINT) => {
                    let key = order.idempotency_key.as_deref().unwrap_or_default();
                    let existing =
                        find_by_idempotency_key(pool, &order.owner_id, key).await?;
                    match existing {
                        Some(existing) => Ok(OrderInsert::Replayed(existing)),
                        None => Err(sqlx::Error::Database(db_err).into()),
                    }
                }
                Some(ORDER_ID_CONSTRAINT) => Ok(OrderInsert::OrderIdTaken),
                _ => Err(sqlx::Error::Database(db_err).into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_idempotency_key(
    pool: &PgPool,
    owner_id: &str,
    key: &str,
) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE owner_id = $1 AND idempotency_key = $2",
    )
    .bind(owner_id)
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Order::from))
}

pub async fn find_order(pool: &PgPool, order_id: &str) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Order::from))
}

pub async fn get_user_orders(pool: &PgPool, owner_id: &str) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Order::from).collect())
}

/// Compare-and-set on the current status; history is appended in the same statement.
pub async fn update_order_status(
    pool: &PgPool,
    order_id: &str,
    from: OrderStatus,
    change: &StatusChange,
) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(
        "UPDATE orders
         SET order_status = $3,
             status_history = status_history || $4,
             tracking_number = COALESCE($5, tracking_number),
             delivered_at = COALESCE($6, delivered_at),
             cancelled_at = COALESCE($7, cancelled_at),
             cancellation_reason = COALESCE($8, cancellation_reason),
             payment_status = COALESCE($9, payment_status),
             updated_at = NOW()
         WHERE order_id = $1 AND order_status = $2
         RETURNING *",
    )
    .bind(order_id)
    .bind(from)
    .bind(change.to)
    .bind(Json([&change.entry]))
    .bind(&change.tracking_number)
    .bind(change.delivered_at)
    .bind(change.cancelled_at)
    .bind(&change.cancellation_reason)
    .bind(change.payment_status)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Order::from))
}
