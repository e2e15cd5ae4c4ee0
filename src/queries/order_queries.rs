use sqlx::PgPool;

use crate::{
    error::Result,
    models::{CartItem, Order, OrderItem, OrderWithBuyer},
};

/// Inserts the order and its snapshotted product lines in one transaction.
/// Called only after the payment gateway has confirmed the charge.
pub async fn create_order_with_items(
    pool: &PgPool,
    buyer_id: i32,
    payment_id: &str,
    payment: &serde_json::Value,
    cart: &[CartItem],
    titles: &[String],
) -> Result<Order> {
    let mut tx = pool.begin().await?;

    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (buyer_id, payment_id, payment)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(buyer_id)
    .bind(payment_id)
    .bind(payment)
    .fetch_one(&mut *tx)
    .await?;

    let product_ids: Vec<i32> = cart.iter().map(|i| i.product_id).collect();
    let prices: Vec<_> = cart.iter().map(|i| i.price).collect();

    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, title, price)
         SELECT $1, unnest($2::int[]), unnest($3::varchar[]), unnest($4::decimal[])",
    )
    .bind(order.id)
    .bind(&product_ids)
    .bind(titles)
    .bind(&prices)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(order)
}

pub async fn get_buyer_orders(pool: &PgPool, buyer_id: i32) -> Result<Vec<OrderWithBuyer>> {
    let orders = sqlx::query_as::<_, OrderWithBuyer>(
        "SELECT o.*, u.username AS buyer
         FROM orders o
         INNER JOIN users u ON u.id = o.buyer_id
         WHERE o.buyer_id = $1
         ORDER BY o.created_at DESC",
    )
    .bind(buyer_id)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

pub async fn get_all_orders(pool: &PgPool) -> Result<Vec<OrderWithBuyer>> {
    let orders = sqlx::query_as::<_, OrderWithBuyer>(
        "SELECT o.*, u.username AS buyer
         FROM orders o
         INNER JOIN users u ON u.id = o.buyer_id
         ORDER BY o.created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

pub async fn get_items_for_orders(pool: &PgPool, order_ids: &[i32]) -> Result<Vec<OrderItem>> {
    let items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1)")
            .bind(order_ids)
            .fetch_all(pool)
            .await?;

    Ok(items)
}

pub async fn update_status(pool: &PgPool, id: i32, status: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}
