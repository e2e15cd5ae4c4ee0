use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{ORDER_STATUSES, Order, OrderResponse, OrderWithBuyer, UpdateOrderStatusRequest},
    queries::order_queries,
    utils::{extractors::extract_user_id, jwt::Claims},
};

/// Orders of the signed-in buyer.
pub async fn get_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<OrderResponse>>> {
    let buyer_id = extract_user_id(&claims)?;
    let orders = order_queries::get_buyer_orders(&state.db, buyer_id).await?;

    Ok(Json(attach_items(&state, orders).await?))
}

/// All orders, admin only.
pub async fn get_all_orders(State(state): State<AppState>) -> Result<Json<Vec<OrderResponse>>> {
    let orders = order_queries::get_all_orders(&state.db).await?;

    Ok(Json(attach_items(&state, orders).await?))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>> {
    if !ORDER_STATUSES.contains(&payload.status.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid status: {}",
            payload.status
        )));
    }

    let order = order_queries::update_status(&state.db, id, &payload.status)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(Json(order))
}

async fn attach_items(
    state: &AppState,
    orders: Vec<OrderWithBuyer>,
) -> Result<Vec<OrderResponse>> {
    let order_ids: Vec<i32> = orders.iter().map(|o| o.order.id).collect();
    let all_items = order_queries::get_items_for_orders(&state.db, &order_ids).await?;

    let mut items_map: HashMap<i32, Vec<_>> = HashMap::new();
    for item in all_items {
        items_map.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|row| {
            let items = items_map.remove(&row.order.id).unwrap_or_default();
            OrderResponse {
                order: row.order,
                buyer: row.buyer,
                items,
            }
        })
        .collect())
}
