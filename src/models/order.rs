use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Every status an admin may move an order to. New orders always start as
/// "Not Process".
pub const ORDER_STATUSES: [&str; 5] = [
    "Not Process",
    "Processing",
    "Shipped",
    "Delivered",
    "Cancelled",
];

pub const DEFAULT_ORDER_STATUS: &str = "Not Process";

// DB models

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i32,
    pub buyer_id: i32,
    pub status: String,
    pub payment_id: String,
    pub payment: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub title: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Order row joined with the buyer's username for listing endpoints.
#[derive(Debug, sqlx::FromRow)]
pub struct OrderWithBuyer {
    #[sqlx(flatten)]
    pub order: Order,
    pub buyer: String,
}

// Request types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i32,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub cart: Vec<CartItem>,
    pub nonce: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

// Response types

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct ClientTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub buyer: String,
    pub items: Vec<OrderItem>,
}
