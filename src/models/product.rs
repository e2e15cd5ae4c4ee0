use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Product row without the image payload. Listing queries always exclude the
/// image column; it is only fetched by the image endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: i32,
    pub shipping: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProductImage {
    pub image: Option<Vec<u8>>,
    pub image_content_type: Option<String>,
}

/// Fields collected from the multipart create/update form, before
/// validation.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub category_id: Option<i32>,
    pub shipping: Option<bool>,
    pub image: Option<(Vec<u8>, String)>,
}

/// Validated product fields ready for persistence.
#[derive(Debug)]
pub struct ProductData {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: i32,
    pub category_id: i32,
    pub shipping: bool,
    pub image: Option<(Vec<u8>, String)>,
}

#[derive(Debug, Deserialize)]
pub struct ProductFilterRequest {
    #[serde(default)]
    pub categories: Vec<i32>,
    pub price_from: Option<Decimal>,
    pub price_to: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: Product,
    pub category: Category,
}

#[derive(Debug, Serialize)]
pub struct ProductCountResponse {
    pub total: i64,
}
