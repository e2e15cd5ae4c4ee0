use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::{
    error::Result,
    models::{Product, ProductData, ProductFilterRequest, ProductImage},
};

/// Column list used everywhere a full row is selected. The image payload is
/// deliberately absent; only `get_image` reads it.
const PRODUCT_COLUMNS: &str =
    "id, title, slug, description, price, quantity, category_id, shipping, created_at, updated_at";

const LATEST_LIMIT: i64 = 8;
const PAGE_SIZE: i64 = 6;

pub async fn create_product(pool: &PgPool, data: &ProductData) -> Result<Product> {
    let (image, content_type) = match &data.image {
        Some((bytes, content_type)) => (Some(bytes.as_slice()), Some(content_type.as_str())),
        None => (None, None),
    };

    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (title, slug, description, price, quantity, category_id,
         shipping, image, image_content_type)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&data.title)
    .bind(&data.slug)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.quantity)
    .bind(data.category_id)
    .bind(data.shipping)
    .bind(image)
    .bind(content_type)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn update_product(pool: &PgPool, id: i32, data: &ProductData) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products
         SET title = $1, slug = $2, description = $3, price = $4, quantity = $5,
             category_id = $6, shipping = $7,
             image = COALESCE($8, image),
             image_content_type = COALESCE($9, image_content_type),
             updated_at = NOW()
         WHERE id = $10
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&data.title)
    .bind(&data.slug)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.quantity)
    .bind(data.category_id)
    .bind(data.shipping)
    .bind(data.image.as_ref().map(|(bytes, _)| bytes.as_slice()))
    .bind(data.image.as_ref().map(|(_, content_type)| content_type.as_str()))
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn delete_product(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(product)
}

/// Latest products for the storefront landing page.
pub async fn get_latest(pool: &PgPool) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(LATEST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Offset for a 1-based page number. Saturates so absurd page values clamp
/// to i64::MAX instead of overflowing.
fn page_offset(page: i64) -> i64 {
    page.max(1).saturating_sub(1).saturating_mul(PAGE_SIZE)
}

pub async fn get_page(pool: &PgPool, page: i64) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(PAGE_SIZE)
    .bind(page_offset(page))
    .fetch_all(pool)
    .await?;

    Ok(products)
}

pub async fn count(pool: &PgPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM products")
        .fetch_one(pool)
        .await?;

    Ok(row.get("total"))
}

/// Case-insensitive substring search over title and description.
pub async fn search(pool: &PgPool, keyword: &str) -> Result<Vec<Product>> {
    let pattern = format!("%{}%", keyword);

    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE title ILIKE $1 OR description ILIKE $1
         ORDER BY created_at DESC"
    ))
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

/// Other products in the same category, excluding the product itself.
pub async fn find_related(pool: &PgPool, product_id: i32, category_id: i32) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE category_id = $1 AND id != $2
         ORDER BY created_at DESC LIMIT $3"
    ))
    .bind(category_id)
    .bind(product_id)
    .bind(LATEST_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

pub async fn find_by_category(pool: &PgPool, category_id: i32) -> Result<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE category_id = $1
         ORDER BY created_at DESC"
    ))
    .bind(category_id)
    .fetch_all(pool)
    .await?;

    Ok(products)
}

pub async fn filter(pool: &PgPool, req: &ProductFilterRequest) -> Result<Vec<Product>> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1=1"));

    if !req.categories.is_empty() {
        query.push(" AND category_id = ANY(");
        query.push_bind(&req.categories);
        query.push(")");
    }

    if let Some(price_from) = req.price_from {
        query.push(" AND price >= ");
        query.push_bind(price_from);
    }

    if let Some(price_to) = req.price_to {
        query.push(" AND price <= ");
        query.push_bind(price_to);
    }

    query.push(" ORDER BY created_at DESC");

    let products = query.build_query_as::<Product>().fetch_all(pool).await?;

    Ok(products)
}

pub async fn get_image(pool: &PgPool, id: i32) -> Result<Option<ProductImage>> {
    let image = sqlx::query_as::<_, ProductImage>(
        "SELECT image, image_content_type FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(image)
}

/// Titles for the given products, snapshotted into order lines at checkout.
pub async fn get_titles(pool: &PgPool, ids: &[i32]) -> Result<HashMap<i32, String>> {
    let rows = sqlx::query("SELECT id, title FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("id"), row.get("title")))
        .collect())
}

/// Authoritative prices for the given products, used by strict checkout
/// validation.
pub async fn get_prices(pool: &PgPool, ids: &[i32]) -> Result<HashMap<i32, Decimal>> {
    let rows = sqlx::query("SELECT id, price FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("id"), row.get("price")))
        .collect())
}
