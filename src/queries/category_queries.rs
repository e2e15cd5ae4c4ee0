use sqlx::PgPool;

use crate::{error::Result, models::Category};

pub async fn create_category(pool: &PgPool, name: &str, slug: &str) -> Result<Category> {
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(category)
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

pub async fn get_all(pool: &PgPool) -> Result<Vec<Category>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
        .fetch_all(pool)
        .await?;

    Ok(categories)
}
