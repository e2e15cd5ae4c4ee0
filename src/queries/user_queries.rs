use sqlx::PgPool;

use crate::{
    error::Result,
    models::{RegisterRequest, User},
};

pub async fn create_user(
    pool: &PgPool,
    req: &RegisterRequest,
    password_hash: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password, phone, address, answer)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(&req.username)
    .bind(&req.email)
    .bind(password_hash)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(&req.answer)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

/// Password-recovery lookup: email plus the stored security-question answer
/// must both match.
pub async fn find_by_email_and_answer(
    pool: &PgPool,
    email: &str,
    answer: &str,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND answer = $2")
        .bind(email)
        .bind(answer)
        .fetch_optional(pool)
        .await?;

    Ok(user)
}

pub async fn update_password(pool: &PgPool, id: i32, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
        .bind(password_hash)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn update_profile(
    pool: &PgPool,
    id: i32,
    username: &str,
    password_hash: &str,
    phone: &str,
    address: &str,
    answer: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        "UPDATE users
         SET username = $1, password = $2, phone = $3, address = $4, answer = $5,
             updated_at = NOW()
         WHERE id = $6
         RETURNING *",
    )
    .bind(username)
    .bind(password_hash)
    .bind(phone)
    .bind(address)
    .bind(answer)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}
