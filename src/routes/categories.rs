use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Category, CreateCategoryRequest},
    queries::category_queries,
};

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<Category>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    if category_queries::find_by_name(&state.db, &payload.name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Category already exists".to_string()));
    }

    let slug = slug::slugify(&payload.name);
    let category = category_queries::create_category(&state.db, &payload.name, &slug).await?;

    Ok(Json(category))
}

pub async fn get_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = category_queries::get_all(&state.db).await?;

    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    let category = category_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}
