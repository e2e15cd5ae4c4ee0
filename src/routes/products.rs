use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        Product, ProductCountResponse, ProductData, ProductFilterRequest, ProductForm,
        ProductWithCategory,
    },
    queries::{category_queries, product_queries},
};

const MAX_IMAGE_BYTES: usize = 1_000_000;

pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let form = parse_product_form(multipart).await?;
    let data = validate_product_form(form)?;

    if category_queries::find_by_id(&state.db, data.category_id)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("Category does not exist".to_string()));
    }

    if product_queries::find_by_slug(&state.db, &data.slug)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Product with this title already exists".to_string(),
        ));
    }

    let product = product_queries::create_product(&state.db, &data).await?;

    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    if product_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let form = parse_product_form(multipart).await?;
    let data = validate_product_form(form)?;

    if category_queries::find_by_id(&state.db, data.category_id)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("Category does not exist".to_string()));
    }

    let product = product_queries::update_product(&state.db, id, &data).await?;

    Ok(Json(product))
}

pub async fn delete_product(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if !product_queries::delete_product(&state.db, id).await? {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = product_queries::get_latest(&state.db).await?;

    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductWithCategory>> {
    let product = product_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let category = category_queries::find_by_id(&state.db, product.category_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(ProductWithCategory { product, category }))
}

/// Serves the stored image bytes with the content type recorded at upload.
pub async fn get_product_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response> {
    let image = product_queries::get_image(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    match (image.image, image.image_content_type) {
        (Some(bytes), Some(content_type)) => {
            Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
        }
        _ => Err(AppError::NotFound("Product has no image".to_string())),
    }
}

pub async fn product_count(State(state): State<AppState>) -> Result<Json<ProductCountResponse>> {
    let total = product_queries::count(&state.db).await?;

    Ok(Json(ProductCountResponse { total }))
}

pub async fn product_list(
    State(state): State<AppState>,
    Path(page): Path<i64>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::get_page(&state.db, page).await?;

    Ok(Json(products))
}

pub async fn search_products(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::search(&state.db, &keyword).await?;

    Ok(Json(products))
}

pub async fn related_products(
    State(state): State<AppState>,
    Path((product_id, category_id)): Path<(i32, i32)>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::find_related(&state.db, product_id, category_id).await?;

    Ok(Json(products))
}

pub async fn products_by_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<ProductWithCategory>>> {
    let category = category_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

    let products = product_queries::find_by_category(&state.db, category.id).await?;

    Ok(Json(
        products
            .into_iter()
            .map(|product| ProductWithCategory {
                product,
                category: category.clone(),
            })
            .collect(),
    ))
}

pub async fn filter_products(
    State(state): State<AppState>,
    Json(payload): Json<ProductFilterRequest>,
) -> Result<Json<Vec<Product>>> {
    let products = product_queries::filter(&state.db, &payload).await?;

    Ok(Json(products))
}

async fn parse_product_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid image data: {}", e)))?;

            if bytes.len() > MAX_IMAGE_BYTES {
                return Err(AppError::BadRequest(
                    "Image should be less than 1mb".to_string(),
                ));
            }

            form.image = Some((bytes.to_vec(), content_type));
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;

        match name.as_str() {
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "price" => {
                form.price = Some(value.parse::<Decimal>().map_err(|_| {
                    AppError::BadRequest("Price must be a number".to_string())
                })?)
            }
            "quantity" => {
                form.quantity = Some(value.parse::<i32>().map_err(|_| {
                    AppError::BadRequest("Quantity must be an integer".to_string())
                })?)
            }
            "category_id" => {
                form.category_id = Some(value.parse::<i32>().map_err(|_| {
                    AppError::BadRequest("Category must be an integer id".to_string())
                })?)
            }
            "shipping" => form.shipping = Some(value == "true" || value == "1"),
            _ => {}
        }
    }

    Ok(form)
}

fn validate_product_form(form: ProductForm) -> Result<ProductData> {
    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Title is required".to_string()))?;

    let description = form
        .description
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Description is required".to_string()))?;

    let price = form
        .price
        .ok_or_else(|| AppError::BadRequest("Price is required".to_string()))?;

    let quantity = form
        .quantity
        .ok_or_else(|| AppError::BadRequest("Quantity is required".to_string()))?;

    let category_id = form
        .category_id
        .ok_or_else(|| AppError::BadRequest("Category is required".to_string()))?;

    let slug = slug::slugify(&title);

    Ok(ProductData {
        title,
        slug,
        description,
        price,
        quantity,
        category_id,
        shipping: form.shipping.unwrap_or(false),
        image: form.image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn complete_form() -> ProductForm {
        ProductForm {
            title: Some("Linen Shirt".to_string()),
            description: Some("A summer shirt".to_string()),
            price: Some(dec!(49.99)),
            quantity: Some(10),
            category_id: Some(1),
            shipping: Some(true),
            image: None,
        }
    }

    #[test]
    fn slug_is_derived_from_the_title() {
        let data = validate_product_form(complete_form()).unwrap();
        assert_eq!(data.slug, "linen-shirt");
    }

    #[test]
    fn missing_title_is_rejected() {
        let form = ProductForm {
            title: None,
            ..complete_form()
        };

        let err = validate_product_form(form).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn missing_price_is_rejected() {
        let form = ProductForm {
            price: None,
            ..complete_form()
        };

        let err = validate_product_form(form).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn shipping_defaults_to_false() {
        let form = ProductForm {
            shipping: None,
            ..complete_form()
        };

        let data = validate_product_form(form).unwrap();
        assert!(!data.shipping);
    }
}
