mod auth;
mod categories;
mod health;
mod orders;
mod payments;
mod products;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .merge(
            Router::new()
                .route("/update-profile", put(auth::update_profile))
                .route("/user-auth", get(auth::user_auth))
                .route("/orders", get(orders::get_orders))
                .route_layer(middleware::from_fn(crate::middleware::auth_middleware)),
        )
        .merge(
            Router::new()
                .route("/admin-auth", get(auth::admin_auth))
                .route("/all-orders", get(orders::get_all_orders))
                .route("/order-status/{id}", put(orders::update_order_status))
                .route_layer(middleware::from_fn(crate::middleware::admin_middleware)),
        );

    let category_routes = Router::new()
        .route("/get-category", get(categories::get_categories))
        .route("/single-category/{slug}", get(categories::get_category))
        .merge(
            Router::new()
                .route("/create", post(categories::create_category))
                .route_layer(middleware::from_fn(crate::middleware::admin_middleware)),
        );

    let product_routes = Router::new()
        .route("/get", get(products::get_products))
        .route("/get/{slug}", get(products::get_product))
        .route("/image/{id}", get(products::get_product_image))
        .route("/p-count", get(products::product_count))
        .route("/p-list/{page}", get(products::product_list))
        .route("/search/{keyword}", get(products::search_products))
        .route("/related-p/{pid}/{cid}", get(products::related_products))
        .route("/p-category/{slug}", get(products::products_by_category))
        .route("/filter", post(products::filter_products))
        .merge(
            Router::new()
                .route("/create", post(products::create_product))
                .route("/update/{id}", put(products::update_product))
                .route("/delete/{id}", delete(products::delete_product))
                .route_layer(middleware::from_fn(crate::middleware::admin_middleware)),
        );

    let payment_routes = Router::new()
        .route("/token", get(payments::get_token))
        .merge(
            Router::new()
                .route("/pay", post(payments::pay))
                .route_layer(middleware::from_fn(crate::middleware::auth_middleware)),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/category", category_routes)
        .nest("/api/v1/product", product_routes)
        .nest("/api/v1/payment", payment_routes)
}
