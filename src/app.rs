use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use crate::{
    config::{AppConfig, CheckoutConfig},
    database,
    error::Result,
    routes,
    services::{
        braintree_service::{BraintreeGateway, PaymentGateway},
        checkout_service::{OrderStore, PgOrderStore, PgPriceSource, PriceSource},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub gateway: Arc<dyn PaymentGateway>,
    pub orders: Arc<dyn OrderStore>,
    pub prices: Arc<dyn PriceSource>,
    pub checkout: CheckoutConfig,
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let pool = database::create_pool(&config.database).await?;
    let gateway = BraintreeGateway::new(&config.braintree)?;

    let state = AppState {
        db: pool.clone(),
        gateway: Arc::new(gateway),
        orders: Arc::new(PgOrderStore::new(pool.clone())),
        prices: Arc::new(PgPriceSource::new(pool)),
        checkout: config.checkout.clone(),
    };

    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                crate::error::AppError::ConfigError(format!("Invalid CORS origin: {}", origin))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins);

    let app = routes::create_router()
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .with_state(state);

    Ok(app)
}
