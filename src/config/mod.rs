mod app_config;

pub use app_config::{
    AppConfig, BraintreeConfig, CheckoutConfig, CorsConfig, DatabaseConfig, ServerConfig,
};
