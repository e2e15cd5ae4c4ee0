use crate::error::{AppError, Result};
use std::env;

const BRAINTREE_SANDBOX_URL: &str = "https://payments.sandbox.braintree-api.com/graphql";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub braintree: BraintreeConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BraintreeConfig {
    pub public_key: String,
    pub private_key: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Reject carts whose submitted prices differ from the stored Product
    /// prices. Off by default: the legacy behavior charges whatever the
    /// client sent.
    pub strict_price_validation: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid PORT value".to_string()))?,
                max_body_size: env::var("MAX_BODY_SIZE")
                    .unwrap_or_else(|_| "2097152".to_string())
                    .parse()
                    .map_err(|_| AppError::ConfigError("Invalid MAX_BODY_SIZE value".to_string()))?,
            },
            database: DatabaseConfig {
                url: env::var("DB_URL")?,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid DB_MAX_CONNECTIONS value".to_string())
                    })?,
            },
            cors: CorsConfig {
                allowed_origins: env::var("FRONTEND_URL")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            braintree: BraintreeConfig {
                public_key: env::var("BRAINTREE_PUBLIC_KEY")?,
                private_key: env::var("BRAINTREE_PRIVATE_KEY")?,
                api_url: env::var("BRAINTREE_API_URL")
                    .unwrap_or_else(|_| BRAINTREE_SANDBOX_URL.to_string()),
                timeout_secs: env::var("BRAINTREE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::ConfigError("Invalid BRAINTREE_TIMEOUT_SECS value".to_string())
                    })?,
            },
            checkout: CheckoutConfig {
                strict_price_validation: env::var("STRICT_PRICE_VALIDATION")
                    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
