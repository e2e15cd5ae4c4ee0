use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    error::{AppError, Result},
    models::{CartItem, Order},
    queries::{order_queries, product_queries},
    services::braintree_service::{PaymentGateway, Transaction},
};

/// Persistence seam for the checkout flow. The production implementation
/// writes through sqlx; tests substitute a mock to observe exactly when an
/// order is (or is not) recorded.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn record_order(
        &self,
        buyer_id: i32,
        cart: &[CartItem],
        transaction: &Transaction,
    ) -> Result<Order>;
}

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn record_order(
        &self,
        buyer_id: i32,
        cart: &[CartItem],
        transaction: &Transaction,
    ) -> Result<Order> {
        let product_ids: Vec<i32> = cart.iter().map(|i| i.product_id).collect();
        let titles_by_id = product_queries::get_titles(&self.pool, &product_ids).await?;

        let titles: Vec<String> = cart
            .iter()
            .map(|i| titles_by_id.get(&i.product_id).cloned().unwrap_or_default())
            .collect();

        order_queries::create_order_with_items(
            &self.pool,
            buyer_id,
            &transaction.id,
            &transaction.raw,
            cart,
            &titles,
        )
        .await
    }
}

/// Read side of strict price validation: authoritative Product prices for
/// the ids in a cart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn prices_for(&self, ids: &[i32]) -> Result<HashMap<i32, Decimal>>;
}

pub struct PgPriceSource {
    pool: PgPool,
}

impl PgPriceSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceSource for PgPriceSource {
    async fn prices_for(&self, ids: &[i32]) -> Result<HashMap<i32, Decimal>> {
        product_queries::get_prices(&self.pool, ids).await
    }
}

/// Sum of the submitted cart prices. Strict mode aside, the submitted price
/// is what gets charged.
pub fn compute_total(cart: &[CartItem]) -> Decimal {
    cart.iter().map(|i| i.price).sum()
}

/// Strict mode: every submitted price must match the stored price exactly,
/// and every cart line must name a known product. Runs before any charge.
pub fn verify_cart_prices(cart: &[CartItem], stored: &HashMap<i32, Decimal>) -> Result<()> {
    for item in cart {
        match stored.get(&item.product_id) {
            None => {
                return Err(AppError::BadRequest(format!(
                    "Product {} not found",
                    item.product_id
                )));
            }
            Some(price) if *price != item.price => {
                return Err(AppError::BadRequest(format!(
                    "Price mismatch for product {}",
                    item.product_id
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Turns a cart into a paid order: charge first, record second. The order
/// write is only attempted once the gateway has confirmed the charge, and a
/// failed charge never touches the orders table.
pub async fn process_checkout(
    gateway: &dyn PaymentGateway,
    orders: &dyn OrderStore,
    buyer_id: i32,
    cart: &[CartItem],
    nonce: &str,
) -> Result<Order> {
    let total = compute_total(cart);

    let transaction = gateway.submit_sale(total, nonce).await?;

    if !transaction.is_success() {
        return Err(AppError::GatewayError(transaction.raw.to_string()));
    }

    match orders.record_order(buyer_id, cart, &transaction).await {
        Ok(order) => {
            tracing::info!(
                "Order {} recorded for buyer {} (transaction {})",
                order.id,
                buyer_id,
                transaction.id
            );
            Ok(order)
        }
        Err(e) => {
            // No refund path exists. The charge stands and must be
            // reconciled against the processor's records by hand.
            tracing::error!(
                "RECONCILIATION REQUIRED: transaction {} charged for buyer {} \
                 but the order write failed: {}",
                transaction.id,
                buyer_id,
                e
            );
            Err(AppError::InternalError(
                "Payment was captured but the order could not be recorded".to_string(),
            ))
        }
    }
}
