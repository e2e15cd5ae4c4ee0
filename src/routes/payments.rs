use axum::{Extension, Json, extract::State};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{CheckoutRequest, CheckoutResponse, ClientTokenResponse},
    services::checkout_service,
    utils::{extractors::extract_user_id, jwt::Claims},
};

pub async fn get_token(State(state): State<AppState>) -> Result<Json<ClientTokenResponse>> {
    let token = state.gateway.client_token().await?;

    Ok(Json(ClientTokenResponse { token }))
}

pub async fn pay(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let buyer_id = extract_user_id(&claims)?;

    if payload.cart.is_empty() {
        return Err(AppError::BadRequest("Cart is required".to_string()));
    }

    if payload.nonce.is_empty() {
        return Err(AppError::BadRequest("Payment nonce is required".to_string()));
    }

    if state.checkout.strict_price_validation {
        let ids: Vec<i32> = payload.cart.iter().map(|i| i.product_id).collect();
        let stored = state.prices.prices_for(&ids).await?;
        checkout_service::verify_cart_prices(&payload.cart, &stored)?;
    }

    checkout_service::process_checkout(
        state.gateway.as_ref(),
        state.orders.as_ref(),
        buyer_id,
        &payload.cart,
        &payload.nonce,
    )
    .await?;

    Ok(Json(CheckoutResponse { ok: true }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use http_body_util::BodyExt;
    use rust_decimal::dec;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::{
        AppState,
        config::CheckoutConfig,
        error::AppError,
        models::{Order, UserRole},
        routes,
        services::braintree_service::{MockPaymentGateway, Transaction},
        services::checkout_service::{MockOrderStore, MockPriceSource},
        utils::jwt,
    };

    struct TestStateBuilder {
        gateway: MockPaymentGateway,
        orders: MockOrderStore,
        prices: MockPriceSource,
        strict: bool,
    }

    impl TestStateBuilder {
        fn new(gateway: MockPaymentGateway) -> Self {
            Self {
                gateway,
                orders: MockOrderStore::new(),
                prices: MockPriceSource::new(),
                strict: false,
            }
        }

        fn orders(mut self, orders: MockOrderStore) -> Self {
            self.orders = orders;
            self
        }

        fn strict(mut self, prices: MockPriceSource) -> Self {
            self.prices = prices;
            self.strict = true;
            self
        }

        fn build(self) -> AppState {
            // The pool never connects: every handler under test goes through
            // the mocked ports instead of the database.
            let db = sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://localhost/unused")
                .unwrap();

            AppState {
                db,
                gateway: Arc::new(self.gateway),
                orders: Arc::new(self.orders),
                prices: Arc::new(self.prices),
                checkout: CheckoutConfig {
                    strict_price_validation: self.strict,
                },
            }
        }
    }

    fn bearer_token() -> String {
        std::env::set_var("JWT_SECRET", "test-secret");
        let token = jwt::generate_token(1, "buyer@example.com", UserRole::Customer).unwrap();
        format!("Bearer {}", token)
    }

    fn pay_request(body: Value) -> Request<Body> {
        Request::post("/api/v1/payment/pay")
            .header(header::AUTHORIZATION, bearer_token())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn order_for(buyer_id: i32, transaction: &Transaction) -> Order {
        Order {
            id: 1,
            buyer_id,
            status: crate::models::DEFAULT_ORDER_STATUS.to_string(),
            payment_id: transaction.id.clone(),
            payment: transaction.raw.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_outage_yields_500_without_a_sale() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_client_token()
            .times(1)
            .returning(|| Err(AppError::GatewayError("processor unreachable".to_string())));
        gateway.expect_submit_sale().times(0);

        let app = routes::create_router().with_state(TestStateBuilder::new(gateway).build());

        let response = app
            .oneshot(
                Request::get("/api/v1/payment/token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"processor unreachable");
    }

    #[tokio::test]
    async fn token_success_returns_json_token() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_client_token()
            .times(1)
            .returning(|| Ok("sandbox-token".to_string()));

        let app = routes::create_router().with_state(TestStateBuilder::new(gateway).build());

        let response = app
            .oneshot(
                Request::get("/api/v1/payment/token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, json!({ "token": "sandbox-token" }));
    }

    #[tokio::test]
    async fn pay_requires_authentication() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_sale().times(0);

        let app = routes::create_router().with_state(TestStateBuilder::new(gateway).build());

        let response = app
            .oneshot(
                Request::post("/api/v1/payment/pay")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "cart": [{ "product_id": 1, "price": 20 }], "nonce": "n" })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_the_gateway_is_called() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_sale().times(0);

        let app = routes::create_router().with_state(TestStateBuilder::new(gateway).build());

        let response = app
            .oneshot(pay_request(json!({ "cart": [], "nonce": "n" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_nonce_is_rejected_before_the_gateway_is_called() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_sale().times(0);

        let app = routes::create_router().with_state(TestStateBuilder::new(gateway).build());

        let response = app
            .oneshot(pay_request(
                json!({ "cart": [{ "product_id": 1, "price": 20 }], "nonce": "" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn successful_checkout_records_order_and_returns_ok() {
        let transaction = Transaction {
            id: "T1".to_string(),
            status: "SUBMITTED_FOR_SETTLEMENT".to_string(),
            raw: json!({ "id": "T1", "status": "SUBMITTED_FOR_SETTLEMENT" }),
        };

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_sale().times(1).returning({
            let transaction = transaction.clone();
            move |_, _| Ok(transaction.clone())
        });

        let mut orders = MockOrderStore::new();
        orders
            .expect_record_order()
            .times(1)
            .returning(|buyer_id, _, transaction| Ok(order_for(buyer_id, transaction)));

        let app = routes::create_router()
            .with_state(TestStateBuilder::new(gateway).orders(orders).build());

        let response = app
            .oneshot(pay_request(
                json!({ "cart": [{ "product_id": 1, "price": 20 }], "nonce": "fake-valid-nonce" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn declined_sale_surfaces_the_gateway_body() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_submit_sale()
            .times(1)
            .returning(|_, _| Err(AppError::GatewayError("declined".to_string())));

        let mut orders = MockOrderStore::new();
        orders.expect_record_order().times(0);

        let app = routes::create_router()
            .with_state(TestStateBuilder::new(gateway).orders(orders).build());

        let response = app
            .oneshot(pay_request(
                json!({ "cart": [{ "product_id": 1, "price": 20 }], "nonce": "bad" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"declined");
    }

    #[tokio::test]
    async fn strict_mode_rejects_price_mismatch_before_the_gateway_is_called() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_sale().times(0);

        let mut prices = MockPriceSource::new();
        prices
            .expect_prices_for()
            .times(1)
            .returning(|_| Ok(HashMap::from([(1, dec!(25))])));

        let app = routes::create_router()
            .with_state(TestStateBuilder::new(gateway).strict(prices).build());

        let response = app
            .oneshot(pay_request(
                json!({ "cart": [{ "product_id": 1, "price": 20 }], "nonce": "n" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn strict_mode_rejects_unknown_products_before_the_gateway_is_called() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_submit_sale().times(0);

        let mut prices = MockPriceSource::new();
        prices
            .expect_prices_for()
            .times(1)
            .returning(|_| Ok(HashMap::new()));

        let app = routes::create_router()
            .with_state(TestStateBuilder::new(gateway).strict(prices).build());

        let response = app
            .oneshot(pay_request(
                json!({ "cart": [{ "product_id": 99, "price": 20 }], "nonce": "n" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
