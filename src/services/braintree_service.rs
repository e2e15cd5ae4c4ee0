use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use rust_decimal::Decimal;
use serde_json::json;

use crate::{
    config::BraintreeConfig,
    error::{AppError, Result},
};

const BRAINTREE_VERSION: &str = "2019-01-01";

/// Transaction statuses Braintree reports for a charge that went through.
/// Anything else (declined, gateway-rejected, failed) counts as a failure.
const SUCCESS_STATUSES: [&str; 4] = [
    "AUTHORIZED",
    "SUBMITTED_FOR_SETTLEMENT",
    "SETTLING",
    "SETTLED",
];

/// Terminal outcome of a sale submission. `raw` is the processor's response
/// object, persisted with the order as the payment record.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub status: String,
    pub raw: serde_json::Value,
}

impl Transaction {
    pub fn is_success(&self) -> bool {
        SUCCESS_STATUSES.contains(&self.status.as_str())
    }
}

/// The two operations the checkout flow needs from the payment processor.
/// Every call settles to exactly one outcome; there is no pending state and
/// no retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opaque token the client-side checkout form needs to collect
    /// payment-method data.
    async fn client_token(&self) -> Result<String>;

    /// Charges `amount` with the one-time `nonce`, submitting for
    /// settlement immediately.
    async fn submit_sale(&self, amount: Decimal, nonce: &str) -> Result<Transaction>;
}

/// Braintree GraphQL client. Constructed once at startup and shared across
/// requests; each call is stateless.
pub struct BraintreeGateway {
    http: reqwest::Client,
    api_url: String,
    auth_header: String,
}

impl BraintreeGateway {
    pub fn new(config: &BraintreeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to build gateway HTTP client: {}", e))
            })?;

        let credentials = format!("{}:{}", config.public_key, config.private_key);
        let auth_header = format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        );

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            auth_header,
        })
    }

    /// Posts a GraphQL document and returns the `data` object. Transport
    /// failures and processor error responses both surface the raw body.
    async fn graphql(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(&self.api_url)
            .header(http::header::AUTHORIZATION, &self.auth_header)
            .header("Braintree-Version", BRAINTREE_VERSION)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| AppError::GatewayError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::GatewayError(e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::GatewayError(body));
        }

        let parsed: serde_json::Value = serde_json::from_str(&body)
            .map_err(|_| AppError::GatewayError(body.clone()))?;

        if parsed.get("errors").is_some_and(|e| !e.is_null()) {
            return Err(AppError::GatewayError(body));
        }

        parsed
            .get("data")
            .cloned()
            .ok_or(AppError::GatewayError(body))
    }
}

#[async_trait]
impl PaymentGateway for BraintreeGateway {
    async fn client_token(&self) -> Result<String> {
        let data = self
            .graphql(
                "mutation CreateClientToken($input: CreateClientTokenInput) {
                   createClientToken(input: $input) { clientToken }
                 }",
                json!({ "input": {} }),
            )
            .await?;

        data.pointer("/createClientToken/clientToken")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::GatewayError(data.to_string()))
    }

    async fn submit_sale(&self, amount: Decimal, nonce: &str) -> Result<Transaction> {
        let data = self
            .graphql(
                "mutation ChargePaymentMethod($input: ChargePaymentMethodInput!) {
                   chargePaymentMethod(input: $input) {
                     transaction { id status }
                   }
                 }",
                json!({
                    "input": {
                        "paymentMethodId": nonce,
                        "transaction": { "amount": amount.to_string() },
                    }
                }),
            )
            .await?;

        let transaction = data
            .pointer("/chargePaymentMethod/transaction")
            .filter(|t| !t.is_null())
            .ok_or_else(|| AppError::GatewayError(data.to_string()))?;

        let id = transaction
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::GatewayError(data.to_string()))?
            .to_string();

        let status = transaction
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Transaction {
            id,
            status,
            raw: transaction.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> BraintreeGateway {
        BraintreeGateway::new(&BraintreeConfig {
            public_key: "public".to_string(),
            private_key: "private".to_string(),
            api_url: format!("{}/graphql", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn client_token_returns_processor_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("Braintree-Version", BRAINTREE_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "createClientToken": { "clientToken": "sandbox-token-abc" } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = gateway_for(&server).client_token().await.unwrap();
        assert_eq!(token, "sandbox-token-abc");
    }

    #[tokio::test]
    async fn client_token_surfaces_processor_error_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(503).set_body_string("processor unavailable"),
            )
            .mount(&server)
            .await;

        let err = gateway_for(&server).client_token().await.unwrap_err();
        match err {
            AppError::GatewayError(body) => assert_eq!(body, "processor unavailable"),
            other => panic!("expected GatewayError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn submit_sale_parses_settled_transaction() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "chargePaymentMethod": {
                        "transaction": { "id": "txn_1", "status": "SUBMITTED_FOR_SETTLEMENT" }
                    }
                }
            })))
            .mount(&server)
            .await;

        let transaction = gateway_for(&server)
            .submit_sale(Decimal::new(3550, 2), "fake-valid-nonce")
            .await
            .unwrap();

        assert_eq!(transaction.id, "txn_1");
        assert!(transaction.is_success());
    }

    #[tokio::test]
    async fn submit_sale_treats_graphql_errors_as_gateway_failure() {
        let server = MockServer::start().await;

        let body = json!({
            "errors": [{ "message": "Unknown or expired single-use payment method." }]
        });

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let err = gateway_for(&server)
            .submit_sale(Decimal::ONE, "bad-nonce")
            .await
            .unwrap_err();

        match err {
            AppError::GatewayError(raw) => {
                assert!(raw.contains("Unknown or expired single-use payment method."))
            }
            other => panic!("expected GatewayError, got {:?}", other),
        }
    }

    #[test]
    fn declined_status_is_not_success() {
        let transaction = Transaction {
            id: "txn_2".to_string(),
            status: "PROCESSOR_DECLINED".to_string(),
            raw: json!({}),
        };

        assert!(!transaction.is_success());
    }
}
