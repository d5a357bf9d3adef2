//! # Stripe Payment Intents
//!
//! Creates card payment intents. The browser confirms the card with the
//! returned `client_secret`; the server never sees card data.

use crate::config::StripeConfig;
use async_trait::async_trait;
use dreamcars_core::{ChargeAmount, MarketError, MarketResult, PaymentIntent, PaymentStrategy};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

pub struct StripeIntentStrategy {
    config: StripeConfig,
    client: Client,
}

impl StripeIntentStrategy {
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        info!(test_mode = config.is_test_mode(), "Stripe intent strategy ready");
        Self { config, client }
    }

    /// Create from environment variables
    pub fn from_env() -> MarketResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    /// Form body for `POST /v1/payment_intents`
    fn form_params(amount: ChargeAmount) -> [(&'static str, String); 3] {
        [
            ("amount", amount.minor_units.to_string()),
            ("currency", amount.currency.code().to_string()),
            ("payment_method_types[]", "card".to_string()),
        ]
    }
}

#[async_trait]
impl PaymentStrategy for StripeIntentStrategy {
    #[instrument(skip(self), fields(minor_units = amount.minor_units))]
    async fn create_intent(&self, amount: ChargeAmount) -> MarketResult<PaymentIntent> {
        let url = format!("{}/v1/payment_intents", self.config.api_base_url);
        debug!("Creating Stripe payment intent: {}", amount);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .form(&Self::form_params(amount))
            .send()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MarketError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            let message = match serde_json::from_str::<StripeErrorResponse>(&body) {
                Ok(parsed) => parsed.error.message,
                Err(_) => format!("HTTP {}: {}", status, body),
            };
            return Err(MarketError::ProviderError {
                provider: PROVIDER.to_string(),
                message,
            });
        }

        let intent: StripeIntentResponse = serde_json::from_str(&body).map_err(|e| {
            MarketError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;

        info!("Created Stripe payment intent: id={}", intent.id);

        Ok(PaymentIntent {
            intent_id: intent.id,
            client_secret: intent.client_secret,
            amount,
            provider: PROVIDER.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamcars_core::Currency;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn strategy(server: &MockServer) -> StripeIntentStrategy {
        StripeIntentStrategy::new(
            StripeConfig::new("sk_test_abc123").with_api_base_url(server.uri()),
        )
    }

    #[test]
    fn test_form_params() {
        let params = StripeIntentStrategy::form_params(ChargeAmount::from_minor_units(
            2_100_000,
            Currency::Eur,
        ));

        assert_eq!(params[0], ("amount", "2100000".to_string()));
        assert_eq!(params[1], ("currency", "eur".to_string()));
        assert_eq!(params[2], ("payment_method_types[]", "card".to_string()));
    }

    #[tokio::test]
    async fn test_create_intent_returns_client_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Authorization", "Bearer sk_test_abc123"))
            .and(body_string_contains("amount=1050"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_123",
                "object": "payment_intent",
                "client_secret": "pi_123_secret_456",
                "amount": 1050,
                "currency": "usd"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let amount = ChargeAmount::from_price(10.5, Currency::Usd);
        let intent = strategy(&server).create_intent(amount).await.unwrap();

        assert_eq!(intent.intent_id, "pi_123");
        assert_eq!(intent.client_secret, "pi_123_secret_456");
        assert_eq!(intent.provider, "stripe");
        assert_eq!(intent.amount.minor_units, 1050);
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "type": "card_error", "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let amount = ChargeAmount::from_price(99.0, Currency::Usd);
        let err = strategy(&server).create_intent(amount).await.unwrap_err();

        match err {
            MarketError::ProviderError { provider, message } => {
                assert_eq!(provider, "stripe");
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let strategy = StripeIntentStrategy::new(
            StripeConfig::new("sk_test_abc123")
                .with_api_base_url("http://127.0.0.1:9"),
        );
        let amount = ChargeAmount::from_price(1.0, Currency::Usd);

        let err = strategy.create_intent(amount).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
    }
}
