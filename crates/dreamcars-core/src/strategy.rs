//! # Payment Strategy Trait
//!
//! Strategy pattern trait for payment providers. The marketplace only needs
//! one capability from a provider: create a charge intent and hand the
//! client-side secret back to the browser. Card collection and confirmation
//! happen on the client.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentStrategy (trait)                  │
//! │  ├── create_intent()                                        │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                   ┌────────┴────────┐
//!           ┌───────┴───────┐ ┌───────┴───────┐
//!           │ StripeIntent  │ │ (other        │
//!           │   Strategy    │ │  providers)   │
//!           └───────────────┘ └───────────────┘
//! ```

use crate::error::MarketResult;
use crate::money::ChargeAmount;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A provider-side charge intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Provider's intent ID
    pub intent_id: String,
    /// Secret the client uses to confirm the charge
    pub client_secret: String,
    pub amount: ChargeAmount,
    pub provider: String,
}

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Ask the provider for a charge intent.
    ///
    /// No marketplace record is created at this step.
    async fn create_intent(&self, amount: ChargeAmount) -> MarketResult<PaymentIntent>;

    /// Get the provider name (for logging and routing).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a boxed payment strategy (dynamic dispatch)
pub type BoxedPaymentStrategy = Arc<dyn PaymentStrategy>;

/// Strategy selector for multiple providers
#[derive(Clone)]
pub struct PaymentStrategySelector {
    strategies: HashMap<String, BoxedPaymentStrategy>,
    default_provider: String,
}

impl PaymentStrategySelector {
    /// Create a new selector with a default provider
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            strategies: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a payment strategy
    pub fn register(&mut self, strategy: BoxedPaymentStrategy) {
        let name = strategy.provider_name().to_string();
        self.strategies.insert(name, strategy);
    }

    /// Register with builder pattern
    pub fn with_strategy(mut self, strategy: BoxedPaymentStrategy) -> Self {
        self.register(strategy);
        self
    }

    pub fn default_strategy(&self) -> Option<&BoxedPaymentStrategy> {
        self.strategies.get(&self.default_provider)
    }

    /// List all registered providers
    pub fn providers(&self) -> Vec<&str> {
        self.strategies.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for PaymentStrategySelector {
    fn default() -> Self {
        Self::new("stripe")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    struct FixedStrategy;

    #[async_trait]
    impl PaymentStrategy for FixedStrategy {
        async fn create_intent(&self, amount: ChargeAmount) -> MarketResult<PaymentIntent> {
            Ok(PaymentIntent {
                intent_id: "pi_fixed".to_string(),
                client_secret: "pi_fixed_secret".to_string(),
                amount,
                provider: "fixed".to_string(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_strategy_selector() {
        let selector = PaymentStrategySelector::new("stripe");
        assert_eq!(selector.providers().len(), 0);
        assert!(selector.default_strategy().is_none());

        let selector = PaymentStrategySelector::new("fixed").with_strategy(Arc::new(FixedStrategy));
        assert!(selector.default_strategy().is_some());
        assert_eq!(selector.providers(), vec!["fixed"]);
    }

    #[tokio::test]
    async fn test_intent_passthrough() {
        let amount = ChargeAmount::from_price(120.5, Currency::Cad);
        let intent = FixedStrategy.create_intent(amount).await.unwrap();
        assert_eq!(intent.amount.minor_units, 12050);
        assert_eq!(intent.amount.currency, Currency::Cad);
    }
}
