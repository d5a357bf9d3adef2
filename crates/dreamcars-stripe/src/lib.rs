//! # dreamcars-stripe
//!
//! Stripe payment strategy for dreamcars.
//!
//! `StripeIntentStrategy` creates card payment intents through the
//! Payment Intents API and returns the client secret the browser needs to
//! confirm the charge.
//!
//! ```rust,ignore
//! use dreamcars_stripe::StripeIntentStrategy;
//! use dreamcars_core::{ChargeAmount, Currency, PaymentStrategy};
//!
//! let strategy = StripeIntentStrategy::from_env()?;
//! let intent = strategy
//!     .create_intent(ChargeAmount::from_price(21000.0, Currency::Usd))
//!     .await?;
//! // send intent.client_secret to the browser
//! ```

pub mod config;
pub mod intent;

pub use config::StripeConfig;
pub use intent::StripeIntentStrategy;
