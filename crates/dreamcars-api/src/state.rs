//! # Application State
//!
//! Shared state for the Axum application: the document store, the
//! marketplace services built on it, payment strategies and configuration.

use anyhow::{anyhow, bail};
use dreamcars_core::{
    BookingLedger, BoxedPaymentStrategy, CategoryCatalog, CategorySeed, Currency, ListingCatalog,
    MarketError, MarketResult, PaymentLedger, PaymentStrategySelector, ReportDesk, SharedStore,
    TokenService, UserDirectory,
};
use dreamcars_stripe::StripeIntentStrategy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const DEV_TOKEN_SECRET: &str = "dev-secret-change-me";
const MEMORY_DB_PATH: &str = ":memory:";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// HS256 signing secret for bearer tokens
    pub token_secret: String,
    /// SQLite database file
    pub db_path: PathBuf,
    /// Email guaranteed an admin account at startup
    pub admin_email: Option<String>,
    /// Currency every charge intent is created in
    pub currency: Currency,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let token_secret = match std::env::var("ACCESS_TOKEN_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment == "development" => {
                warn!("ACCESS_TOKEN_SECRET not set, using development secret");
                DEV_TOKEN_SECRET.to_string()
            }
            _ => bail!("ACCESS_TOKEN_SECRET must be set in {}", environment),
        };

        let currency = match std::env::var("PAYMENT_CURRENCY") {
            Ok(code) => code.parse::<Currency>()?,
            Err(_) => Currency::Usd,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            environment,
            token_secret,
            db_path: std::env::var("DREAMCARS_DB_PATH")
                .unwrap_or_else(|_| "dreamcars.db".to_string())
                .into(),
            admin_email: std::env::var("DREAMCARS_ADMIN_EMAIL")
                .ok()
                .filter(|email| !email.trim().is_empty()),
            currency,
        })
    }

    /// Development defaults with an explicit token secret
    pub fn with_secret(token_secret: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            environment: "development".to_string(),
            token_secret: token_secret.into(),
            db_path: "dreamcars.db".into(),
            admin_email: None,
            currency: Currency::Usd,
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// `DREAMCARS_DB_PATH=:memory:` selects the in-process store
    pub fn uses_memory_store(&self) -> bool {
        self.db_path.as_os_str() == MEMORY_DB_PATH
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub users: UserDirectory,
    pub categories: CategoryCatalog,
    pub listings: ListingCatalog,
    pub bookings: BookingLedger,
    pub payments: PaymentLedger,
    pub reports: ReportDesk,
    pub tokens: TokenService,
    /// Payment strategy selector
    pub strategies: PaymentStrategySelector,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state over an opened store with the Stripe strategy from the environment
    pub fn new(config: AppConfig, store: SharedStore) -> anyhow::Result<Self> {
        let stripe_strategy = StripeIntentStrategy::from_env()
            .map_err(|e| anyhow!("Failed to initialize Stripe: {}", e))?;

        let mut strategies = PaymentStrategySelector::new("stripe");
        strategies.register(Arc::new(stripe_strategy) as BoxedPaymentStrategy);

        Ok(Self::with_store(config, store, strategies))
    }

    pub fn with_store(
        config: AppConfig,
        store: SharedStore,
        strategies: PaymentStrategySelector,
    ) -> Self {
        Self {
            users: UserDirectory::new(store.clone()),
            categories: CategoryCatalog::new(store.clone()),
            listings: ListingCatalog::new(store.clone()),
            bookings: BookingLedger::new(store.clone()),
            payments: PaymentLedger::new(store.clone(), config.currency),
            reports: ReportDesk::new(store.clone()),
            tokens: TokenService::new(&config.token_secret),
            store,
            strategies,
            config,
        }
    }

    /// Seed categories and make sure the configured admin exists.
    pub async fn bootstrap(&self, seed: &CategorySeed) -> MarketResult<()> {
        self.categories.seed_if_empty(seed).await?;

        if let Some(ref email) = self.config.admin_email {
            self.users.ensure_admin(email).await?;
        }
        Ok(())
    }

    /// Get the default payment strategy
    pub fn default_strategy(&self) -> MarketResult<&BoxedPaymentStrategy> {
        self.strategies.default_strategy().ok_or_else(|| {
            MarketError::Configuration("no payment provider configured".to_string())
        })
    }
}

/// Load the category seed from config file
pub fn load_category_seed() -> anyhow::Result<CategorySeed> {
    let config_paths = [
        "config/categories.toml",
        "../config/categories.toml",
        "../../config/categories.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let seed = CategorySeed::from_toml(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} categories from {}", seed.categories.len(), path);
            return Ok(seed);
        }
    }

    warn!("No category seed found, starting without categories");
    Ok(CategorySeed::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dreamcars_core::{Collection, Filter, MemoryStore, Role};

    #[test]
    fn test_socket_addr() {
        let mut config = AppConfig::with_secret("s3cret");
        config.host = "0.0.0.0".to_string();
        config.port = 3000;

        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");

        config.host = "not a host".to_string();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_memory_store_selection() {
        let mut config = AppConfig::with_secret("s3cret");
        assert!(!config.uses_memory_store());

        config.db_path = ":memory:".into();
        assert!(config.uses_memory_store());
    }

    #[test]
    fn test_bundled_seed_parses() {
        let seed = CategorySeed::from_toml(include_str!("../../../config/categories.toml")).unwrap();
        assert!(!seed.categories.is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_seeds_and_creates_admin() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut config = AppConfig::with_secret("s3cret");
        config.admin_email = Some("root@cars.io".to_string());
        let state = AppState::with_store(config, store.clone(), PaymentStrategySelector::default());

        let seed = CategorySeed::from_toml(
            r#"
            [[categories]]
            id = "suv"
            name = "SUV"
            "#,
        )
        .unwrap();

        state.bootstrap(&seed).await.unwrap();
        state.bootstrap(&seed).await.unwrap();

        assert_eq!(store.count(Collection::Categories, &Filter::all()).await.unwrap(), 1);
        assert_eq!(state.users.role_of("root@cars.io").await.unwrap(), Role::Admin);
        assert!(state.default_strategy().is_err());
    }
}
