//! # DreamCars
//!
//! Vehicle marketplace API server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export ACCESS_TOKEN_SECRET=...
//! export STRIPE_SECRET_KEY=sk_test_...
//!
//! # Run the server
//! dreamcars
//! ```

use dreamcars_api::{routes, state, AppConfig, AppState};
use dreamcars_core::{MemoryStore, SharedStore};
use dreamcars_db::SqliteStore;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;

    info!("Environment: {}", config.environment);

    let opened: anyhow::Result<SharedStore> = if config.uses_memory_store() {
        warn!("Using in-memory store; data is lost on exit");
        Ok(Arc::new(MemoryStore::new()))
    } else {
        SqliteStore::open(&config.db_path).map(|store| Arc::new(store) as SharedStore)
    };

    let app = match opened {
        Ok(store) => {
            let state = AppState::new(config, store)?;

            let seed = state::load_category_seed()?;
            if let Err(e) = state.bootstrap(&seed).await {
                error!("Startup bootstrap failed: {}", e);
            }

            info!("Store backend: {}", state.store.backend_name());
            info!("Payment providers: {:?}", state.strategies.providers());

            if !state.config.is_production() {
                info!("🔑 Token: GET http://{}/api/v1/jwt?email=<email>", addr);
                info!("🚘 Listings: GET http://{}/api/v1/products", addr);
            }
            routes::create_router(state)
        }
        Err(e) => {
            error!(
                "Failed to open database at {}: {:#}",
                config.db_path.display(),
                e
            );
            error!("Serving health routes only");
            routes::health_router()
        }
    };

    info!("🚗 DreamCars starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  🚗 DreamCars 🚗
  ━━━━━━━━━━━━━━━━━━━━━━━
  Vehicle marketplace API
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
