//! # dreamcars-api
//!
//! HTTP API layer for the dreamcars marketplace.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Bearer-token and role guards
//! - REST endpoints for categories, listings, bookings, payments, users and reports
//!
//! ## Endpoints
//!
//! | Method | Path | Guard |
//! |--------|------|-------|
//! | GET | `/health` | - |
//! | GET | `/api/v1/jwt?email=` | - |
//! | GET | `/api/v1/products?category_id=` | - |
//! | POST | `/api/v1/products` | seller |
//! | POST | `/api/v1/bookings` | buyer |
//! | POST | `/api/v1/payments` | auth |
//! | DELETE | `/api/v1/reports?report_id=&listing_id=` | admin |
//!
//! See [`routes::create_router`] for the full table.

pub mod extract;
pub mod guards;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{create_router, health_router};
pub use state::{AppConfig, AppState};
