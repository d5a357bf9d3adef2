//! # Routes
//!
//! Axum router configuration for the marketplace API.

use crate::guards::{require_admin, require_auth, require_buyer, require_seller};
use crate::handlers;
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
///
/// Routes under `/api/v1` fall into five guard groups:
/// - public: tokens, categories, listing reads, registration, role/verified lookups
/// - authenticated: bookings (read), payments, filing reports
/// - buyer: creating bookings
/// - seller: creating, promoting and deleting own listings
/// - admin: users by role, seller verification, user removal, report resolution
///
/// Groups share paths with different methods and are combined with `merge`.
/// Guards are attached with `route_layer` so unmatched paths never reach them.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/jwt", get(handlers::issue_token))
        .route("/categories", get(handlers::list_categories))
        .route("/categories/{id}", get(handlers::get_category))
        .route("/products", get(handlers::browse_listings))
        .route("/products/{id}", get(handlers::get_listing))
        .route("/sellers/{email}/products", get(handlers::seller_listings))
        .route("/advertised", get(handlers::advertised_listings))
        .route("/users", post(handlers::register_user))
        .route("/users/{email}/role", get(handlers::user_role))
        .route("/users/{email}/verified", get(handlers::user_verified));

    let authenticated_routes = Router::new()
        .route("/bookings", get(handlers::list_bookings))
        .route("/bookings/{id}", get(handlers::get_booking))
        .route("/create-payment-intent", post(handlers::create_payment_intent))
        .route("/payments", post(handlers::confirm_payment))
        .route("/reports", post(handlers::create_report))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Layers run outermost-last: authentication before the role check
    let buyer_routes = Router::new()
        .route("/bookings", post(handlers::create_booking))
        .route_layer(from_fn_with_state(state.clone(), require_buyer))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let seller_routes = Router::new()
        .route("/products", post(handlers::create_listing))
        .route(
            "/products/{id}",
            patch(handlers::update_listing).delete(handlers::delete_listing),
        )
        .route_layer(from_fn_with_state(state.clone(), require_seller))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/users", get(handlers::list_users))
        .route("/users/{email}/verify", patch(handlers::verify_seller))
        .route("/users/{email}", delete(handlers::delete_user))
        .route(
            "/reports",
            get(handlers::list_reports).delete(handlers::resolve_report),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(buyer_routes)
        .merge(seller_routes)
        .merge(admin_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health-only router, served when the store cannot be opened
pub fn health_router() -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .layer(TraceLayer::new_for_http())
}
