//! # Request Handlers
//!
//! Axum request handlers for the marketplace API. Responses are the raw store
//! outcome or the looked-up record.

use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use dreamcars_core::{
    Booking, Category, Claims, DeleteOutcome, InsertOutcome, Listing, MarketError, NewBooking,
    NewListing, NewReport, PaymentConfirmation, Registration, Report, Resolution, Role,
    UpdateOutcome, User, UserRemoval,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdvertiseRequest {
    pub advertise: bool,
}

#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntentRequestBody {
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleQuery {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub report_id: String,
    pub listing_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn market_error_to_response(err: MarketError) -> ApiError {
    let code = err.status_code();
    if code >= 500 {
        error!("Request failed: {}", err);
    }
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Extractor rejection (bad query string, unparsable body) as an API error
pub fn rejection_to_response(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse::new(message, status.as_u16())))
}

// =============================================================================
// Health & tokens
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "dreamcars",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Issue a bearer token for a registered email
#[instrument(skip(state))]
pub async fn issue_token(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> ApiResult<TokenResponse> {
    let access_token = state
        .tokens
        .issue(&state.users, &query.email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(TokenResponse { access_token }))
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state
        .categories
        .list()
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Category> {
    let category = state
        .categories
        .get(&id)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(category))
}

// =============================================================================
// Listings
// =============================================================================

/// Unsold listings, optionally limited to one category
#[instrument(skip(state))]
pub async fn browse_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BrowseQuery>,
) -> ApiResult<Vec<Listing>> {
    let listings = state
        .listings
        .browse(query.category_id.as_deref())
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(listings))
}

pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Listing> {
    let listing = state
        .listings
        .get(&id)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(listing))
}

/// Every listing of one seller, sold or not
pub async fn seller_listings(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Vec<Listing>> {
    let listings = state
        .listings
        .by_owner(&email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(listings))
}

pub async fn advertised_listings(State(state): State<AppState>) -> ApiResult<Vec<Listing>> {
    let listings = state
        .listings
        .advertised()
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(listings))
}

#[instrument(skip(state, seller, request), fields(seller = %seller.email, name = %request.name))]
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(seller): Extension<User>,
    ApiJson(request): ApiJson<NewListing>,
) -> ApiResult<InsertOutcome> {
    let outcome = state
        .listings
        .create(&seller, request)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

#[instrument(skip(state, claims, request), fields(seller = %claims.email))]
pub async fn update_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<AdvertiseRequest>,
) -> ApiResult<UpdateOutcome> {
    let outcome = state
        .listings
        .set_advertise(&claims.email, &id, request.advertise)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

#[instrument(skip(state, claims), fields(seller = %claims.email))]
pub async fn delete_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> ApiResult<DeleteOutcome> {
    let outcome = state
        .listings
        .delete_owned(&claims.email, &id)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

// =============================================================================
// Bookings
// =============================================================================

#[instrument(skip(state, buyer, request), fields(buyer = %buyer.email, listing = %request.listing_id))]
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(buyer): Extension<User>,
    ApiJson(request): ApiJson<NewBooking>,
) -> ApiResult<InsertOutcome> {
    let outcome = state
        .bookings
        .create(&buyer, request)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

/// The caller's own bookings
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<BookingsQuery>,
) -> ApiResult<Vec<Booking>> {
    if let Some(email) = query.email {
        if email != claims.email {
            return Err(market_error_to_response(MarketError::Forbidden(
                "cannot read another user's bookings".to_string(),
            )));
        }
    }

    let bookings = state
        .bookings
        .for_buyer(&claims.email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let booking = state
        .bookings
        .get(&id)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(booking))
}

// =============================================================================
// Payments
// =============================================================================

#[instrument(skip(state, claims, request), fields(payer = %claims.email, price = request.price))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<IntentRequestBody>,
) -> ApiResult<IntentResponse> {
    let strategy = state.default_strategy().map_err(market_error_to_response)?;

    let intent = state
        .payments
        .create_intent(strategy.as_ref(), request.price)
        .await
        .map_err(market_error_to_response)?;

    info!(intent_id = %intent.intent_id, "payment intent created");
    Ok(Json(IntentResponse {
        client_secret: intent.client_secret,
    }))
}

#[instrument(skip(state, claims, request), fields(payer = %claims.email))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<PaymentConfirmation>,
) -> ApiResult<InsertOutcome> {
    let outcome = state
        .payments
        .confirm(&claims.email, request)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

// =============================================================================
// Users
// =============================================================================

#[instrument(skip(state, request), fields(email = %request.email, role = %request.role))]
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<Registration>,
) -> ApiResult<InsertOutcome> {
    let outcome = state
        .users
        .register(request)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RoleQuery>,
) -> ApiResult<Vec<User>> {
    let users = state
        .users
        .list_by_role(query.role)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(users))
}

pub async fn user_role(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<RoleResponse> {
    let role = state
        .users
        .role_of(&email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(RoleResponse { role }))
}

pub async fn user_verified(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<VerifiedResponse> {
    let verified = state
        .users
        .is_verified(&email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(VerifiedResponse { verified }))
}

#[instrument(skip(state))]
pub async fn verify_seller(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<UpdateOutcome> {
    let outcome = state
        .users
        .verify_seller(&email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<UserRemoval> {
    let removal = state
        .users
        .remove(&email)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(removal))
}

// =============================================================================
// Reports
// =============================================================================

pub async fn list_reports(State(state): State<AppState>) -> ApiResult<Vec<Report>> {
    let reports = state
        .reports
        .list()
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(reports))
}

#[instrument(skip(state, claims, request), fields(reporter = %claims.email, listing = %request.listing_id))]
pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<NewReport>,
) -> ApiResult<InsertOutcome> {
    let outcome = state
        .reports
        .create(&claims.email, request)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(outcome))
}

/// Admin resolution: delete both the listing and the report
#[instrument(skip(state))]
pub async fn resolve_report(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ResolveQuery>,
) -> ApiResult<Resolution> {
    let resolution = state
        .reports
        .resolve(&query.listing_id, &query.report_id)
        .await
        .map_err(market_error_to_response)?;
    Ok(Json(resolution))
}
