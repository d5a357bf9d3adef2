//! # Authorization Guards
//!
//! `require_auth` verifies the bearer token and attaches its `Claims` to the
//! request. The role guards run after it, look the caller up in the user
//! directory on every request and attach the resolved `User`.

use crate::handlers::{market_error_to_response, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use dreamcars_core::{Claims, MarketError, Role};
use tracing::debug;

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req.headers().get(header::AUTHORIZATION).ok_or_else(|| {
        market_error_to_response(MarketError::Unauthenticated(
            "missing authorization header".to_string(),
        ))
    })?;

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            market_error_to_response(MarketError::Forbidden(
                "authorization header is not a bearer token".to_string(),
            ))
        })?;

    let claims = state.tokens.verify(token).map_err(|rejection| {
        debug!("token rejected: {}", rejection);
        market_error_to_response(MarketError::Forbidden(rejection.to_string()))
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn require_buyer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(&state, Role::Buyer, req, next).await
}

pub async fn require_seller(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(&state, Role::Seller, req, next).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_role(&state, Role::Admin, req, next).await
}

async fn require_role(
    state: &AppState,
    role: Role,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = req.extensions().get::<Claims>().cloned().ok_or_else(|| {
        market_error_to_response(MarketError::Unauthenticated(
            "no verified identity on request".to_string(),
        ))
    })?;

    let user = state
        .users
        .require_role(&claims.email, role)
        .await
        .map_err(market_error_to_response)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
