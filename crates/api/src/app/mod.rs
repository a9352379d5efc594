//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: ledger, payout gateway and event bus wiring, plus the realtime bridge
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use capledger_core::LedgerResult;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &ApiConfig) -> LedgerResult<Router> {
    let jwt = Arc::new(capledger_auth::Hs256JwtValidator::new(config.jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::build_services(config.ledger)?);

    // Protected routes: require a bearer token naming the caller account.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new()))
}
