use axum::{routing::get, Router};

pub mod ledger;
pub mod system;

/// Router for all authenticated (caller-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/ledger", ledger::router())
}
