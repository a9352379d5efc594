use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<CallerContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "account_id": ctx.account_id().to_string(),
        "expires_at": ctx.expires_at().to_rfc3339(),
    }))
}
