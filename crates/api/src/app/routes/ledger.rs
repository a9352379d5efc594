use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{sse::Event as SseEvent, IntoResponse},
    routing::{get, post},
    Json, Router,
};

use capledger_core::AccountId;
use capledger_ledger::{dispatch, Call};

use crate::app::{dto, errors, services::{self, AppServices}};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        .route("/call", post(call))
        .route("/me", get(my_account))
        .route("/accounts/:id", get(get_account))
        .route("/total", get(total))
        .route("/limits", get(limits))
        .route("/events", get(events))
}

pub async fn deposit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    body: Result<Json<dto::DepositRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };

    match services.ledger().deposit(ctx.caller(), body.value) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn withdraw(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    body: Result<Json<dto::WithdrawRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };

    match services.ledger().withdraw(ctx.caller(), body.amount) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Raw selector dispatch: `{ "selector": "withdraw", "value": 0, "args": { "amount": 10 } }`.
pub async fn call(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    body: Result<Json<Call>, JsonRejection>,
) -> axum::response::Response {
    let Json(call) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(rejection),
    };

    match dispatch(services.ledger(), ctx.caller(), call) {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn my_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    let account_id = ctx.account_id();
    let account = services.ledger().account(account_id);
    (StatusCode::OK, Json(dto::AccountView::new(account_id, account))).into_response()
}

pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let account_id = match id.parse::<AccountId>() {
        Ok(id) => id,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    // Unknown accounts read as zero, same as the ledger queries.
    let account = services.ledger().account(account_id);
    (StatusCode::OK, Json(dto::AccountView::new(account_id, account))).into_response()
}

pub async fn total(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let ledger = services.ledger();
    let view = dto::TotalsView {
        total_balance: ledger.total_balance(),
        in_flight: ledger.in_flight(),
        version: ledger.version(),
    };
    (StatusCode::OK, Json(view)).into_response()
}

pub async fn limits(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let ledger = services.ledger();
    let view = dto::LimitsView {
        capacity_limit: ledger.capacity_limit(),
        withdrawal_limit: ledger.withdrawal_limit(),
    };
    (StatusCode::OK, Json(view)).into_response()
}

pub async fn events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::account_sse_stream(services, ctx.account_id())
}

fn invalid_body(rejection: JsonRejection) -> axum::response::Response {
    errors::json_error(rejection.status(), "invalid_body", rejection.body_text())
}
