use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value as JsonValue};

use capledger_core::LedgerError;

pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let status = status_for(&err);
    let details = details_for(&err);

    let mut body = json!({
        "error": err.code(),
        "message": err.to_string(),
    });
    if let (Some(obj), Some(details)) = (body.as_object_mut(), details) {
        obj.insert("details".to_string(), details);
    }

    (status, axum::Json(body)).into_response()
}

fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::ZeroAmount
        | LedgerError::InvalidArguments { .. }
        | LedgerError::InvalidId(_)
        | LedgerError::UnsupportedOperation { .. }
        | LedgerError::NonPayable { .. } => StatusCode::BAD_REQUEST,
        LedgerError::CapacityExceeded { .. }
        | LedgerError::InsufficientBalance { .. }
        | LedgerError::WithdrawalLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::TransferFailed { .. } => StatusCode::BAD_GATEWAY,
        LedgerError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn details_for(err: &LedgerError) -> Option<JsonValue> {
    match err {
        LedgerError::CapacityExceeded { attempted, limit } => {
            Some(json!({ "attempted": attempted, "limit": limit }))
        }
        LedgerError::InsufficientBalance {
            account,
            balance,
            requested,
        } => Some(json!({
            "account": account.to_string(),
            "balance": balance,
            "requested": requested,
        })),
        LedgerError::WithdrawalLimitExceeded { requested, limit } => {
            Some(json!({ "requested": requested, "limit": limit }))
        }
        LedgerError::TransferFailed { account, amount } => {
            Some(json!({ "account": account.to_string(), "amount": amount }))
        }
        LedgerError::UnsupportedOperation { selector } => Some(json!({ "selector": selector })),
        LedgerError::NonPayable { operation } | LedgerError::InvalidArguments { operation, .. } => {
            Some(json!({ "operation": operation }))
        }
        LedgerError::ZeroAmount | LedgerError::InvalidId(_) | LedgerError::InvalidConfiguration(_) => {
            None
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use capledger_core::AccountId;

    #[test]
    fn limit_violations_are_unprocessable() {
        assert_eq!(
            status_for(&LedgerError::CapacityExceeded {
                attempted: 11,
                limit: 10
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&LedgerError::WithdrawalLimitExceeded {
                requested: 6,
                limit: 5
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn transfer_failure_is_a_gateway_error() {
        let err = LedgerError::TransferFailed {
            account: AccountId::new(),
            amount: 3,
        };
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
        assert_eq!(details_for(&err).unwrap()["amount"], 3);
    }

    #[test]
    fn unsupported_selector_is_echoed_back() {
        let err = LedgerError::unsupported("mint");
        assert_eq!(status_for(&err), StatusCode::BAD_REQUEST);
        assert_eq!(details_for(&err), Some(json!({ "selector": "mint" })));
    }
}
