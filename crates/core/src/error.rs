//! Ledger error model.

use thiserror::Error;

use crate::Amount;
use crate::id::AccountId;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Terminal failure of a ledger operation.
///
/// Every variant aborts the whole operation: no balance, counter or event is left behind.
/// Variants carry enough data for the caller to correct and resubmit without re-querying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("aggregate balance would reach {attempted}, above the capacity limit of {limit}")]
    CapacityExceeded { attempted: Amount, limit: Amount },

    #[error("account {account} holds {balance}, cannot withdraw {requested}")]
    InsufficientBalance {
        account: AccountId,
        balance: Amount,
        requested: Amount,
    },

    #[error("withdrawal of {requested} exceeds the per-operation limit of {limit}")]
    WithdrawalLimitExceeded { requested: Amount, limit: Amount },

    #[error("transfer of {amount} to account {account} failed")]
    TransferFailed { account: AccountId, amount: Amount },

    /// The call named an operation the ledger does not expose.
    #[error("unsupported operation: {selector:?}")]
    UnsupportedOperation { selector: String },

    /// Value was attached to an operation that does not accept it.
    #[error("operation `{operation}` does not accept an attached value")]
    NonPayable { operation: String },

    #[error("invalid arguments for `{operation}`: {reason}")]
    InvalidArguments { operation: String, reason: String },

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl LedgerError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn unsupported(selector: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            selector: selector.into(),
        }
    }

    /// Stable machine-readable code, used by transports when reporting the error.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::ZeroAmount => "zero_amount",
            LedgerError::CapacityExceeded { .. } => "capacity_exceeded",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::WithdrawalLimitExceeded { .. } => "withdrawal_limit_exceeded",
            LedgerError::TransferFailed { .. } => "transfer_failed",
            LedgerError::UnsupportedOperation { .. } => "unsupported_operation",
            LedgerError::NonPayable { .. } => "non_payable",
            LedgerError::InvalidArguments { .. } => "invalid_arguments",
            LedgerError::InvalidId(_) => "invalid_id",
            LedgerError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }
}
