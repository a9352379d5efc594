//! Construction parameters of a ledger instance.

use serde::{Deserialize, Serialize};

use capledger_core::{Amount, LedgerError, LedgerResult};

/// Per-operation withdrawal ceiling used when none is configured.
pub const DEFAULT_WITHDRAWAL_LIMIT: Amount = 5_000;

/// Limits a ledger is deployed with. Both are fixed for the lifetime of the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum aggregate balance the ledger will ever hold.
    pub capacity_limit: Amount,
    /// Maximum amount a single withdrawal may move.
    #[serde(default = "default_withdrawal_limit")]
    pub withdrawal_limit: Amount,
}

fn default_withdrawal_limit() -> Amount {
    DEFAULT_WITHDRAWAL_LIMIT
}

impl LedgerConfig {
    pub fn new(capacity_limit: Amount) -> Self {
        Self {
            capacity_limit,
            withdrawal_limit: DEFAULT_WITHDRAWAL_LIMIT,
        }
    }

    pub fn with_withdrawal_limit(mut self, withdrawal_limit: Amount) -> Self {
        self.withdrawal_limit = withdrawal_limit;
        self
    }

    pub fn validate(&self) -> LedgerResult<()> {
        if self.capacity_limit == 0 {
            return Err(LedgerError::invalid_configuration(
                "capacity limit must be greater than zero",
            ));
        }
        if self.withdrawal_limit == 0 {
            return Err(LedgerError::invalid_configuration(
                "withdrawal limit must be greater than zero",
            ));
        }
        Ok(())
    }
}
