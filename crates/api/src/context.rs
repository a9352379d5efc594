use chrono::{DateTime, Utc};

use capledger_core::{AccountId, Caller};

/// Caller context for a request.
///
/// Inserted by the auth middleware; every `/ledger` route requires it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CallerContext {
    caller: Caller,
    expires_at: DateTime<Utc>,
}

impl CallerContext {
    pub fn new(caller: Caller, expires_at: DateTime<Utc>) -> Self {
        Self { caller, expires_at }
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn account_id(&self) -> AccountId {
        self.caller.account_id()
    }

    /// When the token that authenticated this request stops being valid.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
