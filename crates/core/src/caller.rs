//! Authenticated caller identity.

use serde::Serialize;

use crate::id::AccountId;

/// The account on whose behalf an operation runs.
///
/// The ledger never infers identity: the hosting boundary (HTTP middleware, a test, a CLI)
/// authenticates the request and hands a `Caller` to every operation explicitly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Caller(AccountId);

impl Caller {
    /// Wrap an account id that the boundary layer has already authenticated.
    pub fn authenticated(account_id: AccountId) -> Self {
        Self(account_id)
    }

    pub fn account_id(&self) -> AccountId {
        self.0
    }
}

impl core::fmt::Display for Caller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
