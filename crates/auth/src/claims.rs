use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use capledger_core::{AccountId, Caller};

/// JWT claims model (transport-agnostic).
///
/// The subject is the ledger account the bearer acts for. There are no roles: every
/// account may only operate on itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the caller's account.
    pub sub: AccountId,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl JwtClaims {
    pub fn new(sub: AccountId, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    /// The authenticated caller these claims vouch for.
    ///
    /// Only meaningful after the claims passed [`validate_claims`].
    pub fn caller(&self) -> Caller {
        Caller::authenticated(self.sub)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the time window of JWT claims.
///
/// Signature verification happens in [`crate::jwt`]; this only looks at the claims.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
