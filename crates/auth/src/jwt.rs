//! HS256 token signing and verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm or undecodable payload.
    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies bearer tokens and yields their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError>;
}

/// Shared-secret (HS256) validator.
///
/// The claim time window is checked by [`validate_claims`] against the supplied `now`,
/// so jsonwebtoken's own `exp` handling is switched off.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Shared-secret (HS256) token issuer, for dev tooling and tests.
pub struct Hs256JwtIssuer {
    key: EncodingKey,
}

impl Hs256JwtIssuer {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
        }
    }

    pub fn issue(&self, claims: &JwtClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.key)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

impl core::fmt::Debug for Hs256JwtIssuer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtIssuer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capledger_core::AccountId;
    use chrono::Duration;

    #[test]
    fn issued_token_validates_with_the_same_secret() {
        let now = Utc::now();
        let claims = JwtClaims::new(AccountId::new(), now, Duration::minutes(10));
        let token = Hs256JwtIssuer::new("s3cret").issue(&claims).unwrap();

        let decoded = Hs256JwtValidator::new("s3cret").validate(&token, now).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let now = Utc::now();
        let claims = JwtClaims::new(AccountId::new(), now, Duration::minutes(10));
        let token = Hs256JwtIssuer::new("other").issue(&claims).unwrap();

        let err = Hs256JwtValidator::new("s3cret").validate(&token, now).unwrap_err();

        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_refused() {
        let now = Utc::now();
        let claims = JwtClaims::new(AccountId::new(), now, Duration::minutes(10));
        let token = Hs256JwtIssuer::new("s3cret").issue(&claims).unwrap();

        let err = Hs256JwtValidator::new("s3cret")
            .validate(&token, now + Duration::minutes(11))
            .unwrap_err();

        assert_eq!(err, TokenError::Claims(TokenValidationError::Expired));
    }

    #[test]
    fn garbage_is_not_a_token() {
        let err = Hs256JwtValidator::new("s3cret")
            .validate("not.a.jwt", Utc::now())
            .unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }
}
