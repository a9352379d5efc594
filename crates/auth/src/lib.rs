//! `capledger-auth`: caller authentication at the host boundary.
//!
//! Turns a bearer token into the explicit [`Caller`](capledger_core::Caller) every ledger
//! operation requires. Decoupled from HTTP: the API middleware only extracts the token.

pub mod claims;
pub mod jwt;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtIssuer, Hs256JwtValidator, JwtValidator, TokenError};
