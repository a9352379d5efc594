//! `capledger-core`: ledger domain primitives.
//!
//! Identifiers, amounts, the caller identity handed in by the host boundary and the
//! error model shared by every other crate. No IO lives here.

pub mod aggregate;
pub mod caller;
pub mod error;
pub mod id;

pub use aggregate::AggregateRoot;
pub use caller::Caller;
pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, LedgerId};

/// Native-currency amount in its smallest indivisible unit.
pub type Amount = u64;
