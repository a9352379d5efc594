//! Custodial single-asset ledger.
//!
//! Pure state-transition logic plus the two seams it talks through: the
//! [`TransferGateway`] that pays out withdrawals and the event bus that observers
//! subscribe to. No HTTP, no persistence.
//!
//! ```text
//! caller → LedgerCore::deposit / withdraw
//!            → cap checks → AccountStore mutation → TransferGateway (withdraw only)
//!            → counters + DepositRecorded / WithdrawalRecorded
//! ```

pub mod account_store;
pub mod cap;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod gateway;
pub mod ledger;
pub mod state;

pub use account_store::{Account, AccountStore};
pub use config::{DEFAULT_WITHDRAWAL_LIMIT, LedgerConfig};
pub use dispatch::{Call, CallOutput, Selector, dispatch};
pub use event::{DepositRecorded, LedgerEvent, WithdrawalRecorded};
pub use gateway::{InMemoryTransferGateway, TransferError, TransferGateway};
pub use ledger::{LedgerCore, LedgerEnvelope, OperationReceipt};
pub use state::LedgerState;
