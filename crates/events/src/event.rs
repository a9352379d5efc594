use chrono::{DateTime, Utc};

use capledger_core::AccountId;

/// A ledger event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - **account-scoped**: each one concerns exactly one account, which lets
///   transports filter a stream down to a single caller
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "ledger.deposit_recorded").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the operation committed.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// The account whose balance the event describes.
    fn account_id(&self) -> AccountId;
}
