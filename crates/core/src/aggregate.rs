//! Aggregate root trait for ledger state.

/// Aggregate root marker + minimal interface.
///
/// The ledger is a single aggregate: every committed operation advances its version by
/// one, and that version doubles as the sequence number of the emitted event.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Number of operations committed so far. Aborted operations never advance it.
    fn version(&self) -> u64;
}
