//! Stateless admission checks.
//!
//! Each check is a predicate over current totals and a proposed amount. They run before
//! any mutation, so a failing check never leaves partial state behind.

use capledger_core::{AccountId, Amount, LedgerError, LedgerResult};

/// Amounts must be strictly positive.
pub fn check_positive_amount(amount: Amount) -> LedgerResult<()> {
    if amount == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    Ok(())
}

/// A deposit may not push the aggregate balance past `capacity_limit`.
///
/// Overflow counts as exceeding the limit; `attempted` saturates at `Amount::MAX`.
pub fn check_deposit(aggregate: Amount, amount: Amount, capacity_limit: Amount) -> LedgerResult<()> {
    match aggregate.checked_add(amount) {
        Some(attempted) if attempted <= capacity_limit => Ok(()),
        Some(attempted) => Err(LedgerError::CapacityExceeded {
            attempted,
            limit: capacity_limit,
        }),
        None => Err(LedgerError::CapacityExceeded {
            attempted: Amount::MAX,
            limit: capacity_limit,
        }),
    }
}

/// A single withdrawal may not move more than `limit`, whatever the balance.
pub fn check_withdrawal_limit(amount: Amount, limit: Amount) -> LedgerResult<()> {
    if amount > limit {
        return Err(LedgerError::WithdrawalLimitExceeded {
            requested: amount,
            limit,
        });
    }
    Ok(())
}

pub fn check_sufficient_balance(account: AccountId, balance: Amount, amount: Amount) -> LedgerResult<()> {
    if amount > balance {
        return Err(LedgerError::InsufficientBalance {
            account,
            balance,
            requested: amount,
        });
    }
    Ok(())
}
