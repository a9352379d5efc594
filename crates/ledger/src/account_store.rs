//! Per-account balances and the aggregate-balance scalar.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use capledger_core::{AccountId, Amount};

/// Balance record of one account.
///
/// Created implicitly by the first credit and never removed, even at zero balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: Amount,
    pub deposit_count: u64,
    pub withdrawal_count: u64,
}

/// Account id → balance mapping, plus the running sum of all balances.
///
/// `credit` and `debit` are raw mutations. Admission (capacity, sufficiency) is the
/// caller's job; the store only guarantees that `aggregate_balance` always equals the
/// sum of the account balances. Debiting more than an account holds is a programming
/// error and panics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountStore {
    accounts: HashMap<AccountId, Account>,
    aggregate_balance: Amount,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `id`; zero for accounts the store has never seen.
    pub fn balance_of(&self, id: AccountId) -> Amount {
        self.accounts.get(&id).map(|a| a.balance).unwrap_or(0)
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn aggregate_balance(&self) -> Amount {
        self.aggregate_balance
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Account)> {
        self.accounts.iter()
    }

    /// Add `amount` to `id` and to the aggregate. Returns the new account balance.
    pub fn credit(&mut self, id: AccountId, amount: Amount) -> Amount {
        let Some(aggregate) = self.aggregate_balance.checked_add(amount) else {
            panic!("credit of {amount} overflows the aggregate balance");
        };

        let account = self.accounts.entry(id).or_default();
        account.balance += amount;
        self.aggregate_balance = aggregate;
        account.balance
    }

    /// Subtract `amount` from `id` and from the aggregate. Returns the new account balance.
    ///
    /// # Panics
    ///
    /// If `amount` exceeds the account's balance.
    pub fn debit(&mut self, id: AccountId, amount: Amount) -> Amount {
        let balance = self.balance_of(id);
        assert!(
            amount <= balance,
            "debit of {amount} exceeds balance {balance} of account {id}"
        );

        let Some(account) = self.accounts.get_mut(&id) else {
            // Only reachable for a zero debit of an unknown account.
            return 0;
        };
        account.balance -= amount;
        self.aggregate_balance -= amount;
        account.balance
    }

    pub(crate) fn bump_deposit_count(&mut self, id: AccountId) {
        self.accounts.entry(id).or_default().deposit_count += 1;
    }

    pub(crate) fn bump_withdrawal_count(&mut self, id: AccountId) {
        self.accounts.entry(id).or_default().withdrawal_count += 1;
    }
}
