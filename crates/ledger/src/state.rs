//! The ledger aggregate: balances, counters, limits and in-flight reservations.

use capledger_core::{AccountId, AggregateRoot, Amount, LedgerId, LedgerResult};

use crate::account_store::{Account, AccountStore};
use crate::config::LedgerConfig;

/// State of one deployed ledger.
///
/// Besides committed balances it tracks `in_flight`: amounts already debited for
/// withdrawals whose transfer has not confirmed yet. Capacity admission counts those
/// amounts as still held, so releasing a failed withdrawal can never push the aggregate
/// past the capacity limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    id: LedgerId,
    config: LedgerConfig,
    store: AccountStore,
    deposit_count: u64,
    withdrawal_count: u64,
    in_flight: Amount,
    version: u64,
}

impl LedgerState {
    pub fn new(id: LedgerId, config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self {
            id,
            config,
            store: AccountStore::new(),
            deposit_count: 0,
            withdrawal_count: 0,
            in_flight: 0,
            version: 0,
        })
    }

    pub fn config(&self) -> LedgerConfig {
        self.config
    }

    pub fn capacity_limit(&self) -> Amount {
        self.config.capacity_limit
    }

    pub fn withdrawal_limit(&self) -> Amount {
        self.config.withdrawal_limit
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.store
    }

    pub fn balance_of(&self, id: AccountId) -> Amount {
        self.store.balance_of(id)
    }

    /// Snapshot of an account; the zero record for unknown accounts.
    pub fn account(&self, id: AccountId) -> Account {
        self.store.account(id).copied().unwrap_or_default()
    }

    pub fn aggregate_balance(&self) -> Amount {
        self.store.aggregate_balance()
    }

    pub fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    pub fn withdrawal_count(&self) -> u64 {
        self.withdrawal_count
    }

    pub fn in_flight(&self) -> Amount {
        self.in_flight
    }

    /// Aggregate balance plus reserved withdrawals: the figure capacity is checked against.
    pub fn held_balance(&self) -> Amount {
        self.aggregate_balance().saturating_add(self.in_flight)
    }

    pub(crate) fn record_deposit(&mut self, account: AccountId, amount: Amount) -> Amount {
        let new_balance = self.store.credit(account, amount);
        self.store.bump_deposit_count(account);
        self.deposit_count += 1;
        self.version += 1;
        new_balance
    }

    /// Debit `amount` ahead of its transfer and hold it as in flight.
    pub(crate) fn reserve_withdrawal(&mut self, account: AccountId, amount: Amount) {
        self.store.debit(account, amount);
        self.in_flight += amount;
    }

    /// Transfer confirmed: the reservation becomes a withdrawal.
    pub(crate) fn commit_withdrawal(&mut self, account: AccountId, amount: Amount) -> Amount {
        self.in_flight -= amount;
        self.store.bump_withdrawal_count(account);
        self.withdrawal_count += 1;
        self.version += 1;
        self.store.balance_of(account)
    }

    /// Transfer failed: put the reserved amount back where it was.
    pub(crate) fn release_withdrawal(&mut self, account: AccountId, amount: Amount) -> Amount {
        self.in_flight -= amount;
        self.store.credit(account, amount)
    }

    /// Every broken invariant, described. Empty for a consistent state.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        let (balances, deposits, withdrawals) = self.store.iter().fold(
            (0u128, 0u64, 0u64),
            |(b, d, w), (_, account)| {
                (
                    b + u128::from(account.balance),
                    d + account.deposit_count,
                    w + account.withdrawal_count,
                )
            },
        );

        if balances != u128::from(self.aggregate_balance()) {
            violations.push(format!(
                "aggregate balance {} differs from sum of balances {balances}",
                self.aggregate_balance()
            ));
        }
        if u128::from(self.aggregate_balance()) + u128::from(self.in_flight)
            > u128::from(self.capacity_limit())
        {
            violations.push(format!(
                "held balance {} + {} exceeds capacity {}",
                self.aggregate_balance(),
                self.in_flight,
                self.capacity_limit()
            ));
        }
        if deposits != self.deposit_count {
            violations.push(format!(
                "global deposit count {} differs from per-account sum {deposits}",
                self.deposit_count
            ));
        }
        if withdrawals != self.withdrawal_count {
            violations.push(format!(
                "global withdrawal count {} differs from per-account sum {withdrawals}",
                self.withdrawal_count
            ));
        }

        violations
    }
}

impl AggregateRoot for LedgerState {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
