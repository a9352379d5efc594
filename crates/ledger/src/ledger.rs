//! Deposit / withdraw orchestration.
//!
//! ```text
//! deposit:  positive → capacity → credit → counters → DepositRecorded
//! withdraw: positive → limit → sufficiency → reserve (debit) → transfer
//!             ├─ ok:  commit → counters → WithdrawalRecorded
//!             └─ err: release → TransferFailed
//! ```
//!
//! The debit happens before the transfer and the state lock is not held while the
//! gateway runs. A re-entrant or concurrent withdrawal for the same account therefore
//! sees the reduced balance and fails `InsufficientBalance` instead of spending twice.
//! Counters and events only move once the transfer has confirmed, so an aborted
//! withdrawal leaves nothing to compensate except the reservation itself.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;

use capledger_core::{
    AccountId, AggregateRoot, Amount, Caller, LedgerError, LedgerId, LedgerResult,
};
use capledger_events::{EventBus, EventEnvelope};

use crate::account_store::Account;
use crate::cap;
use crate::config::LedgerConfig;
use crate::event::{DepositRecorded, LedgerEvent, WithdrawalRecorded};
use crate::gateway::TransferGateway;
use crate::state::LedgerState;

/// Envelope type the ledger publishes.
pub type LedgerEnvelope = EventEnvelope<LedgerEvent>;

/// Outcome of a committed deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationReceipt {
    pub account_id: AccountId,
    pub amount: Amount,
    pub new_balance: Amount,
    /// Ledger version the operation committed at (also the event's sequence number).
    pub sequence_number: u64,
}

/// A ledger instance: owned state, the payout gateway and the event bus.
///
/// All operations take `&self`; state transitions serialize on an internal lock.
#[derive(Debug)]
pub struct LedgerCore<G, B> {
    ledger_id: LedgerId,
    state: RwLock<LedgerState>,
    gateway: G,
    bus: B,
}

impl<G, B> LedgerCore<G, B> {
    pub fn new(ledger_id: LedgerId, config: LedgerConfig, gateway: G, bus: B) -> LedgerResult<Self> {
        let state = LedgerState::new(ledger_id, config)?;
        tracing::info!(
            ledger = %ledger_id,
            capacity_limit = config.capacity_limit,
            withdrawal_limit = config.withdrawal_limit,
            "ledger created"
        );
        Ok(Self {
            ledger_id,
            state: RwLock::new(state),
            gateway,
            bus,
        })
    }

    pub fn id(&self) -> LedgerId {
        self.ledger_id
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn my_balance(&self, caller: &Caller) -> Amount {
        self.balance_of(caller.account_id())
    }

    pub fn balance_of(&self, account: AccountId) -> Amount {
        self.read().balance_of(account)
    }

    pub fn total_balance(&self) -> Amount {
        self.read().aggregate_balance()
    }

    pub fn deposit_count(&self, account: AccountId) -> u64 {
        self.read().account(account).deposit_count
    }

    pub fn withdrawal_count(&self, account: AccountId) -> u64 {
        self.read().account(account).withdrawal_count
    }

    pub fn account(&self, account: AccountId) -> Account {
        self.read().account(account)
    }

    pub fn capacity_limit(&self) -> Amount {
        self.read().capacity_limit()
    }

    pub fn withdrawal_limit(&self) -> Amount {
        self.read().withdrawal_limit()
    }

    /// Amount debited for withdrawals whose transfer is still running.
    pub fn in_flight(&self) -> Amount {
        self.read().in_flight()
    }

    pub fn version(&self) -> u64 {
        self.read().version()
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> LedgerState {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        write_state(&self.state)
    }
}

impl<G, B> LedgerCore<G, B>
where
    G: TransferGateway,
    B: EventBus<LedgerEnvelope>,
{
    /// Credit `amount` (the value attached to the call) to the caller's account.
    #[tracing::instrument(
        name = "ledger.deposit",
        skip_all,
        fields(ledger = %self.ledger_id, account = %caller, amount = amount)
    )]
    pub fn deposit(&self, caller: &Caller, amount: Amount) -> LedgerResult<OperationReceipt> {
        let account = caller.account_id();
        cap::check_positive_amount(amount).map_err(rejected)?;

        let mut state = self.write();
        cap::check_deposit(state.held_balance(), amount, state.capacity_limit()).map_err(rejected)?;

        let new_balance = state.record_deposit(account, amount);
        debug_assert!(state.invariant_violations().is_empty());

        let receipt = OperationReceipt {
            account_id: account,
            amount,
            new_balance,
            sequence_number: state.version(),
        };
        self.emit(
            receipt.sequence_number,
            LedgerEvent::DepositRecorded(DepositRecorded {
                account_id: account,
                amount,
                new_balance,
                occurred_at: Utc::now(),
            }),
        );

        tracing::info!(new_balance, total = state.aggregate_balance(), "deposit recorded");
        Ok(receipt)
    }

    /// Debit `amount` from the caller's account and pay it out through the gateway.
    ///
    /// If the transfer fails the debit is undone and `TransferFailed` is returned; the
    /// account looks exactly as it did before the call.
    #[tracing::instrument(
        name = "ledger.withdraw",
        skip_all,
        fields(ledger = %self.ledger_id, account = %caller, amount = amount)
    )]
    pub fn withdraw(&self, caller: &Caller, amount: Amount) -> LedgerResult<OperationReceipt> {
        let account = caller.account_id();
        cap::check_positive_amount(amount).map_err(rejected)?;

        let pending = {
            let mut state = self.write();
            cap::check_withdrawal_limit(amount, state.withdrawal_limit()).map_err(rejected)?;
            cap::check_sufficient_balance(account, state.balance_of(account), amount)
                .map_err(rejected)?;

            state.reserve_withdrawal(account, amount);
            PendingWithdrawal::new(&self.state, account, amount)
        };

        if let Err(err) = self.gateway.send(account, amount) {
            let restored = pending.release();
            tracing::warn!(error = %err, restored_balance = restored, "transfer failed; withdrawal rolled back");
            return Err(LedgerError::TransferFailed { account, amount });
        }

        let mut state = self.write();
        pending.disarm();
        let new_balance = state.commit_withdrawal(account, amount);
        debug_assert!(state.invariant_violations().is_empty());

        let receipt = OperationReceipt {
            account_id: account,
            amount,
            new_balance,
            sequence_number: state.version(),
        };
        self.emit(
            receipt.sequence_number,
            LedgerEvent::WithdrawalRecorded(WithdrawalRecorded {
                account_id: account,
                amount,
                new_balance,
                occurred_at: Utc::now(),
            }),
        );

        tracing::info!(new_balance, total = state.aggregate_balance(), "withdrawal recorded");
        Ok(receipt)
    }

    // Called with the state lock held so envelopes reach the bus in sequence order.
    fn emit(&self, sequence_number: u64, event: LedgerEvent) {
        let envelope = EventEnvelope::wrap(self.ledger_id, sequence_number, event);
        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(?err, sequence_number, "failed to publish ledger event");
        }
    }
}

fn rejected(err: LedgerError) -> LedgerError {
    tracing::warn!(error = %err, code = err.code(), "operation rejected");
    err
}

fn write_state(state: &RwLock<LedgerState>) -> RwLockWriteGuard<'_, LedgerState> {
    state.write().unwrap_or_else(PoisonError::into_inner)
}

/// A withdrawal whose amount is reserved but whose transfer has not settled.
///
/// Dropping it without `disarm` (early return, panic inside the gateway) releases the
/// reservation.
struct PendingWithdrawal<'a> {
    state: &'a RwLock<LedgerState>,
    account: AccountId,
    amount: Amount,
    settled: bool,
}

impl<'a> PendingWithdrawal<'a> {
    fn new(state: &'a RwLock<LedgerState>, account: AccountId, amount: Amount) -> Self {
        Self {
            state,
            account,
            amount,
            settled: false,
        }
    }

    /// The caller committed the reservation itself (and holds the lock).
    fn disarm(mut self) {
        self.settled = true;
    }

    /// Put the reserved amount back. Returns the restored balance.
    fn release(mut self) -> Amount {
        self.settled = true;
        write_state(self.state).release_withdrawal(self.account, self.amount)
    }
}

impl Drop for PendingWithdrawal<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::error!(
            account = %self.account,
            amount = self.amount,
            "withdrawal abandoned mid-transfer; releasing reservation"
        );
        write_state(self.state).release_withdrawal(self.account, self.amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::{Arc, Mutex, OnceLock, Weak};

    use capledger_events::InMemoryEventBus;
    use proptest::prelude::*;

    use crate::gateway::{InMemoryTransferGateway, TransferError};

    type TestBus = Arc<InMemoryEventBus<LedgerEnvelope>>;
    type TestLedger = LedgerCore<Arc<InMemoryTransferGateway>, TestBus>;

    fn ledger_with(capacity: Amount, withdrawal_limit: Amount) -> TestLedger {
        LedgerCore::new(
            LedgerId::new(),
            LedgerConfig::new(capacity).with_withdrawal_limit(withdrawal_limit),
            Arc::new(InMemoryTransferGateway::new()),
            Arc::new(InMemoryEventBus::recording()),
        )
        .unwrap()
    }

    fn caller() -> Caller {
        Caller::authenticated(AccountId::new())
    }

    type Hook = Box<dyn Fn(&HookLedger, AccountId, Amount) -> Result<(), TransferError> + Send + Sync>;
    type HookLedger = LedgerCore<Arc<HookGateway>, TestBus>;

    /// Gateway that runs a closure against the ledger it pays out for.
    struct HookGateway {
        ledger: OnceLock<Weak<HookLedger>>,
        hook: Hook,
    }

    impl TransferGateway for HookGateway {
        fn send(&self, account: AccountId, amount: Amount) -> Result<(), TransferError> {
            let ledger = self
                .ledger
                .get()
                .and_then(Weak::upgrade)
                .ok_or_else(|| TransferError::Unavailable("ledger dropped".to_string()))?;
            (self.hook)(&ledger, account, amount)
        }
    }

    fn hooked_ledger(
        capacity: Amount,
        hook: impl Fn(&HookLedger, AccountId, Amount) -> Result<(), TransferError> + Send + Sync + 'static,
    ) -> Arc<HookLedger> {
        let gateway = Arc::new(HookGateway {
            ledger: OnceLock::new(),
            hook: Box::new(hook),
        });
        let ledger = Arc::new(
            LedgerCore::new(
                LedgerId::new(),
                LedgerConfig::new(capacity),
                gateway.clone(),
                Arc::new(InMemoryEventBus::recording()),
            )
            .unwrap(),
        );
        let _ = gateway.ledger.set(Arc::downgrade(&ledger));
        ledger
    }

    #[test]
    fn reference_scenario() {
        let ledger = ledger_with(10_000, 5_000);
        let a = caller();
        let b = caller();

        ledger.deposit(&a, 6_000).unwrap();
        assert_eq!(ledger.balance_of(a.account_id()), 6_000);
        assert_eq!(ledger.total_balance(), 6_000);

        assert_eq!(
            ledger.deposit(&b, 5_000),
            Err(LedgerError::CapacityExceeded {
                attempted: 11_000,
                limit: 10_000
            })
        );

        let receipt = ledger.withdraw(&a, 4_999).unwrap();
        assert_eq!(receipt.new_balance, 1_001);
        assert_eq!(ledger.my_balance(&a), 1_001);

        assert_eq!(
            ledger.withdraw(&a, 5_001),
            Err(LedgerError::WithdrawalLimitExceeded {
                requested: 5_001,
                limit: 5_000
            })
        );
        assert_eq!(ledger.gateway().delivered_to(a.account_id()), 4_999);
    }

    #[test]
    fn deposit_up_to_capacity_succeeds_and_one_more_fails() {
        let ledger = ledger_with(1_000, 500);
        let a = caller();

        ledger.deposit(&a, 999).unwrap();
        ledger.deposit(&a, 1).unwrap();
        assert_eq!(ledger.total_balance(), 1_000);

        assert_eq!(
            ledger.deposit(&caller(), 1),
            Err(LedgerError::CapacityExceeded {
                attempted: 1_001,
                limit: 1_000
            })
        );
    }

    #[test]
    fn deposit_moves_balance_total_and_counters_by_exactly_one_operation() {
        let ledger = ledger_with(10_000, 5_000);
        let a = caller();
        ledger.deposit(&a, 100).unwrap();

        let receipt = ledger.deposit(&a, 250).unwrap();

        assert_eq!(receipt.new_balance, 350);
        assert_eq!(receipt.sequence_number, 2);
        assert_eq!(ledger.total_balance(), 350);
        assert_eq!(ledger.deposit_count(a.account_id()), 2);
        assert_eq!(ledger.snapshot().deposit_count(), 2);
    }

    #[test]
    fn zero_amounts_are_refused_without_side_effects() {
        let ledger = ledger_with(10_000, 5_000);
        let a = caller();

        assert_eq!(ledger.deposit(&a, 0), Err(LedgerError::ZeroAmount));
        assert_eq!(ledger.withdraw(&a, 0), Err(LedgerError::ZeroAmount));
        assert_eq!(ledger.version(), 0);
        assert!(ledger.snapshot().accounts().is_empty());
    }

    #[test]
    fn withdrawal_under_limit_still_needs_sufficient_balance() {
        let ledger = ledger_with(10_000, 5_000);
        let a = caller();
        ledger.deposit(&a, 100).unwrap();

        assert_eq!(
            ledger.withdraw(&a, 101),
            Err(LedgerError::InsufficientBalance {
                account: a.account_id(),
                balance: 100,
                requested: 101
            })
        );
        assert_eq!(ledger.balance_of(a.account_id()), 100);
    }

    #[test]
    fn withdrawal_limit_applies_regardless_of_balance() {
        let ledger = ledger_with(100_000, 5_000);
        let a = caller();
        ledger.deposit(&a, 50_000).unwrap();

        assert!(matches!(
            ledger.withdraw(&a, 5_001),
            Err(LedgerError::WithdrawalLimitExceeded { .. })
        ));
    }

    #[test]
    fn withdrawing_whole_balance_leaves_zero_account_in_place() {
        let ledger = ledger_with(10_000, 5_000);
        let a = caller();
        ledger.deposit(&a, 300).unwrap();

        let receipt = ledger.withdraw(&a, 300).unwrap();

        assert_eq!(receipt.new_balance, 0);
        assert_eq!(ledger.withdrawal_count(a.account_id()), 1);
        assert_eq!(ledger.account(a.account_id()).deposit_count, 1);
        assert_eq!(ledger.snapshot().accounts().len(), 1);
    }

    #[test]
    fn failed_transfer_leaves_state_untouched() {
        let ledger = ledger_with(10_000, 5_000);
        let a = caller();
        ledger.deposit(&a, 2_000).unwrap();
        ledger.gateway().reject(a.account_id());
        let before = ledger.snapshot();

        assert_eq!(
            ledger.withdraw(&a, 1_500),
            Err(LedgerError::TransferFailed {
                account: a.account_id(),
                amount: 1_500
            })
        );

        assert_eq!(ledger.snapshot(), before);
        assert_eq!(ledger.in_flight(), 0);
        assert_eq!(ledger.withdrawal_count(a.account_id()), 0);
        assert_eq!(ledger.bus().published().len(), 1);
    }

    #[test]
    fn committed_operations_are_published_in_sequence() {
        let ledger = ledger_with(10_000, 5_000);
        let sub = ledger.bus().subscribe();
        let a = caller();

        ledger.deposit(&a, 700).unwrap();
        ledger.withdraw(&a, 200).unwrap();

        let envelopes = sub.drain();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].sequence_number(), 1);
        assert_eq!(envelopes[0].event_type(), "ledger.deposit_recorded");
        assert_eq!(envelopes[1].sequence_number(), 2);
        assert_eq!(envelopes[1].ledger_id(), ledger.id());
        match envelopes[1].payload() {
            LedgerEvent::WithdrawalRecorded(e) => {
                assert_eq!(e.account_id, a.account_id());
                assert_eq!(e.amount, 200);
                assert_eq!(e.new_balance, 500);
            }
            other => panic!("expected withdrawal event, got {other:?}"),
        }
    }

    #[test]
    fn reentrant_withdrawal_sees_debited_balance() {
        let inner_results = Arc::new(Mutex::new(Vec::new()));
        let recorded = inner_results.clone();
        let ledger = hooked_ledger(10_000, move |ledger, account, amount| {
            let again = ledger.withdraw(&Caller::authenticated(account), amount);
            recorded.lock().unwrap().push(again);
            Ok(())
        });
        let a = caller();
        ledger.deposit(&a, 1_000).unwrap();

        let receipt = ledger.withdraw(&a, 1_000).unwrap();

        assert_eq!(receipt.new_balance, 0);
        assert_eq!(
            inner_results.lock().unwrap().as_slice(),
            &[Err(LedgerError::InsufficientBalance {
                account: a.account_id(),
                balance: 0,
                requested: 1_000
            })]
        );
        assert_eq!(ledger.withdrawal_count(a.account_id()), 1);
        assert!(ledger.snapshot().invariant_violations().is_empty());
    }

    #[test]
    fn deposits_cannot_use_capacity_held_by_in_flight_withdrawal() {
        let inner_results = Arc::new(Mutex::new(Vec::new()));
        let recorded = inner_results.clone();
        let b = caller();
        let ledger = hooked_ledger(100, move |ledger, account, _amount| {
            assert_eq!(ledger.in_flight(), 40);
            recorded.lock().unwrap().push(ledger.deposit(&b, 40));
            Err(TransferError::Rejected { account })
        });
        let a = caller();
        ledger.deposit(&a, 100).unwrap();

        assert!(matches!(
            ledger.withdraw(&a, 40),
            Err(LedgerError::TransferFailed { amount: 40, .. })
        ));

        assert_eq!(
            inner_results.lock().unwrap().as_slice(),
            &[Err(LedgerError::CapacityExceeded {
                attempted: 140,
                limit: 100
            })]
        );
        assert_eq!(ledger.balance_of(a.account_id()), 100);
        assert_eq!(ledger.total_balance(), 100);
        assert!(ledger.snapshot().invariant_violations().is_empty());
    }

    #[test]
    fn panicking_gateway_releases_the_reservation() {
        let ledger = hooked_ledger(10_000, |_ledger, _account, _amount| {
            panic!("gateway blew up");
        });
        let a = caller();
        ledger.deposit(&a, 800).unwrap();

        let outcome = catch_unwind(AssertUnwindSafe(|| ledger.withdraw(&a, 300)));

        assert!(outcome.is_err());
        assert_eq!(ledger.balance_of(a.account_id()), 800);
        assert_eq!(ledger.in_flight(), 0);
        assert_eq!(ledger.version(), 1);
    }

    #[test]
    fn zero_capacity_fails_construction() {
        let result = LedgerCore::new(
            LedgerId::new(),
            LedgerConfig::new(0),
            InMemoryTransferGateway::new(),
            InMemoryEventBus::<LedgerEnvelope>::recording(),
        );
        assert!(matches!(result, Err(LedgerError::InvalidConfiguration(_))));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Deposit(usize, Amount),
        Withdraw(usize, Amount),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, 0 as Amount..4_000).prop_map(|(who, amount)| Op::Deposit(who, amount)),
            (0usize..3, 0 as Amount..6_000).prop_map(|(who, amount)| Op::Withdraw(who, amount)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever the sequence of operations, every reachable state is
        /// consistent, successful operations move exactly their amount, and failed ones
        /// change nothing.
        #[test]
        fn every_reachable_state_is_consistent(ops in prop::collection::vec(op(), 1..40)) {
            let ledger = ledger_with(10_000, 5_000);
            let callers: Vec<Caller> = (0..3).map(|_| caller()).collect();
            // The third account can never receive a payout.
            ledger.gateway().reject(callers[2].account_id());

            for op in ops {
                let before = ledger.snapshot();
                let (who, result, signed): (usize, _, i128) = match op {
                    Op::Deposit(who, amount) => (who, ledger.deposit(&callers[who], amount), i128::from(amount)),
                    Op::Withdraw(who, amount) => (who, ledger.withdraw(&callers[who], amount), -i128::from(amount)),
                };
                let after = ledger.snapshot();
                let account = callers[who].account_id();

                prop_assert!(after.invariant_violations().is_empty(), "{:?}", after.invariant_violations());
                prop_assert_eq!(after.in_flight(), 0);

                match result {
                    Ok(receipt) => {
                        prop_assert_eq!(after.version(), before.version() + 1);
                        prop_assert_eq!(
                            i128::from(after.balance_of(account)),
                            i128::from(before.balance_of(account)) + signed
                        );
                        prop_assert_eq!(
                            i128::from(after.aggregate_balance()),
                            i128::from(before.aggregate_balance()) + signed
                        );
                        prop_assert_eq!(receipt.new_balance, after.balance_of(account));
                    }
                    Err(_) => {
                        prop_assert_eq!(&after, &before);
                    }
                }
            }

            prop_assert_eq!(ledger.withdrawal_count(callers[2].account_id()), 0);
        }
    }
}
