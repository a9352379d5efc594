use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use capledger_core::{AccountId, Amount};
use capledger_events::Event;

/// Event: DepositRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecorded {
    pub account_id: AccountId,
    pub amount: Amount,
    pub new_balance: Amount,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WithdrawalRecorded. Emitted only once the payout transfer has succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRecorded {
    pub account_id: AccountId,
    pub amount: Amount,
    pub new_balance: Amount,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    DepositRecorded(DepositRecorded),
    WithdrawalRecorded(WithdrawalRecorded),
}

impl LedgerEvent {
    pub fn amount(&self) -> Amount {
        match self {
            LedgerEvent::DepositRecorded(e) => e.amount,
            LedgerEvent::WithdrawalRecorded(e) => e.amount,
        }
    }

    pub fn new_balance(&self) -> Amount {
        match self {
            LedgerEvent::DepositRecorded(e) => e.new_balance,
            LedgerEvent::WithdrawalRecorded(e) => e.new_balance,
        }
    }
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::DepositRecorded(_) => "ledger.deposit_recorded",
            LedgerEvent::WithdrawalRecorded(_) => "ledger.withdrawal_recorded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::DepositRecorded(e) => e.occurred_at,
            LedgerEvent::WithdrawalRecorded(e) => e.occurred_at,
        }
    }

    fn account_id(&self) -> AccountId {
        match self {
            LedgerEvent::DepositRecorded(e) => e.account_id,
            LedgerEvent::WithdrawalRecorded(e) => e.account_id,
        }
    }
}
