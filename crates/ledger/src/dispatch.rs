//! Selector-based call dispatch.
//!
//! Hosts that receive raw calls (a selector name, an attached value and JSON arguments)
//! route them here. Dispatch is default-deny:
//!
//! - no selector + attached value → implicit deposit (`ZeroAmount` when the value is 0)
//! - unknown selector → `UnsupportedOperation`, whatever value is attached
//! - value attached to anything but `deposit` → `NonPayable`

use core::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use capledger_core::{AccountId, Amount, Caller, LedgerError, LedgerResult};
use capledger_events::EventBus;

use crate::gateway::TransferGateway;
use crate::ledger::{LedgerCore, LedgerEnvelope, OperationReceipt};

/// Operations a ledger exposes to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Deposit,
    Withdraw,
    GetMyBalance,
    GetBalanceOf,
    GetTotalBalance,
    GetUserDepositsCount,
    GetUserWithdrawalsCount,
    GetCapacityLimit,
    GetWithdrawalLimit,
}

impl Selector {
    pub const ALL: [Selector; 9] = [
        Selector::Deposit,
        Selector::Withdraw,
        Selector::GetMyBalance,
        Selector::GetBalanceOf,
        Selector::GetTotalBalance,
        Selector::GetUserDepositsCount,
        Selector::GetUserWithdrawalsCount,
        Selector::GetCapacityLimit,
        Selector::GetWithdrawalLimit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Selector::Deposit => "deposit",
            Selector::Withdraw => "withdraw",
            Selector::GetMyBalance => "getMyBalance",
            Selector::GetBalanceOf => "getBalanceOf",
            Selector::GetTotalBalance => "getTotalBalance",
            Selector::GetUserDepositsCount => "getUserDepositsCount",
            Selector::GetUserWithdrawalsCount => "getUserWithdrawalsCount",
            Selector::GetCapacityLimit => "getCapacityLimit",
            Selector::GetWithdrawalLimit => "getWithdrawalLimit",
        }
    }

    /// Only deposits accept an attached value.
    pub fn is_payable(self) -> bool {
        matches!(self, Selector::Deposit)
    }
}

impl core::fmt::Display for Selector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Selector {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::ALL
            .into_iter()
            .find(|selector| selector.as_str() == s)
            .ok_or_else(|| LedgerError::unsupported(s))
    }
}

/// A raw call against the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Operation name; `None` for a bare value transfer.
    #[serde(default)]
    pub selector: Option<String>,
    /// Value attached to the call.
    #[serde(default)]
    pub value: Amount,
    /// Operation arguments, e.g. `{"amount": 10}` or `{"account": "<id>"}`.
    #[serde(default)]
    pub args: JsonValue,
}

impl Call {
    /// A bare value transfer with no selector.
    pub fn transfer(value: Amount) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    pub fn new(selector: impl Into<String>, args: JsonValue) -> Self {
        Self {
            selector: Some(selector.into()),
            value: 0,
            args,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Result of a dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallOutput {
    Receipt(OperationReceipt),
    Amount(Amount),
    Count(u64),
}

#[derive(Deserialize)]
struct AmountArgs {
    amount: Amount,
}

#[derive(Deserialize)]
struct AccountArgs {
    account: AccountId,
}

/// Route `call` to the matching ledger operation on behalf of `caller`.
pub fn dispatch<G, B>(
    ledger: &LedgerCore<G, B>,
    caller: &Caller,
    call: Call,
) -> LedgerResult<CallOutput>
where
    G: TransferGateway,
    B: EventBus<LedgerEnvelope>,
{
    let Some(name) = call.selector.as_deref() else {
        return ledger.deposit(caller, call.value).map(CallOutput::Receipt);
    };

    let selector = name.parse::<Selector>().inspect_err(|_| {
        tracing::warn!(selector = name, caller = %caller, "unsupported operation");
    })?;

    if call.value > 0 && !selector.is_payable() {
        return Err(LedgerError::NonPayable {
            operation: selector.to_string(),
        });
    }

    let output = match selector {
        Selector::Deposit => CallOutput::Receipt(ledger.deposit(caller, call.value)?),
        Selector::Withdraw => {
            let AmountArgs { amount } = decode_args(selector, call.args)?;
            CallOutput::Receipt(ledger.withdraw(caller, amount)?)
        }
        Selector::GetMyBalance => CallOutput::Amount(ledger.my_balance(caller)),
        Selector::GetBalanceOf => {
            let AccountArgs { account } = decode_args(selector, call.args)?;
            CallOutput::Amount(ledger.balance_of(account))
        }
        Selector::GetTotalBalance => CallOutput::Amount(ledger.total_balance()),
        Selector::GetUserDepositsCount => {
            let AccountArgs { account } = decode_args(selector, call.args)?;
            CallOutput::Count(ledger.deposit_count(account))
        }
        Selector::GetUserWithdrawalsCount => {
            let AccountArgs { account } = decode_args(selector, call.args)?;
            CallOutput::Count(ledger.withdrawal_count(account))
        }
        Selector::GetCapacityLimit => CallOutput::Amount(ledger.capacity_limit()),
        Selector::GetWithdrawalLimit => CallOutput::Amount(ledger.withdrawal_limit()),
    };

    Ok(output)
}

fn decode_args<T: DeserializeOwned>(selector: Selector, args: JsonValue) -> LedgerResult<T> {
    serde_json::from_value(args).map_err(|e| LedgerError::InvalidArguments {
        operation: selector.to_string(),
        reason: e.to_string(),
    })
}
