use serde::{Deserialize, Serialize};

use capledger_core::{AccountId, Amount};
use capledger_ledger::Account;

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub value: Amount,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub account_id: AccountId,
    pub balance: Amount,
    pub deposit_count: u64,
    pub withdrawal_count: u64,
}

impl AccountView {
    pub fn new(account_id: AccountId, account: Account) -> Self {
        Self {
            account_id,
            balance: account.balance,
            deposit_count: account.deposit_count,
            withdrawal_count: account.withdrawal_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TotalsView {
    pub total_balance: Amount,
    pub in_flight: Amount,
    pub version: u64,
}

#[derive(Debug, Serialize)]
pub struct LimitsView {
    pub capacity_limit: Amount,
    pub withdrawal_limit: Amount,
}
