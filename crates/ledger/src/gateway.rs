//! Outbound value transfer boundary.
//!
//! The gateway is the only step of an operation that depends on something outside the
//! ledger. Ordinary delivery failures come back as a typed [`TransferError`] so the
//! ledger can undo the withdrawal deterministically.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use capledger_core::{AccountId, Amount};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The recipient refused to accept the value.
    #[error("recipient {account} rejected the transfer")]
    Rejected { account: AccountId },

    /// The transfer could not be attempted at all.
    #[error("transfer channel unavailable: {0}")]
    Unavailable(String),
}

/// Hands withdrawn value over to the account's external address.
///
/// Implementations must return an error rather than panic on delivery failure. The
/// ledger calls `send` without holding its state lock, so an implementation may call
/// back into the ledger.
pub trait TransferGateway: Send + Sync {
    fn send(&self, account: AccountId, amount: Amount) -> Result<(), TransferError>;
}

impl<G> TransferGateway for Arc<G>
where
    G: TransferGateway + ?Sized,
{
    fn send(&self, account: AccountId, amount: Amount) -> Result<(), TransferError> {
        (**self).send(account, amount)
    }
}

/// In-memory gateway that credits external wallets held in a map.
///
/// Recipients can be told to reject transfers, and the whole channel can be taken
/// offline, which is how tests and dev hosts exercise the failure path.
#[derive(Debug, Default)]
pub struct InMemoryTransferGateway {
    wallets: RwLock<HashMap<AccountId, Amount>>,
    rejecting: RwLock<HashSet<AccountId>>,
    offline: AtomicBool,
}

impl InMemoryTransferGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `account` refuse every subsequent transfer.
    pub fn reject(&self, account: AccountId) {
        if let Ok(mut rejecting) = self.rejecting.write() {
            rejecting.insert(account);
        }
    }

    pub fn accept(&self, account: AccountId) {
        if let Ok(mut rejecting) = self.rejecting.write() {
            rejecting.remove(&account);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Total value delivered to `account` so far.
    pub fn delivered_to(&self, account: AccountId) -> Amount {
        self.wallets
            .read()
            .ok()
            .and_then(|w| w.get(&account).copied())
            .unwrap_or(0)
    }

    pub fn total_delivered(&self) -> Amount {
        self.wallets
            .read()
            .map(|w| w.values().copied().fold(0, Amount::saturating_add))
            .unwrap_or(0)
    }
}

impl TransferGateway for InMemoryTransferGateway {
    fn send(&self, account: AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransferError::Unavailable("gateway offline".to_string()));
        }

        let rejecting = self
            .rejecting
            .read()
            .map_err(|_| TransferError::Unavailable("lock poisoned".to_string()))?;
        if rejecting.contains(&account) {
            return Err(TransferError::Rejected { account });
        }
        drop(rejecting);

        let mut wallets = self
            .wallets
            .write()
            .map_err(|_| TransferError::Unavailable("lock poisoned".to_string()))?;
        let wallet = wallets.entry(account).or_default();
        *wallet = wallet.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_amounts_accumulate_per_account() {
        let gateway = InMemoryTransferGateway::new();
        let a = AccountId::new();
        let b = AccountId::new();

        gateway.send(a, 10).unwrap();
        gateway.send(a, 5).unwrap();
        gateway.send(b, 1).unwrap();

        assert_eq!(gateway.delivered_to(a), 15);
        assert_eq!(gateway.delivered_to(b), 1);
        assert_eq!(gateway.total_delivered(), 16);
    }

    #[test]
    fn rejecting_recipient_gets_nothing() {
        let gateway = InMemoryTransferGateway::new();
        let a = AccountId::new();
        gateway.reject(a);

        assert_eq!(gateway.send(a, 10), Err(TransferError::Rejected { account: a }));
        assert_eq!(gateway.delivered_to(a), 0);

        gateway.accept(a);
        assert!(gateway.send(a, 10).is_ok());
    }

    #[test]
    fn offline_gateway_reports_unavailable() {
        let gateway = InMemoryTransferGateway::new();
        gateway.set_offline(true);
        assert!(matches!(
            gateway.send(AccountId::new(), 1),
            Err(TransferError::Unavailable(_))
        ));
    }
}
