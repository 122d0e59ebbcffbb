//! Scripted wallet provider for deterministic testing
//!
//! Stands in for a real injected wallet so session behavior can be exercised
//! without a browser or wallet extension: access can be approved or rejected,
//! individual reads can be scripted to fail or stall, and
//! `accountsChanged`/`chainChanged` notifications can be fired on demand.
//!
//! The simulator never talks to a chain; every answer comes from the
//! scripted state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use super::{AccountHandle, NetworkInfo, ProviderError, ProviderNotification, Query, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccessOutcome {
    Approve,
    Reject,
}

struct Scripted {
    address: Address,
    chain_id: u64,
    balance_wei: U256,
    access: AccessOutcome,
    /// Per-query failure messages; a scripted failure wins over the answer.
    failures: HashMap<Query, String>,
    /// Per-query artificial latency, for exercising in-flight races.
    delays: HashMap<Query, Duration>,
}

struct Inner {
    available: bool,
    scripted: Mutex<Scripted>,
    /// Times the permission prompt was shown to the "user".
    prompts: AtomicU32,
    next_handle: AtomicU64,
    notify_tx: broadcast::Sender<ProviderNotification>,
}

/// In-memory [`WalletProvider`] with programmable outcomes.
///
/// Cheap to clone; clones share the scripted state and the notification
/// channel.
#[derive(Clone)]
pub struct SimulatedWallet {
    inner: Arc<Inner>,
}

impl SimulatedWallet {
    /// An injected wallet that approves access and answers every read from
    /// the given account state.
    pub fn new(address: Address, chain_id: u64, balance_wei: U256) -> Self {
        let (notify_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                available: true,
                scripted: Mutex::new(Scripted {
                    address,
                    chain_id,
                    balance_wei,
                    access: AccessOutcome::Approve,
                    failures: HashMap::new(),
                    delays: HashMap::new(),
                }),
                prompts: AtomicU32::new(0),
                next_handle: AtomicU64::new(1),
                notify_tx,
            }),
        }
    }

    /// An environment with no injected wallet at all.
    pub fn unavailable() -> Self {
        let (notify_tx, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                available: false,
                scripted: Mutex::new(Scripted {
                    address: Address::ZERO,
                    chain_id: 1,
                    balance_wei: U256::ZERO,
                    access: AccessOutcome::Approve,
                    failures: HashMap::new(),
                    delays: HashMap::new(),
                }),
                prompts: AtomicU32::new(0),
                next_handle: AtomicU64::new(1),
                notify_tx,
            }),
        }
    }

    /// Script the user declining the permission prompt.
    pub fn reject_access(&self) {
        self.scripted().access = AccessOutcome::Reject;
    }

    /// Script the user approving the permission prompt (the default).
    pub fn approve_access(&self) {
        self.scripted().access = AccessOutcome::Approve;
    }

    /// Script `query` to fail with `message` until cleared.
    pub fn fail_query(&self, query: Query, message: impl Into<String>) {
        self.scripted().failures.insert(query, message.into());
    }

    /// Clear a scripted failure.
    pub fn clear_failure(&self, query: Query) {
        self.scripted().failures.remove(&query);
    }

    /// Script `query` to stall for `delay` before answering.
    pub fn delay_query(&self, query: Query, delay: Duration) {
        self.scripted().delays.insert(query, delay);
    }

    /// Replace the scripted account state.
    pub fn set_account(&self, address: Address, balance_wei: U256) {
        let mut s = self.scripted();
        s.address = address;
        s.balance_wei = balance_wei;
    }

    /// Replace the scripted chain without notifying subscribers.
    pub fn set_chain(&self, chain_id: u64) {
        self.scripted().chain_id = chain_id;
    }

    /// Fire an `accountsChanged` notification.
    pub fn emit_accounts_changed(&self, accounts: Vec<Address>) {
        let delivered = self
            .inner
            .notify_tx
            .send(ProviderNotification::AccountsChanged(accounts))
            .unwrap_or(0);
        debug!(subscribers = delivered, "simulated accountsChanged");
    }

    /// Switch the scripted chain and fire a `chainChanged` notification.
    pub fn emit_chain_changed(&self, chain_id: u64) {
        self.scripted().chain_id = chain_id;
        let delivered = self
            .inner
            .notify_tx
            .send(ProviderNotification::ChainChanged(chain_id))
            .unwrap_or(0);
        debug!(chain_id, subscribers = delivered, "simulated chainChanged");
    }

    /// How many times the permission prompt was shown.
    pub fn prompt_count(&self) -> u32 {
        self.inner.prompts.load(Ordering::SeqCst)
    }

    fn scripted(&self) -> std::sync::MutexGuard<'_, Scripted> {
        // Scripted state is plain data; a poisoned lock means a test
        // already panicked.
        self.inner.scripted.lock().expect("simulator state poisoned")
    }

    /// Apply scripted latency and failure for `query`, or hand back the
    /// prepared answer. The lock is released before sleeping.
    async fn answer<T>(&self, query: Query, value: T) -> Result<T, ProviderError> {
        let (delay, failure) = {
            let s = self.scripted();
            (s.delays.get(&query).copied(), s.failures.get(&query).cloned())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(message) => Err(ProviderError::rpc(query, message)),
            None => Ok(value),
        }
    }
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    fn is_available(&self) -> bool {
        self.inner.available
    }

    async fn request_access(&self) -> Result<AccountHandle, ProviderError> {
        if !self.inner.available {
            return Err(ProviderError::Unavailable);
        }

        // The prompt is a side effect of asking, not of the user's answer.
        self.inner.prompts.fetch_add(1, Ordering::SeqCst);

        let outcome = self.scripted().access;
        let handle = self
            .answer(
                Query::Access,
                AccountHandle::new(self.inner.next_handle.fetch_add(1, Ordering::SeqCst)),
            )
            .await?;

        match outcome {
            AccessOutcome::Approve => Ok(handle),
            AccessOutcome::Reject => Err(ProviderError::UserRejected),
        }
    }

    async fn address(&self, _handle: AccountHandle) -> Result<Address, ProviderError> {
        let address = self.scripted().address;
        self.answer(Query::Address, address).await
    }

    async fn network(&self, _handle: AccountHandle) -> Result<NetworkInfo, ProviderError> {
        let chain_id = self.scripted().chain_id;
        self.answer(Query::Network, NetworkInfo::from_chain_id(chain_id))
            .await
    }

    async fn balance(
        &self,
        _handle: AccountHandle,
        _address: Address,
    ) -> Result<U256, ProviderError> {
        let balance = self.scripted().balance_wei;
        self.answer(Query::Balance, balance).await
    }

    fn notifications(&self) -> broadcast::Receiver<ProviderNotification> {
        self.inner.notify_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn test_address() -> Address {
        Address::from_str("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap()
    }

    #[tokio::test]
    async fn approves_and_answers_reads() {
        let wallet = SimulatedWallet::new(test_address(), 1, U256::from(42u64));
        assert!(wallet.is_available());

        let handle = wallet.request_access().await.unwrap();
        assert_eq!(wallet.address(handle).await.unwrap(), test_address());
        assert_eq!(wallet.network(handle).await.unwrap().name, "mainnet");
        assert_eq!(
            wallet.balance(handle, test_address()).await.unwrap(),
            U256::from(42u64)
        );
        assert_eq!(wallet.prompt_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_wallet_never_prompts() {
        let wallet = SimulatedWallet::unavailable();
        assert!(!wallet.is_available());

        let err = wallet.request_access().await.unwrap_err();
        assert_eq!(err, ProviderError::Unavailable);
        assert_eq!(wallet.prompt_count(), 0);
    }

    #[tokio::test]
    async fn rejection_still_counts_the_prompt() {
        let wallet = SimulatedWallet::new(test_address(), 1, U256::ZERO);
        wallet.reject_access();

        let err = wallet.request_access().await.unwrap_err();
        assert_eq!(err, ProviderError::UserRejected);
        assert_eq!(wallet.prompt_count(), 1);
    }

    #[tokio::test]
    async fn scripted_failure_is_attributable() {
        let wallet = SimulatedWallet::new(test_address(), 1, U256::ZERO);
        wallet.fail_query(Query::Balance, "rpc timeout");

        let handle = wallet.request_access().await.unwrap();
        // Other reads are unaffected.
        assert!(wallet.network(handle).await.is_ok());

        let err = wallet.balance(handle, test_address()).await.unwrap_err();
        assert_eq!(err, ProviderError::rpc(Query::Balance, "rpc timeout"));

        wallet.clear_failure(Query::Balance);
        assert!(wallet.balance(handle, test_address()).await.is_ok());
    }

    #[tokio::test]
    async fn notifications_reach_subscribers() {
        let wallet = SimulatedWallet::new(test_address(), 1, U256::ZERO);
        let mut rx = wallet.notifications();

        wallet.emit_chain_changed(8453);
        match rx.recv().await.unwrap() {
            ProviderNotification::ChainChanged(id) => assert_eq!(id, 8453),
            other => panic!("unexpected notification: {other:?}"),
        }

        wallet.emit_accounts_changed(vec![]);
        match rx.recv().await.unwrap() {
            ProviderNotification::AccountsChanged(accounts) => assert!(accounts.is_empty()),
            other => panic!("unexpected notification: {other:?}"),
        }
    }
}
