//! Session client
//!
//! Orchestrates the provider adapter into a single wallet session: connect,
//! refresh, disconnect, synchronous snapshots, and the notification bridge
//! that keeps the session consistent with wallet-originated events.
//!
//! One logical session per client. Clones share the same session; the
//! notification bridge is armed at construction and released exactly once on
//! teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use tokio::sync::{broadcast, oneshot, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Result, SessionError};
use crate::events::{BridgeGuard, SessionSignal, SignalSubscription};
use crate::provider::{
    AccountHandle, ProviderError, ProviderNotification, Query, WalletProvider,
};
use crate::session::{SessionStatus, WalletSession};

struct SessionState {
    session: WalletSession,
    /// Access granted by the wallet; survives partial read failures so a
    /// refresh can retry without re-prompting.
    handle: Option<AccountHandle>,
}

struct ClientInner {
    provider: Arc<dyn WalletProvider>,
    config: ClientConfig,
    state: RwLock<SessionState>,
    /// Serializes connect/refresh; `try_lock` failure surfaces as `Busy`.
    op_lock: Mutex<()>,
    /// Bumped on every teardown; in-flight results from an older epoch are
    /// discarded instead of committed.
    epoch: AtomicU64,
    signal_tx: broadcast::Sender<SessionSignal>,
    bridge: StdMutex<Option<BridgeGuard>>,
}

impl ClientInner {
    /// Apply `mutate` to the session state unless the epoch moved since
    /// `epoch` was captured. Returns whether the mutation was committed.
    fn commit(&self, epoch: u64, mutate: impl FnOnce(&mut SessionState)) -> bool {
        let mut state = self.state.write().expect("session state poisoned");
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        mutate(&mut state);
        true
    }

    /// Reset the session and bump the epoch, if anything was active.
    /// Returns whether there was an active session to invalidate.
    fn invalidate(&self) -> bool {
        let mut state = self.state.write().expect("session state poisoned");
        let active =
            state.handle.is_some() || state.session.status != SessionStatus::Disconnected;
        if active {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            state.handle = None;
            state.session.reset();
        }
        active
    }
}

/// Client for one wallet session against an injected provider.
///
/// The provider is a capability handed in at construction; the client never
/// reaches for global browser state. Cheap to clone; all clones share the
/// session and the notification bridge.
///
/// Must be constructed inside a tokio runtime: the notification bridge is
/// spawned as a background task.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<ClientInner>,
}

impl SessionClient {
    /// Create a client over `provider` and arm the notification bridge.
    pub fn new(provider: Arc<dyn WalletProvider>, config: ClientConfig) -> Self {
        let (signal_tx, _) = broadcast::channel(config.signal_capacity.max(1));
        let inner = Arc::new(ClientInner {
            state: RwLock::new(SessionState {
                session: WalletSession::disconnected(config.balance_format),
                handle: None,
            }),
            provider,
            config,
            op_lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
            signal_tx,
            bridge: StdMutex::new(None),
        });
        let client = Self { inner };
        client.ensure_bridge();
        client
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Synchronous snapshot of the current session. Never suspends.
    pub fn current_state(&self) -> WalletSession {
        self.inner
            .state
            .read()
            .expect("session state poisoned")
            .session
            .clone()
    }

    /// Subscribe to out-of-band session signals (`NetworkInvalidated`).
    pub fn signals(&self) -> SignalSubscription {
        SignalSubscription::new(self.inner.signal_tx.subscribe())
    }

    /// Establish a session: availability check, permission prompt, then
    /// address, network, and balance reads in sequence.
    ///
    /// Fails with [`SessionError::Busy`] if another connect or refresh is in
    /// flight. With no injected wallet it short-circuits before any prompt.
    /// If the address was obtained but a secondary read failed, the session
    /// keeps the partial data (status stays `Connected`) and the call
    /// returns [`SessionError::PartialRead`].
    pub async fn connect(&self) -> Result<WalletSession> {
        let inner = &self.inner;
        let _op = inner.op_lock.try_lock().map_err(|_| SessionError::Busy)?;

        if !inner.provider.is_available() {
            debug!("no injected wallet; connect short-circuits without prompting");
            return Err(ProviderError::Unavailable.into());
        }

        // Re-arm after an explicit disconnect tore the bridge down.
        self.ensure_bridge();

        let epoch = inner.epoch.load(Ordering::SeqCst);
        inner.commit(epoch, |s| s.session.status = SessionStatus::Connecting);

        info!("requesting wallet access");
        let handle = match inner.provider.request_access().await {
            Ok(handle) => handle,
            Err(err) => {
                warn!(error = %err, "wallet access not granted");
                match &err {
                    // The user declining is a user decision, not a session
                    // fault; the session returns to disconnected and a retry
                    // is allowed.
                    ProviderError::UserRejected | ProviderError::Unavailable => {
                        inner.commit(epoch, |s| s.session.reset());
                    }
                    ProviderError::Rpc { .. } => {
                        let reason = err.to_string();
                        inner.commit(epoch, |s| {
                            s.session.reset();
                            s.session.status = SessionStatus::Error(reason);
                        });
                    }
                }
                return Err(err.into());
            }
        };

        inner.commit(epoch, |s| s.handle = Some(handle));
        self.read_session(handle, epoch).await
    }

    /// Re-run the read-only queries against the already granted access,
    /// without re-prompting.
    pub async fn refresh(&self) -> Result<WalletSession> {
        let op = self.inner.op_lock.try_lock().map_err(|_| SessionError::Busy)?;
        self.refresh_locked(op).await
    }

    /// Bridge-side refresh: waits for an in-flight operation to finish
    /// instead of failing busy, so an account change that races a connect is
    /// applied right after it rather than lost.
    async fn refresh_queued(&self) -> Result<WalletSession> {
        let op = self.inner.op_lock.lock().await;
        self.refresh_locked(op).await
    }

    async fn refresh_locked(&self, _op: MutexGuard<'_, ()>) -> Result<WalletSession> {
        let inner = &self.inner;
        let handle = inner
            .state
            .read()
            .expect("session state poisoned")
            .handle
            .ok_or(SessionError::NotConnected)?;

        let epoch = inner.epoch.load(Ordering::SeqCst);
        debug!("refreshing wallet session");
        self.read_session(handle, epoch).await
    }

    /// Tear the session down: clear every field, discard in-flight results,
    /// release the notification bridge. No provider calls are made
    /// (wallet-side disconnection is not a provider operation).
    pub fn disconnect(&self) {
        self.inner.invalidate();
        if let Some(guard) = self
            .inner
            .bridge
            .lock()
            .expect("bridge slot poisoned")
            .take()
        {
            guard.cancel();
        }
        info!("wallet session disconnected");
    }

    /// Address, network, and balance reads in dependency order, then a
    /// single epoch-guarded commit.
    async fn read_session(&self, handle: AccountHandle, epoch: u64) -> Result<WalletSession> {
        let inner = &self.inner;

        let address = match inner.provider.address(handle).await {
            Ok(address) => address,
            Err(err) => {
                warn!(error = %err, "address read failed");
                let reason = err.to_string();
                inner.commit(epoch, |s| {
                    s.session.reset();
                    s.session.status = SessionStatus::Error(reason);
                });
                return Err(err.into());
            }
        };

        // Secondary reads fail independently; whatever succeeded is kept.
        let mut failed = Vec::new();
        let network = match inner.provider.network(handle).await {
            Ok(network) => Some(network),
            Err(err) => {
                failed.push((Query::Network, err));
                None
            }
        };
        let balance = match inner.provider.balance(handle, address).await {
            Ok(balance) => Some(balance),
            Err(err) => {
                failed.push((Query::Balance, err));
                None
            }
        };

        let network_for_log = network.clone();
        let committed = inner.commit(epoch, |s| {
            s.session.address = Some(address);
            s.session.network = network;
            s.session.balance_wei = balance;
            s.session.status = SessionStatus::Connected;
        });
        if !committed {
            debug!("late wallet reads discarded after teardown");
            return Err(SessionError::Cancelled);
        }

        if failed.is_empty() {
            info!(
                address = %address,
                network = network_for_log.as_ref().map(|n| n.name.as_str()),
                "wallet session established"
            );
            Ok(self.current_state())
        } else {
            warn!(
                address = %address,
                failures = failed.len(),
                "wallet session established with partial data"
            );
            Err(SessionError::PartialRead { address, failed })
        }
    }

    /// Spawn the notification bridge unless one is already armed.
    ///
    /// The task holds only a weak reference to the client, so dropping the
    /// last clone releases the subscription through [`BridgeGuard`].
    fn ensure_bridge(&self) {
        let mut slot = self.inner.bridge.lock().expect("bridge slot poisoned");
        if slot.is_some() {
            return;
        }

        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let mut notifications = self.inner.provider.notifications();
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        debug!("notification bridge released");
                        break;
                    }
                    notification = notifications.recv() => match notification {
                        Ok(notification) => {
                            let Some(inner) = weak.upgrade() else { break };
                            let client = SessionClient { inner };
                            client.handle_notification(notification).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "wallet notifications lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("provider notification feed closed");
                            break;
                        }
                    }
                }
            }
        });

        *slot = Some(BridgeGuard::new(cancel_tx));
    }

    async fn handle_notification(&self, notification: ProviderNotification) {
        match notification {
            ProviderNotification::AccountsChanged(accounts) if accounts.is_empty() => {
                // Access revoked wallet-side, or the user switched to no
                // account.
                if self.inner.invalidate() {
                    info!("wallet revoked account access; session disconnected");
                }
            }
            ProviderNotification::AccountsChanged(accounts) => {
                debug!(count = accounts.len(), "accounts changed; refreshing session");
                match self.refresh_queued().await {
                    Ok(_) => {}
                    Err(SessionError::NotConnected) => {
                        debug!("accounts changed before any session; ignored");
                    }
                    Err(err) => {
                        warn!(error = %err, "session refresh after account change failed");
                    }
                }
            }
            ProviderNotification::ChainChanged(chain_id) => {
                // Cached values are denominated in the old chain's currency.
                // Invalidate the whole session and let the host decide how
                // to recover; never patch fields in place.
                if self.inner.invalidate() {
                    info!(chain_id, "wallet switched chains; session invalidated");
                    let _ = self
                        .inner
                        .signal_tx
                        .send(SessionSignal::NetworkInvalidated { chain_id });
                } else {
                    debug!(chain_id, "chain change with no active session; ignored");
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("session", &self.current_state())
            .finish_non_exhaustive()
    }
}
