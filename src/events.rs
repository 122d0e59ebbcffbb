//! Session signals and subscription handles
//!
//! The client re-emits wallet-originated invalidations to the UI collaborator
//! as [`SessionSignal`]s over a broadcast channel. [`SignalSubscription`] is
//! the receiving end; [`BridgeGuard`] is the RAII handle that cancels the
//! internal notification-bridge task exactly once, whether torn down
//! explicitly or by drop.

use tokio::sync::{broadcast, oneshot};
use tracing::debug;

/// Out-of-band signal to the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The wallet switched chains. The session was invalidated because every
    /// cached value was denominated in the old chain's currency; the host
    /// decides how to recover (usually by re-initializing and reconnecting).
    NetworkInvalidated { chain_id: u64 },
}

/// Receiving end of the client's signal channel.
///
/// Dropping the subscription stops delivery; the channel itself lives as
/// long as the client.
pub struct SignalSubscription {
    rx: broadcast::Receiver<SessionSignal>,
}

impl SignalSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<SessionSignal>) -> Self {
        Self { rx }
    }

    /// Next signal, or `None` once the client is gone.
    ///
    /// A slow subscriber that lags behind the channel capacity skips the
    /// overwritten signals and keeps receiving from the oldest retained one.
    pub async fn recv(&mut self) -> Option<SessionSignal> {
        loop {
            match self.rx.recv().await {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "signal subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Explicitly stop receiving signals, equivalent to dropping the
    /// subscription.
    pub fn unsubscribe(self) {}

    /// Non-blocking poll for a pending signal.
    pub fn try_recv(&mut self) -> Option<SessionSignal> {
        loop {
            match self.rx.try_recv() {
                Ok(signal) => return Some(signal),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "signal subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}

impl std::fmt::Debug for SignalSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalSubscription").finish_non_exhaustive()
    }
}

/// Cancels the notification-bridge task when dropped.
///
/// The sender is taken out on first use, so cancellation fires exactly once
/// even if an explicit teardown races the drop.
pub(crate) struct BridgeGuard {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl BridgeGuard {
    pub(crate) fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Explicitly cancel the bridge, equivalent to dropping the guard.
    pub(crate) fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            // The task may already have exited; a dead receiver is fine.
            let _ = tx.send(());
        }
    }
}

impl Drop for BridgeGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_receives_signals_in_order() {
        let (tx, rx) = broadcast::channel(16);
        let mut sub = SignalSubscription::new(rx);

        tx.send(SessionSignal::NetworkInvalidated { chain_id: 10 }).unwrap();
        tx.send(SessionSignal::NetworkInvalidated { chain_id: 8453 }).unwrap();

        assert_eq!(
            sub.recv().await,
            Some(SessionSignal::NetworkInvalidated { chain_id: 10 })
        );
        assert_eq!(
            sub.recv().await,
            Some(SessionSignal::NetworkInvalidated { chain_id: 8453 })
        );
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn subscription_ends_when_sender_is_gone() {
        let (tx, rx) = broadcast::channel::<SessionSignal>(16);
        let mut sub = SignalSubscription::new(rx);
        drop(tx);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn lagged_subscriber_catches_up() {
        let (tx, rx) = broadcast::channel(1);
        let mut sub = SignalSubscription::new(rx);

        tx.send(SessionSignal::NetworkInvalidated { chain_id: 1 }).unwrap();
        tx.send(SessionSignal::NetworkInvalidated { chain_id: 2 }).unwrap();

        // Capacity 1: the first signal was overwritten, the second survives.
        assert_eq!(
            sub.recv().await,
            Some(SessionSignal::NetworkInvalidated { chain_id: 2 })
        );
    }

    #[tokio::test]
    async fn unsubscribe_releases_the_receiver() {
        let (tx, rx) = broadcast::channel(4);
        SignalSubscription::new(rx).unsubscribe();

        // No receivers left, but the channel itself stays usable for later
        // subscribers.
        assert!(tx
            .send(SessionSignal::NetworkInvalidated { chain_id: 1 })
            .is_err());
        let mut sub = SignalSubscription::new(tx.subscribe());
        tx.send(SessionSignal::NetworkInvalidated { chain_id: 2 }).unwrap();
        assert_eq!(
            sub.recv().await,
            Some(SessionSignal::NetworkInvalidated { chain_id: 2 })
        );
    }

    #[tokio::test]
    async fn guard_fires_cancellation_once() {
        let (tx, rx) = oneshot::channel();
        let guard = BridgeGuard::new(tx);
        guard.cancel();
        assert!(rx.await.is_ok());

        // Cancelling after the receiver is gone is a no-op.
        let (tx, rx) = oneshot::channel();
        drop(rx);
        BridgeGuard::new(tx).cancel();
    }
}
