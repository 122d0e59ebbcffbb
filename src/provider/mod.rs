//! Provider adapter layer
//!
//! Wraps the browser-injected wallet object behind the [`WalletProvider`]
//! trait so the session client never touches global browser state directly.
//! Any concrete wallet implementing the same capability set is
//! interchangeable; [`SimulatedWallet`] is the in-memory implementation used
//! for tests and offline runs.

mod simulator;

pub use simulator::SimulatedWallet;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::KnownChain;

/// Opaque proof that the wallet granted account access.
///
/// Issued by [`WalletProvider::request_access`] and required by every
/// subsequent read, so a read cannot be issued before the permission prompt
/// has been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountHandle(u64);

impl AccountHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

/// The read-only queries a provider answers, used to attribute failures
/// to the specific call that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Access,
    Address,
    Network,
    Balance,
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Query::Access => "access request",
            Query::Address => "address",
            Query::Network => "network",
            Query::Balance => "balance",
        };
        f.write_str(name)
    }
}

/// Errors originating in the wallet provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("no injected wallet is available in this environment")]
    Unavailable,

    #[error("the user rejected the connection request")]
    UserRejected,

    #[error("{query} query failed: {message}")]
    Rpc { query: Query, message: String },
}

impl ProviderError {
    /// Attributable transport/RPC failure for a specific query
    pub fn rpc(query: Query, message: impl Into<String>) -> Self {
        Self::Rpc {
            query,
            message: message.into(),
        }
    }
}

/// Chain identity as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub name: String,
}

impl NetworkInfo {
    /// Build from a raw chain id, naming chains the client recognizes and
    /// falling back to `"unknown"` otherwise (ethers-style).
    pub fn from_chain_id(chain_id: u64) -> Self {
        let name = KnownChain::from_chain_id(chain_id)
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Self { chain_id, name }
    }
}

impl std::fmt::Display for NetworkInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (chain {})", self.name, self.chain_id)
    }
}

/// Wallet-originated notifications delivered over the provider's
/// subscription feed.
#[derive(Debug, Clone)]
pub enum ProviderNotification {
    /// The authorized account list changed; empty means access was revoked.
    AccountsChanged(Vec<Address>),
    /// The wallet switched to another chain.
    ChainChanged(u64),
}

/// Normalized handle over an injected wallet object.
///
/// All async operations are cancel-safe: dropping the returned future
/// abandons the call without further effect on the caller. Each read fails
/// independently and attributes the failure to its own [`Query`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// True iff the host environment exposes an injected wallet object.
    fn is_available(&self) -> bool;

    /// Trigger the wallet's permission prompt.
    ///
    /// May display a native wallet UI outside this system's control.
    async fn request_access(&self) -> Result<AccountHandle, ProviderError>;

    /// Active account address for the granted access.
    async fn address(&self, handle: AccountHandle) -> Result<Address, ProviderError>;

    /// Chain the wallet is currently connected to.
    async fn network(&self, handle: AccountHandle) -> Result<NetworkInfo, ProviderError>;

    /// Native-currency balance of `address` in the smallest unit.
    async fn balance(&self, handle: AccountHandle, address: Address)
        -> Result<U256, ProviderError>;

    /// Subscribe to `accountsChanged`/`chainChanged` notifications.
    fn notifications(&self) -> broadcast::Receiver<ProviderNotification>;
}
