//! Wallet session client
//!
//! Connects to a browser-injected chain wallet, normalizes its responses,
//! and keeps a local session (address, network, balance) synchronized with
//! wallet-originated events:
//!
//! - [`provider`] wraps the injected wallet object behind the
//!   [`WalletProvider`] trait; [`SimulatedWallet`] is the deterministic
//!   in-memory implementation for tests and offline development.
//! - [`SessionClient`] orchestrates connect/refresh/disconnect and exposes
//!   synchronous [`WalletSession`] snapshots.
//! - A background notification bridge reacts to `accountsChanged` and
//!   `chainChanged`, refreshing or invalidating the session and re-emitting
//!   [`SessionSignal::NetworkInvalidated`] to the host.
//!
//! The injected wallet is a capability handed to [`SessionClient::new`];
//! the crate never reads global browser state, renders UI, signs
//! transactions, or talks to contracts.

pub mod client;
pub mod config;
pub mod events;
pub mod provider;
pub mod session;

mod error;

// Re-export commonly used types
pub use client::SessionClient;
pub use config::{BalanceFormat, ClientConfig, KnownChain};
pub use error::{Result, SessionError};
pub use events::{SessionSignal, SignalSubscription};
pub use provider::{
    AccountHandle, NetworkInfo, ProviderError, ProviderNotification, Query, SimulatedWallet,
    WalletProvider,
};
pub use session::{format_units_fixed, SessionStatus, WalletSession};
