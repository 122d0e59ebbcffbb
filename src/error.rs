//! Error types for the wallet session client

use alloy::primitives::Address;
use thiserror::Error;

use crate::provider::{ProviderError, Query};

#[derive(Error, Debug)]
pub enum SessionError {
    /// The provider adapter failed; carries the attributable cause
    /// (`Unavailable`, `UserRejected`, or a per-query RPC failure).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A connect or refresh was already in flight; the client is not
    /// reentrant.
    #[error("another wallet operation is already in flight")]
    Busy,

    /// A refresh was requested before access was ever granted.
    #[error("no wallet access granted; connect first")]
    NotConnected,

    /// The address was obtained but one or more secondary reads failed.
    /// The session keeps what succeeded; `refresh()` recovers the rest.
    #[error("partial read for {address}: {}", failed_summary(.failed))]
    PartialRead {
        address: Address,
        failed: Vec<(Query, ProviderError)>,
    },

    /// The client was torn down while the operation was in flight; the
    /// late result was discarded without touching session state.
    #[error("operation cancelled by client teardown")]
    Cancelled,
}

fn failed_summary(failed: &[(Query, ProviderError)]) -> String {
    failed
        .iter()
        .map(|(_, err)| err.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn partial_read_lists_each_failed_query() {
        let err = SessionError::PartialRead {
            address: Address::from_str("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap(),
            failed: vec![
                (Query::Network, ProviderError::rpc(Query::Network, "down")),
                (Query::Balance, ProviderError::rpc(Query::Balance, "timeout")),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("network query failed: down"));
        assert!(text.contains("balance query failed: timeout"));
    }

    #[test]
    fn provider_errors_pass_through_transparently() {
        let err: SessionError = ProviderError::Unavailable.into();
        assert_eq!(
            err.to_string(),
            "no injected wallet is available in this environment"
        );
    }
}
