//! Wallet session snapshot
//!
//! [`WalletSession`] is the value the UI collaborator renders: address,
//! network, balance, and connection status. It is owned and mutated
//! exclusively by the session client; callers only ever see clones.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::config::BalanceFormat;
use crate::provider::NetworkInfo;

/// Connection status of a wallet session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// A connect or refresh failed; carries the human-readable reason.
    Error(String),
}

/// Snapshot of the client's session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    /// Checksummed account address, absent while disconnected
    pub address: Option<Address>,
    /// Chain the wallet is connected to
    pub network: Option<NetworkInfo>,
    /// Native-currency balance in the smallest unit
    pub balance_wei: Option<U256>,
    pub status: SessionStatus,
    format: BalanceFormat,
}

impl WalletSession {
    /// Fresh disconnected session.
    pub fn disconnected(format: BalanceFormat) -> Self {
        Self {
            address: None,
            network: None,
            balance_wei: None,
            status: SessionStatus::Disconnected,
            format,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    /// Display form of `balance_wei` at the configured precision.
    ///
    /// Always recomputed from `balance_wei`; there is no stored formatted
    /// balance that could drift out of sync.
    pub fn balance_formatted(&self) -> Option<String> {
        self.balance_wei.map(|wei| {
            format_units_fixed(wei, self.format.currency_decimals, self.format.display_precision)
        })
    }

    /// Clear every field back to the disconnected state.
    pub(crate) fn reset(&mut self) {
        self.address = None;
        self.network = None;
        self.balance_wei = None;
        self.status = SessionStatus::Disconnected;
    }
}

/// Format a smallest-unit value as a decimal string with exactly
/// `precision` fractional digits (truncating, never rounding).
///
/// `1_500_000_000_000_000_000` wei at 18 decimals, precision 4 → `"1.5000"`.
pub fn format_units_fixed(value: U256, decimals: u32, precision: usize) -> String {
    let divisor = U256::from(10).pow(U256::from(decimals));
    let whole = value / divisor;
    if precision == 0 {
        return whole.to_string();
    }

    let remainder = value % divisor;
    let mut frac = format!("{:0>width$}", remainder, width = decimals as usize);
    frac.truncate(precision.min(decimals as usize));
    // Requested precision beyond the currency's decimals pads with zeros.
    while frac.len() < precision {
        frac.push('0');
    }
    format!("{whole}.{frac}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn wei(s: &str) -> U256 {
        U256::from_str(s).unwrap()
    }

    #[test]
    fn formats_one_point_five_eth() {
        assert_eq!(format_units_fixed(wei("1500000000000000000"), 18, 4), "1.5000");
    }

    #[test]
    fn formats_whole_and_zero_values() {
        assert_eq!(format_units_fixed(wei("1000000000000000000"), 18, 4), "1.0000");
        assert_eq!(format_units_fixed(U256::ZERO, 18, 4), "0.0000");
    }

    #[test]
    fn truncates_instead_of_rounding() {
        // 1.23456... ETH shown at 4 digits drops the tail, it never rounds up.
        assert_eq!(format_units_fixed(wei("1234567890000000000"), 18, 4), "1.2345");
    }

    #[test]
    fn dust_below_precision_formats_as_zero() {
        assert_eq!(format_units_fixed(U256::from(1u64), 18, 4), "0.0000");
    }

    #[test]
    fn precision_zero_drops_the_fraction() {
        assert_eq!(format_units_fixed(wei("1999999999999999999"), 18, 0), "1");
    }

    #[test]
    fn precision_beyond_decimals_pads_with_zeros() {
        assert_eq!(format_units_fixed(U256::from(15u64), 1, 3), "1.500");
    }

    #[test]
    fn formatted_balance_is_pure_function_of_wei() {
        let mut session = WalletSession::disconnected(BalanceFormat::default());
        assert_eq!(session.balance_formatted(), None);

        session.balance_wei = Some(wei("1500000000000000000"));
        assert_eq!(session.balance_formatted().as_deref(), Some("1.5000"));
        // Idempotent recomputation.
        assert_eq!(session.balance_formatted().as_deref(), Some("1.5000"));

        session.balance_wei = Some(U256::ZERO);
        assert_eq!(session.balance_formatted().as_deref(), Some("0.0000"));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut session = WalletSession::disconnected(BalanceFormat::default());
        session.address = Some(Address::from_str("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap());
        session.network = Some(NetworkInfo::from_chain_id(1));
        session.balance_wei = Some(wei("1500000000000000000"));
        session.status = SessionStatus::Connected;

        let json = serde_json::to_string(&session).unwrap();
        let restored: WalletSession = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.balance_formatted().as_deref(), Some("1.5000"));
    }

    #[test]
    fn reset_clears_every_field() {
        let mut session = WalletSession::disconnected(BalanceFormat::default());
        session.address = Some(Address::from_str("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap());
        session.network = Some(NetworkInfo::from_chain_id(1));
        session.balance_wei = Some(U256::from(7u64));
        session.status = SessionStatus::Connected;

        session.reset();
        assert_eq!(session, WalletSession::disconnected(BalanceFormat::default()));
    }
}
