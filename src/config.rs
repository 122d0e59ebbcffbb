//! Configuration for the wallet session client

use serde::{Deserialize, Serialize};

/// Chains the client knows a human-readable name for
///
/// Wallets report networks as bare chain ids; these are the ids the client
/// can translate into the names hosts usually display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnownChain {
    Mainnet,
    Sepolia,
    Arbitrum,
    Optimism,
    Base,
}

impl KnownChain {
    pub fn chain_id(&self) -> u64 {
        match self {
            KnownChain::Mainnet => 1,
            KnownChain::Sepolia => 11_155_111,
            KnownChain::Arbitrum => 42_161,
            KnownChain::Optimism => 10,
            KnownChain::Base => 8453,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KnownChain::Mainnet => "mainnet",
            KnownChain::Sepolia => "sepolia",
            KnownChain::Arbitrum => "arbitrum",
            KnownChain::Optimism => "optimism",
            KnownChain::Base => "base",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            1 => Some(KnownChain::Mainnet),
            11_155_111 => Some(KnownChain::Sepolia),
            42_161 => Some(KnownChain::Arbitrum),
            10 => Some(KnownChain::Optimism),
            8453 => Some(KnownChain::Base),
            _ => None,
        }
    }
}

/// How native-currency balances are rendered for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceFormat {
    /// Decimals of the native currency's smallest unit (18 for wei)
    pub currency_decimals: u32,
    /// Fractional digits shown in the formatted balance
    pub display_precision: usize,
}

impl Default for BalanceFormat {
    fn default() -> Self {
        Self {
            currency_decimals: 18,
            display_precision: 4,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Balance display formatting
    pub balance_format: BalanceFormat,
    /// Capacity of the session signal broadcast channel
    pub signal_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            balance_format: BalanceFormat::default(),
            signal_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chain_round_trip() {
        for chain in [
            KnownChain::Mainnet,
            KnownChain::Sepolia,
            KnownChain::Arbitrum,
            KnownChain::Optimism,
            KnownChain::Base,
        ] {
            assert_eq!(KnownChain::from_chain_id(chain.chain_id()), Some(chain));
        }
    }

    #[test]
    fn unknown_chain_id_has_no_name() {
        assert_eq!(KnownChain::from_chain_id(999_999), None);
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.balance_format.currency_decimals, 18);
        assert_eq!(config.balance_format.display_precision, 4);
        assert!(config.signal_capacity > 0);
    }
}
