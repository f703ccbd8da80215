//! Core types shared across the sol-registrar crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which Solana cluster a session and its registrations target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Mainnet-beta
    Main,
    /// Devnet
    Test,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Network::Main),
            "test" => Ok(Network::Test),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

/// Final result of a successful registration attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    /// The registered name
    pub name: String,
    /// Transaction signature, base58
    pub signature: String,
    /// Total cost paid, in SOL
    pub cost_sol: f64,
    /// Cluster the registration landed on
    pub network: Network,
    /// Explorer URL for the transaction
    pub explorer_link: String,
}

/// Build an explorer URL for a transaction signature on the given cluster.
pub fn explorer_link(signature: &str, network: Network) -> String {
    match network {
        Network::Main => format!("https://explorer.solana.com/tx/{signature}"),
        Network::Test => format!("https://explorer.solana.com/tx/{signature}?cluster=devnet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_round_trip() {
        assert_eq!("main".parse::<Network>(), Ok(Network::Main));
        assert_eq!("test".parse::<Network>(), Ok(Network::Test));
        assert!("mainnet".parse::<Network>().is_err());
        assert_eq!(Network::Main.to_string(), "main");
        assert_eq!(Network::Test.to_string(), "test");
    }

    #[test]
    fn test_explorer_link_carries_cluster() {
        let link = explorer_link("abc123", Network::Test);
        assert!(link.contains("abc123"));
        assert!(link.ends_with("?cluster=devnet"));
        assert!(!explorer_link("abc123", Network::Main).contains("cluster"));
    }
}
