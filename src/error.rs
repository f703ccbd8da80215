//! Error taxonomy for the registration workflow.
//!
//! Validation and pricing problems are resolved locally as structured
//! results; wallet and RPC failures are classified into this taxonomy by
//! matching known rejection codes and message substrings, with the original
//! message preserved on the `Unknown` fall-through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every way a registration attempt can fail, as a matchable kind.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RegistrationError {
    #[error("invalid name: {0}")]
    Validation(String),

    #[error("no wallet capability found in this environment")]
    NoWalletFound,

    #[error("request rejected by user")]
    UserRejected,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("insufficient funds: need {required_sol} SOL, have {available_sol} SOL")]
    InsufficientFunds {
        required_sol: f64,
        available_sol: f64,
    },

    #[error("operation timed out")]
    Timeout,

    #[error("no reachable RPC endpoint")]
    NoReachableEndpoint,

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("name is already registered to {owner}")]
    NameTaken { owner: String },

    #[error("ownership lookup failed: {0}")]
    LookupFailed(String),

    #[error("another registration attempt is already in progress")]
    AttemptInProgress,

    #[error("{0}")]
    Unknown(String),
}

/// Wallet-standard rejection code reported when the user declines a prompt.
pub const USER_REJECTED_CODE: i32 = 4001;

/// Classify a raw error from the wallet adapter or the RPC layer into the
/// taxonomy. Unrecognized errors keep their original message for display.
pub fn classify(err: &anyhow::Error) -> RegistrationError {
    let message = format!("{err:#}");
    classify_message(&message)
}

pub(crate) fn classify_message(message: &str) -> RegistrationError {
    let lower = message.to_lowercase();
    if lower.contains("user rejected") || contains_code(message, USER_REJECTED_CODE) {
        RegistrationError::UserRejected
    } else if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline")
    {
        RegistrationError::Timeout
    } else {
        RegistrationError::Unknown(message.to_string())
    }
}

/// True when the message carries `code` as a standalone number, not as a
/// digit run inside a longer number ("port 14001" must not match 4001).
fn contains_code(message: &str, code: i32) -> bool {
    let code = code.to_string();
    message
        .split(|c: char| !c.is_ascii_digit())
        .any(|digits| digits == code)
}
