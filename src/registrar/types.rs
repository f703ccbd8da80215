//! Types for the registration workflow: configuration, stages, events.

use crate::error::RegistrationError;
use crate::registrar::pricing::PriceQuote;
use crate::types::{Network, RegistrationReceipt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Configuration for the registrar core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrarConfig {
    /// Ordered RPC endpoint candidates, preferred first
    pub rpc_endpoints: Vec<String>,
    /// Target cluster
    pub network: Network,
    /// Treasury account that receives registration fees, base58
    pub treasury: String,
    /// Name-service program used to derive name accounts, base58
    pub name_program_id: String,
    /// Per-request timeout for RPC calls, seconds
    pub rpc_timeout_secs: u64,
    /// Per-candidate liveness probe timeout, milliseconds
    pub probe_timeout_ms: u64,
    /// How long to wait for the wallet to sign, seconds
    pub sign_timeout_secs: u64,
    /// Balance query attempts before assuming zero
    pub balance_retry_attempts: usize,
    /// Pause between balance attempts, milliseconds
    pub balance_retry_pause_ms: u64,
    /// How long to poll for transaction confirmation, seconds
    pub confirm_timeout_secs: u64,
    /// Confirmation poll interval, milliseconds
    pub confirm_poll_ms: u64,
    /// Auto-dismiss delay for transient status notices, seconds
    pub notice_dismiss_secs: u64,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            rpc_endpoints: vec![
                "https://api.devnet.solana.com".to_string(),
                "https://api.testnet.solana.com".to_string(),
            ],
            network: Network::Test,
            treasury: "11111111111111111111111111111111".to_string(),
            name_program_id: "namesLPneVptA9Z5rqUDD9tMTWEJwofgaYwp8cawRkX".to_string(),
            rpc_timeout_secs: 10,
            probe_timeout_ms: 3000,
            sign_timeout_secs: 10,
            balance_retry_attempts: 3,
            balance_retry_pause_ms: 1000,
            confirm_timeout_secs: 30,
            confirm_poll_ms: 500,
            notice_dismiss_secs: 5,
        }
    }
}

/// Stages of one registration attempt, strictly ordered. An attempt moves
/// forward-only; no stage is revisited except by starting a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Validating,
    CheckingAvailability,
    AwaitingApproval,
    Broadcasting,
    Confirming,
    Succeeded,
    Failed,
}

/// Terminal disposition of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// Ephemeral record of one user-initiated registration. Retained only for
/// display after the terminal state is reached; never persisted by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationAttempt {
    pub name: String,
    pub quote: Option<PriceQuote>,
    pub stage: Stage,
    pub outcome: AttemptOutcome,
    pub signature: Option<String>,
    pub error: Option<RegistrationError>,
}

impl RegistrationAttempt {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            quote: None,
            stage: Stage::Idle,
            outcome: AttemptOutcome::Pending,
            signature: None,
            error: None,
        }
    }
}

/// Event emitted to workflow subscribers on every observable transition.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// The attempt entered a new stage
    StageEntered { name: String, stage: Stage },
    /// The attempt reached its success terminal
    Succeeded(RegistrationReceipt),
    /// The attempt reached its failure terminal
    Failed {
        name: String,
        error: RegistrationError,
    },
}

pub type WorkflowEventSender = mpsc::Sender<WorkflowEvent>;
pub type WorkflowEventReceiver = mpsc::Receiver<WorkflowEvent>;

/// Notification sent when the connection selector settles on an endpoint.
pub type EndpointChangedSender = mpsc::Sender<String>;
pub type EndpointChangedReceiver = mpsc::Receiver<String>;
