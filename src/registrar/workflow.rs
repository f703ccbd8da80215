//! The registration workflow state machine.
//!
//! One attempt walks Validating -> CheckingAvailability -> AwaitingApproval
//! -> Broadcasting -> Confirming -> Succeeded, with Failed reachable from
//! any non-terminal stage. Stages run strictly sequentially and each stage
//! is visited at most once per attempt. At most one attempt is active at a
//! time; a second invocation is rejected without creating an attempt.
//!
//! The chain client and wallet session are injected at construction, and
//! observers subscribe for events explicitly; there are no ambient globals
//! or event buses.

use crate::error::{classify, RegistrationError};
use crate::registrar::chain::{Availability, ChainClient};
use crate::registrar::pricing::quote;
use crate::registrar::types::{
    AttemptOutcome, RegistrationAttempt, Stage, WorkflowEvent, WorkflowEventReceiver,
    WorkflowEventSender,
};
use crate::registrar::validator::validate;
use crate::registrar::wallet::WalletSession;
use crate::types::{explorer_link, Network, RegistrationReceipt};
use solana_sdk::native_token::lamports_to_sol;
use solana_sdk::{pubkey::Pubkey, system_instruction, transaction::Transaction};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, instrument, warn};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Orchestrates one registration attempt at a time against an injected
/// chain client and wallet session.
pub struct RegistrationWorkflow {
    chain: Arc<dyn ChainClient>,
    session: Arc<WalletSession>,
    network: Network,
    treasury: Pubkey,
    subscribers: Mutex<Vec<WorkflowEventSender>>,
    active: Mutex<()>,
    last_attempt: Mutex<Option<RegistrationAttempt>>,
}

impl RegistrationWorkflow {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        session: Arc<WalletSession>,
        network: Network,
        treasury: Pubkey,
    ) -> Self {
        Self {
            chain,
            session,
            network,
            treasury,
            subscribers: Mutex::new(Vec::new()),
            active: Mutex::new(()),
            last_attempt: Mutex::new(None),
        }
    }

    /// Subscribe to stage transitions and terminal results.
    pub async fn subscribe(&self) -> WorkflowEventReceiver {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.subscribers.lock().await.push(sender);
        receiver
    }

    /// The most recent terminal attempt, retained for display only.
    pub async fn last_attempt(&self) -> Option<RegistrationAttempt> {
        self.last_attempt.lock().await.clone()
    }

    /// Run one registration attempt to a terminal state. Rejected with
    /// `AttemptInProgress` while a prior attempt is still non-terminal.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn register(
        &self,
        name: &str,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        let Ok(_guard) = self.active.try_lock() else {
            warn!("registration already in progress, rejecting");
            return Err(RegistrationError::AttemptInProgress);
        };

        let mut attempt = RegistrationAttempt::new(name);
        let result = self.run_stages(&mut attempt).await;
        match &result {
            Ok(receipt) => {
                attempt.stage = Stage::Succeeded;
                attempt.outcome = AttemptOutcome::Succeeded;
                attempt.signature = Some(receipt.signature.clone());
                info!(signature = %receipt.signature, "registration succeeded");
                self.emit(WorkflowEvent::Succeeded(receipt.clone())).await;
            }
            Err(error) => {
                attempt.stage = Stage::Failed;
                attempt.outcome = AttemptOutcome::Failed;
                attempt.error = Some(error.clone());
                warn!("registration failed: {error}");
                self.emit(WorkflowEvent::Failed {
                    name: name.to_string(),
                    error: error.clone(),
                })
                .await;
            }
        }
        *self.last_attempt.lock().await = Some(attempt);
        result
    }

    async fn run_stages(
        &self,
        attempt: &mut RegistrationAttempt,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        let name = attempt.name.clone();

        self.enter(attempt, Stage::Validating).await;
        validate(&name).map_err(RegistrationError::Validation)?;

        self.enter(attempt, Stage::CheckingAvailability).await;
        match self.chain.lookup_owner(&name).await {
            Availability::Free => {}
            Availability::Taken(owner) => {
                return Err(RegistrationError::NameTaken {
                    owner: owner.to_string(),
                });
            }
            Availability::LookupFailed(detail) => {
                return Err(RegistrationError::LookupFailed(detail));
            }
        }

        self.enter(attempt, Stage::AwaitingApproval).await;
        let price = quote(&name);
        attempt.quote = Some(price.clone());
        let payer = self
            .session
            .address()
            .await
            .ok_or(RegistrationError::NotConnected)?;
        let required = price.total_lamports();
        let available = self.session.balance(self.chain.as_ref()).await;
        if available < required {
            return Err(RegistrationError::InsufficientFunds {
                required_sol: price.total_sol,
                available_sol: lamports_to_sol(available),
            });
        }

        self.enter(attempt, Stage::Broadcasting).await;
        let blockhash = self
            .chain
            .latest_blockhash()
            .await
            .map_err(|e| classify(&e))?;
        let instruction = system_instruction::transfer(&payer, &self.treasury, required);
        let mut transaction = Transaction::new_with_payer(&[instruction], Some(&payer));
        transaction.message.recent_blockhash = blockhash;
        let signed = self.session.sign(transaction).await?;
        let signature = self
            .chain
            .send_transaction(&signed)
            .await
            .map_err(|e| match classify(&e) {
                RegistrationError::Unknown(message) => {
                    RegistrationError::BroadcastFailed(message)
                }
                other => other,
            })?;

        self.enter(attempt, Stage::Confirming).await;
        self.chain
            .confirm(&signature)
            .await
            .map_err(|e| classify(&e))?;

        Ok(RegistrationReceipt {
            name: name.clone(),
            signature: signature.to_string(),
            cost_sol: price.total_sol,
            network: self.network,
            explorer_link: explorer_link(&signature.to_string(), self.network),
        })
    }

    async fn enter(&self, attempt: &mut RegistrationAttempt, stage: Stage) {
        attempt.stage = stage;
        info!(name = %attempt.name, stage = ?stage, "entering stage");
        self.emit(WorkflowEvent::StageEntered {
            name: attempt.name.clone(),
            stage,
        })
        .await;
    }

    /// Fan an event out to subscribers without ever waiting on them. A
    /// subscriber whose channel is full has stopped draining; it is evicted
    /// so a stalled consumer cannot stall the attempt itself.
    async fn emit(&self, event: WorkflowEvent) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("subscriber stopped draining events, evicting");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}
