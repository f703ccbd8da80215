//! End-to-end tests for the registration workflow with stub chain access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sol_registrar::error::RegistrationError;
use sol_registrar::registrar::{
    Availability, ChainClient, LocalKeypairWallet, RegistrarConfig, RegistrationWorkflow, Stage,
    WalletAdapter, WalletSession, WorkflowEvent,
};
use sol_registrar::types::Network;
use solana_sdk::{
    hash::Hash,
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

struct StubChain {
    balance_lamports: u64,
    availability: Availability,
    lookup_calls: AtomicUsize,
    confirm_delay: Duration,
    send_error: Option<String>,
}

impl Default for StubChain {
    fn default() -> Self {
        Self {
            balance_lamports: LAMPORTS_PER_SOL,
            availability: Availability::Free,
            lookup_calls: AtomicUsize::new(0),
            confirm_delay: Duration::ZERO,
            send_error: None,
        }
    }
}

#[async_trait]
impl ChainClient for StubChain {
    async fn balance(&self, _owner: &Pubkey) -> Result<u64> {
        Ok(self.balance_lamports)
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        if let Some(message) = &self.send_error {
            return Err(anyhow!("{message}"));
        }
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn confirm(&self, _signature: &Signature) -> Result<()> {
        tokio::time::sleep(self.confirm_delay).await;
        Ok(())
    }

    async fn lookup_owner(&self, _name: &str) -> Availability {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.availability.clone()
    }
}

fn test_config() -> RegistrarConfig {
    RegistrarConfig {
        balance_retry_pause_ms: 10,
        ..RegistrarConfig::default()
    }
}

async fn workflow_with(chain: Arc<StubChain>) -> Arc<RegistrationWorkflow> {
    let adapter: Arc<dyn WalletAdapter> = Arc::new(LocalKeypairWallet::new(Keypair::new()));
    let session = Arc::new(WalletSession::new(
        Some(adapter),
        Network::Test,
        &test_config(),
    ));
    session.connect().await.expect("connect should succeed");
    Arc::new(RegistrationWorkflow::new(
        chain as Arc<dyn ChainClient>,
        session,
        Network::Test,
        Pubkey::new_unique(),
    ))
}

fn drain_events(events: &mut Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn test_successful_registration_walks_every_stage() {
    let chain = Arc::new(StubChain::default());
    let workflow = workflow_with(chain).await;
    let mut events = workflow.subscribe().await;

    let receipt = workflow.register("alice").await.expect("should succeed");
    assert_eq!(receipt.name, "alice");
    assert!(!receipt.signature.is_empty());
    assert!((receipt.cost_sol - 0.021).abs() < 1e-12);
    assert_eq!(receipt.network, Network::Test);
    assert!(receipt.explorer_link.contains(&receipt.signature));

    let events = drain_events(&mut events);
    let stages: Vec<Stage> = events
        .iter()
        .filter_map(|e| match e {
            WorkflowEvent::StageEntered { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Validating,
            Stage::CheckingAvailability,
            Stage::AwaitingApproval,
            Stage::Broadcasting,
            Stage::Confirming,
        ]
    );
    assert!(matches!(events.last(), Some(WorkflowEvent::Succeeded(_))));
}

#[tokio::test]
async fn test_insufficient_funds_fails_at_approval() {
    let chain = Arc::new(StubChain {
        balance_lamports: 1_000,
        ..StubChain::default()
    });
    let workflow = workflow_with(chain).await;
    let mut events = workflow.subscribe().await;

    let err = workflow.register("alice").await.unwrap_err();
    match err {
        RegistrationError::InsufficientFunds { required_sol, .. } => {
            assert!((required_sol - 0.021).abs() < 1e-12);
        }
        other => panic!("expected InsufficientFunds, got {other:?}"),
    }

    let events = drain_events(&mut events);
    assert!(matches!(
        events.last(),
        Some(WorkflowEvent::Failed {
            error: RegistrationError::InsufficientFunds { .. },
            ..
        })
    ));

    let attempt = workflow.last_attempt().await.expect("attempt retained");
    assert_eq!(attempt.stage, Stage::Failed);
    assert!(attempt.error.is_some());
}

#[tokio::test]
async fn test_taken_name_is_reported_with_owner() {
    let owner = Pubkey::new_unique();
    let chain = Arc::new(StubChain {
        availability: Availability::Taken(owner),
        ..StubChain::default()
    });
    let workflow = workflow_with(chain).await;

    match workflow.register("alice").await.unwrap_err() {
        RegistrationError::NameTaken { owner: reported } => {
            assert_eq!(reported, owner.to_string());
        }
        other => panic!("expected NameTaken, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lookup_failure_is_not_availability() {
    let chain = Arc::new(StubChain {
        availability: Availability::LookupFailed("rpc connection dropped".to_string()),
        ..StubChain::default()
    });
    let workflow = workflow_with(chain).await;

    match workflow.register("alice").await.unwrap_err() {
        RegistrationError::LookupFailed(detail) => {
            assert!(detail.contains("rpc connection dropped"));
        }
        other => panic!("expected LookupFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_name_never_reaches_the_chain() {
    let chain = Arc::new(StubChain::default());
    let workflow = workflow_with(chain.clone()).await;

    let err = workflow.register("Not-Valid!").await.unwrap_err();
    assert!(matches!(err, RegistrationError::Validation(_)));
    assert_eq!(chain.lookup_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_send_failure_surfaces_as_broadcast_failed() {
    let chain = Arc::new(StubChain {
        send_error: Some("node is behind by 120 slots".to_string()),
        ..StubChain::default()
    });
    let workflow = workflow_with(chain).await;
    let mut events = workflow.subscribe().await;

    match workflow.register("alice").await.unwrap_err() {
        RegistrationError::BroadcastFailed(message) => {
            assert!(message.contains("node is behind"));
        }
        other => panic!("expected BroadcastFailed, got {other:?}"),
    }

    let events = drain_events(&mut events);
    assert!(matches!(
        events.last(),
        Some(WorkflowEvent::Failed {
            error: RegistrationError::BroadcastFailed(_),
            ..
        })
    ));
}

#[tokio::test]
async fn test_idle_subscriber_never_stalls_attempts() {
    let chain = Arc::new(StubChain::default());
    let workflow = workflow_with(chain).await;

    // This subscriber never drains; its channel fills after a few attempts.
    let _idle = workflow.subscribe().await;
    let mut live = workflow.subscribe().await;

    for attempt in 0..8 {
        let result = tokio::time::timeout(Duration::from_secs(2), workflow.register("alice"))
            .await
            .unwrap_or_else(|_| panic!("attempt {attempt} stalled on an idle subscriber"));
        assert!(result.is_ok());
        // Keep the live subscriber draining so only the idle one backs up.
        drain_events(&mut live);
    }
}

#[tokio::test]
async fn test_second_attempt_rejected_while_first_in_flight() {
    let chain = Arc::new(StubChain {
        confirm_delay: Duration::from_millis(200),
        ..StubChain::default()
    });
    let workflow = workflow_with(chain).await;

    let first = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.register("alice").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        workflow.register("bob").await.unwrap_err(),
        RegistrationError::AttemptInProgress
    );

    let receipt = first
        .await
        .expect("task should not panic")
        .expect("first attempt should succeed");
    assert_eq!(receipt.name, "alice");

    // The guard is released at the terminal state; a fresh attempt works.
    assert!(workflow.register("bob").await.is_ok());
}
