//! Wallet session lifecycle and signing.
//!
//! The external signing capability sits behind the `WalletAdapter` trait.
//! The session owns the connect/disconnect state machine, the signing
//! timeout, and the balance-query retry policy.

use crate::error::{classify_message, RegistrationError};
use crate::registrar::chain::ChainClient;
use crate::registrar::types::RegistrarConfig;
use crate::types::Network;
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{info, instrument, warn};

/// Errors reported by the external signing capability.
#[derive(Debug, Error)]
pub enum WalletAdapterError {
    #[error("wallet capability not available")]
    Unavailable,
    #[error("request rejected by user (code {code})")]
    Rejected { code: i32 },
    #[error("{0}")]
    Other(String),
}

/// The external connect/disconnect/sign capability.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Request a connection; returns the wallet's public address.
    async fn connect(&self) -> Result<Pubkey, WalletAdapterError>;

    /// Notify the wallet that the session is over.
    async fn disconnect(&self) -> Result<(), WalletAdapterError>;

    /// Sign a prepared transaction.
    async fn sign_transaction(&self, transaction: Transaction)
        -> Result<Transaction, WalletAdapterError>;
}

/// Adapter backed by a local keypair; the production stand-in for a
/// browser-injected wallet in server-side and test environments.
pub struct LocalKeypairWallet {
    keypair: Keypair,
}

impl LocalKeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletAdapter for LocalKeypairWallet {
    async fn connect(&self) -> Result<Pubkey, WalletAdapterError> {
        Ok(self.keypair.pubkey())
    }

    async fn disconnect(&self) -> Result<(), WalletAdapterError> {
        Ok(())
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, WalletAdapterError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletAdapterError::Other(e.to_string()))?;
        Ok(transaction)
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected { address: Pubkey },
}

/// Owns the wallet connection state. State is mutated only by connect,
/// disconnect, and account-change events.
pub struct WalletSession {
    adapter: Option<Arc<dyn WalletAdapter>>,
    state: RwLock<SessionState>,
    network: Network,
    sign_timeout: Duration,
    balance_attempts: usize,
    balance_pause: Duration,
}

impl WalletSession {
    pub fn new(
        adapter: Option<Arc<dyn WalletAdapter>>,
        network: Network,
        config: &RegistrarConfig,
    ) -> Self {
        Self {
            adapter,
            state: RwLock::new(SessionState::Disconnected),
            network,
            sign_timeout: Duration::from_secs(config.sign_timeout_secs),
            balance_attempts: config.balance_retry_attempts.max(1),
            balance_pause: Duration::from_millis(config.balance_retry_pause_ms),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The connected public address, if any.
    pub async fn address(&self) -> Option<Pubkey> {
        match &*self.state.read().await {
            SessionState::Connected { address } => Some(*address),
            _ => None,
        }
    }

    /// Connect through the adapter. Fails with `NoWalletFound` when no
    /// capability is present and `UserRejected` when the wallet declines.
    pub async fn connect(&self) -> Result<Pubkey, RegistrationError> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or(RegistrationError::NoWalletFound)?;
        {
            let mut state = self.state.write().await;
            *state = SessionState::Connecting;
        }
        match adapter.connect().await {
            Ok(address) => {
                let mut state = self.state.write().await;
                *state = SessionState::Connected { address };
                info!(address = %address, "wallet connected");
                Ok(address)
            }
            Err(e) => {
                let mut state = self.state.write().await;
                *state = SessionState::Disconnected;
                Err(map_adapter_error(e))
            }
        }
    }

    /// Best-effort adapter notification; the local state always ends up
    /// Disconnected regardless of whether the notification succeeded.
    pub async fn disconnect(&self) {
        if let Some(adapter) = &self.adapter {
            if let Err(e) = adapter.disconnect().await {
                warn!("wallet disconnect notification failed: {e}");
            }
        }
        let mut state = self.state.write().await;
        *state = SessionState::Disconnected;
        info!("wallet disconnected");
    }

    /// Apply an externally signaled account change. A removed account tears
    /// the session down; a new address replaces the recorded one in place.
    pub async fn handle_account_change(&self, new_address: Option<Pubkey>) {
        let mut state = self.state.write().await;
        match (new_address, &*state) {
            (Some(address), SessionState::Connected { .. }) => {
                info!(address = %address, "wallet account changed");
                *state = SessionState::Connected { address };
            }
            (None, SessionState::Connected { .. }) => {
                info!("wallet account removed, tearing session down");
                *state = SessionState::Disconnected;
            }
            _ => {}
        }
    }

    /// Delegate signing to the adapter. Fails with `NotConnected` unless the
    /// session is Connected; waiting on the wallet is bounded by the signing
    /// timeout.
    #[instrument(skip(self, transaction))]
    pub async fn sign(
        &self,
        transaction: Transaction,
    ) -> Result<Transaction, RegistrationError> {
        if self.address().await.is_none() {
            return Err(RegistrationError::NotConnected);
        }
        let adapter = self
            .adapter
            .as_ref()
            .ok_or(RegistrationError::NoWalletFound)?;
        match timeout(self.sign_timeout, adapter.sign_transaction(transaction)).await {
            Ok(Ok(signed)) => Ok(signed),
            Ok(Err(e)) => Err(map_adapter_error(e)),
            Err(_) => Err(RegistrationError::Timeout),
        }
    }

    /// Query the connected account's balance in lamports, retrying the
    /// underlying call with a fixed pause. Exhausted retries yield 0 rather
    /// than an error: balance unavailability means "unknown, assume zero"
    /// so callers never block on it.
    pub async fn balance(&self, chain: &dyn ChainClient) -> u64 {
        let Some(owner) = self.address().await else {
            return 0;
        };
        let strategy =
            FixedInterval::new(self.balance_pause).take(self.balance_attempts.saturating_sub(1));
        match Retry::spawn(strategy, || chain.balance(&owner)).await {
            Ok(lamports) => lamports,
            Err(e) => {
                warn!("balance query exhausted retries, assuming zero: {e:#}");
                0
            }
        }
    }
}

fn map_adapter_error(err: WalletAdapterError) -> RegistrationError {
    match err {
        WalletAdapterError::Unavailable => RegistrationError::NoWalletFound,
        WalletAdapterError::Rejected { .. } => RegistrationError::UserRejected,
        WalletAdapterError::Other(message) => classify_message(&message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::USER_REJECTED_CODE;
    use crate::registrar::chain::Availability;
    use anyhow::{anyhow, Result};
    use solana_sdk::hash::Hash;
    use solana_sdk::signature::Signature;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config() -> RegistrarConfig {
        RegistrarConfig {
            balance_retry_attempts: 3,
            balance_retry_pause_ms: 10,
            sign_timeout_secs: 1,
            ..RegistrarConfig::default()
        }
    }

    struct FlakyChain {
        failures_before_success: usize,
        calls: AtomicUsize,
        balance: u64,
    }

    #[async_trait]
    impl ChainClient for FlakyChain {
        async fn balance(&self, _owner: &Pubkey) -> Result<u64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(anyhow!("rpc unavailable"))
            } else {
                Ok(self.balance)
            }
        }

        async fn latest_blockhash(&self) -> Result<Hash> {
            unreachable!()
        }

        async fn send_transaction(&self, _transaction: &Transaction) -> Result<Signature> {
            unreachable!()
        }

        async fn confirm(&self, _signature: &Signature) -> Result<()> {
            unreachable!()
        }

        async fn lookup_owner(&self, _name: &str) -> Availability {
            unreachable!()
        }
    }

    struct RejectingAdapter;

    #[async_trait]
    impl WalletAdapter for RejectingAdapter {
        async fn connect(&self) -> Result<Pubkey, WalletAdapterError> {
            Err(WalletAdapterError::Rejected {
                code: USER_REJECTED_CODE,
            })
        }

        async fn disconnect(&self) -> Result<(), WalletAdapterError> {
            Ok(())
        }

        async fn sign_transaction(
            &self,
            _transaction: Transaction,
        ) -> Result<Transaction, WalletAdapterError> {
            Err(WalletAdapterError::Rejected {
                code: USER_REJECTED_CODE,
            })
        }
    }

    struct HangingAdapter {
        address: Pubkey,
    }

    #[async_trait]
    impl WalletAdapter for HangingAdapter {
        async fn connect(&self) -> Result<Pubkey, WalletAdapterError> {
            Ok(self.address)
        }

        async fn disconnect(&self) -> Result<(), WalletAdapterError> {
            Ok(())
        }

        async fn sign_transaction(
            &self,
            _transaction: Transaction,
        ) -> Result<Transaction, WalletAdapterError> {
            std::future::pending().await
        }
    }

    async fn connected_session() -> WalletSession {
        let adapter: Arc<dyn WalletAdapter> = Arc::new(LocalKeypairWallet::new(Keypair::new()));
        let session = WalletSession::new(Some(adapter), Network::Test, &test_config());
        session.connect().await.expect("connect should succeed");
        session
    }

    #[tokio::test]
    async fn test_connect_without_capability_fails() {
        let session = WalletSession::new(None, Network::Test, &test_config());
        assert_eq!(
            session.connect().await.unwrap_err(),
            RegistrationError::NoWalletFound
        );
        assert_eq!(session.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_rejection_maps_to_user_rejected() {
        let adapter: Arc<dyn WalletAdapter> = Arc::new(RejectingAdapter);
        let session = WalletSession::new(Some(adapter), Network::Test, &test_config());
        assert_eq!(
            session.connect().await.unwrap_err(),
            RegistrationError::UserRejected
        );
        assert_eq!(session.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_disconnect_always_honored_locally() {
        let session = connected_session().await;
        session.disconnect().await;
        assert_eq!(session.state().await, SessionState::Disconnected);
        assert!(session.address().await.is_none());
    }

    #[tokio::test]
    async fn test_account_change_updates_address() {
        let session = connected_session().await;
        let replacement = Pubkey::new_unique();
        session.handle_account_change(Some(replacement)).await;
        assert_eq!(session.address().await, Some(replacement));

        session.handle_account_change(None).await;
        assert_eq!(session.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_sign_requires_connection() {
        let adapter: Arc<dyn WalletAdapter> = Arc::new(LocalKeypairWallet::new(Keypair::new()));
        let session = WalletSession::new(Some(adapter), Network::Test, &test_config());
        let tx = Transaction::default();
        assert_eq!(
            session.sign(tx).await.unwrap_err(),
            RegistrationError::NotConnected
        );
    }

    #[tokio::test]
    async fn test_sign_timeout_reported_as_timeout() {
        let adapter: Arc<dyn WalletAdapter> = Arc::new(HangingAdapter {
            address: Pubkey::new_unique(),
        });
        let session = WalletSession::new(Some(adapter), Network::Test, &test_config());
        session.connect().await.expect("connect should succeed");
        assert_eq!(
            session.sign(Transaction::default()).await.unwrap_err(),
            RegistrationError::Timeout
        );
    }

    #[tokio::test]
    async fn test_balance_recovers_after_two_failures() {
        let session = connected_session().await;
        let chain = FlakyChain {
            failures_before_success: 2,
            calls: AtomicUsize::new(0),
            balance: 5_000_000,
        };
        assert_eq!(session.balance(&chain).await, 5_000_000);
        assert_eq!(chain.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_balance_exhaustion_returns_zero() {
        let session = connected_session().await;
        let chain = FlakyChain {
            failures_before_success: usize::MAX,
            calls: AtomicUsize::new(0),
            balance: 5_000_000,
        };
        assert_eq!(session.balance(&chain).await, 0);
        assert_eq!(chain.calls.load(Ordering::SeqCst), 3);
    }
}
