//! Chain access seam: balance, blockhash, broadcast, confirmation, and
//! name-ownership lookup behind an async trait, with a production
//! implementation on the nonblocking Solana RPC client.

use crate::registrar::types::RegistrarConfig;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::{hash, Hash},
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status::TransactionConfirmationStatus;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument};

/// Tri-state ownership answer. A failed lookup is reported as its own case
/// and is never conflated with the name being free.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability {
    /// No name account exists at the derived address
    Free,
    /// The name account exists and is held by this address
    Taken(Pubkey),
    /// The lookup itself failed (transport, RPC error); retry by re-initiating
    LookupFailed(String),
}

/// Contract for everything the workflow needs from the chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current balance of an account, in lamports.
    async fn balance(&self, owner: &Pubkey) -> Result<u64>;

    /// A recent blockhash for transaction construction.
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Submit a signed transaction; returns its signature.
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    /// Wait until the signature reaches the confirmed commitment level.
    async fn confirm(&self, signature: &Signature) -> Result<()>;

    /// Look up the current owner of a name, if any.
    async fn lookup_owner(&self, name: &str) -> Availability;
}

/// Derive the account address a name lives at under the given program.
pub fn name_account(name: &str, program_id: &Pubkey) -> Pubkey {
    let seed = hash(name.as_bytes());
    Pubkey::find_program_address(&[b"name", seed.as_ref()], program_id).0
}

/// Production chain client over a selected RPC endpoint.
pub struct RpcChainClient {
    rpc: Arc<RpcClient>,
    program_id: Pubkey,
    confirm_timeout: Duration,
    confirm_poll: Duration,
}

impl RpcChainClient {
    pub fn new(endpoint: String, config: &RegistrarConfig) -> Result<Self> {
        let program_id = Pubkey::from_str(&config.name_program_id)
            .context("invalid name_program_id in config")?;
        let rpc = RpcClient::new_with_timeout(
            endpoint,
            Duration::from_secs(config.rpc_timeout_secs),
        );
        Ok(Self {
            rpc: Arc::new(rpc),
            program_id,
            confirm_timeout: Duration::from_secs(config.confirm_timeout_secs),
            confirm_poll: Duration::from_millis(config.confirm_poll_ms),
        })
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    #[instrument(skip(self), fields(owner = %owner))]
    async fn balance(&self, owner: &Pubkey) -> Result<u64> {
        self.rpc
            .get_balance(owner)
            .await
            .context("failed to fetch balance")
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.rpc
            .get_latest_blockhash()
            .await
            .context("failed to fetch recent blockhash")
    }

    #[instrument(skip(self, transaction))]
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        self.rpc
            .send_transaction(transaction)
            .await
            .context("failed to submit transaction")
    }

    #[instrument(skip(self), fields(signature = %signature))]
    async fn confirm(&self, signature: &Signature) -> Result<()> {
        let deadline = Instant::now() + self.confirm_timeout;
        while Instant::now() < deadline {
            let statuses = self
                .rpc
                .get_signature_statuses(&[*signature])
                .await
                .context("failed to fetch signature status")?;
            if let Some(Some(status)) = statuses.value.first() {
                if let Some(err) = &status.err {
                    bail!("transaction failed on chain: {err}");
                }
                let confirmed = matches!(
                    status.confirmation_status,
                    Some(
                        TransactionConfirmationStatus::Confirmed
                            | TransactionConfirmationStatus::Finalized
                    )
                );
                if confirmed {
                    debug!("signature confirmed");
                    return Ok(());
                }
            }
            sleep(self.confirm_poll).await;
        }
        Err(anyhow!(
            "timed out waiting for confirmation of {signature}"
        ))
    }

    #[instrument(skip(self), fields(name = %name))]
    async fn lookup_owner(&self, name: &str) -> Availability {
        let account = name_account(name, &self.program_id);
        match self
            .rpc
            .get_account_with_commitment(&account, CommitmentConfig::confirmed())
            .await
        {
            Ok(response) => match response.value {
                Some(existing) => {
                    // Name accounts store the registrant in the first 32
                    // bytes of data; fall back to the account owner.
                    let registrant = existing
                        .data
                        .get(..32)
                        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
                        .map(Pubkey::new_from_array)
                        .unwrap_or(existing.owner);
                    Availability::Taken(registrant)
                }
                None => Availability::Free,
            },
            Err(e) => Availability::LookupFailed(e.to_string()),
        }
    }
}
