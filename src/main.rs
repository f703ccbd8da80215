//! Demo binary: select an endpoint, connect a local wallet, and run one
//! registration attempt, recording the outcome to the analytics store.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use nonempty::NonEmpty;
use sol_registrar::analytics::{RegistrationRecord, RegistrationStatus, RegistrationStore, SqliteStore};
use sol_registrar::registrar::{
    ChainClient, EndpointSelector, HttpProbe, LocalKeypairWallet, RegistrarConfig,
    RegistrationWorkflow, RpcChainClient, StatusProjector, WalletAdapter, WalletSession,
};
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "example".to_string());

    let mut config = RegistrarConfig::default();
    if let Ok(raw) = std::env::var("REGISTRAR_RPC_ENDPOINTS") {
        config.rpc_endpoints = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    info!("starting sol-registrar for name: {name}");

    // Pick the first reachable endpoint, preferred first.
    let candidates = NonEmpty::from_vec(config.rpc_endpoints.clone())
        .ok_or_else(|| anyhow!("rpc_endpoints cannot be empty"))?;
    let (endpoint_tx, mut endpoint_rx) = mpsc::channel(4);
    let mut selector = EndpointSelector::new(
        candidates,
        Arc::new(HttpProbe::new()?),
        Duration::from_millis(config.probe_timeout_ms),
    );
    selector.set_observer(endpoint_tx);
    tokio::spawn(async move {
        while let Some(url) = endpoint_rx.recv().await {
            info!("active RPC endpoint changed: {url}");
        }
    });
    let endpoint = selector.select().await?;

    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(endpoint, &config)?);

    // Demo wallet: a throwaway local keypair standing in for the browser
    // extension. It will need an airdrop before the balance check passes.
    let adapter: Arc<dyn WalletAdapter> = Arc::new(LocalKeypairWallet::new(Keypair::new()));
    let session = Arc::new(WalletSession::new(Some(adapter), config.network, &config));
    let address = session.connect().await?;
    info!("wallet connected: {address}");

    let treasury =
        Pubkey::from_str(&config.treasury).context("invalid treasury address in config")?;
    let workflow = RegistrationWorkflow::new(chain, session.clone(), config.network, treasury);

    let events = workflow.subscribe().await;
    let projector = StatusProjector::new(
        events,
        Duration::from_secs(config.notice_dismiss_secs),
    );
    let projector_handle = tokio::spawn(projector.run());

    let store = SqliteStore::open_default().await?;
    let started_at = Utc::now();

    match workflow.register(&name).await {
        Ok(receipt) => {
            store
                .insert(&RegistrationRecord {
                    id: None,
                    name: receipt.name.clone(),
                    signature: Some(receipt.signature.clone()),
                    network: receipt.network,
                    status: RegistrationStatus::Confirmed,
                    cost_sol: receipt.cost_sol,
                    registered_at: started_at,
                    confirmed_at: Some(Utc::now()),
                })
                .await?;
            info!(
                "registered {} for {} SOL: {}",
                receipt.name, receipt.cost_sol, receipt.explorer_link
            );
        }
        Err(e) => {
            store
                .insert(&RegistrationRecord {
                    id: None,
                    name: name.clone(),
                    signature: None,
                    network: config.network,
                    status: RegistrationStatus::Failed,
                    cost_sol: 0.0,
                    registered_at: started_at,
                    confirmed_at: None,
                })
                .await?;
            warn!("registration failed: {e}");
        }
    }

    session.disconnect().await;

    // Dropping the workflow closes the event stream; the projector drains
    // what is left and shuts down.
    drop(workflow);
    let _ = projector_handle.await;

    Ok(())
}
