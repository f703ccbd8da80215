//! RPC endpoint selection.
//!
//! Candidates are probed strictly in order, each raced against a
//! per-candidate timeout. The first endpoint whose liveness probe succeeds
//! wins and probing stops. Sequential probing keeps the preference order
//! deterministic and avoids opening connections to several backends at once.

use crate::error::RegistrationError;
use crate::registrar::types::EndpointChangedSender;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use nonempty::NonEmpty;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

/// Liveness probe seam; production probes over HTTP, tests script outcomes.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<()>;
}

/// Probes an endpoint with a JSON-RPC `getHealth` request.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl EndpointProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getHealth",
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("health probe request failed")?;
        if !response.status().is_success() {
            bail!("health probe returned HTTP {}", response.status());
        }
        let value: serde_json::Value = response
            .json()
            .await
            .context("health probe returned invalid JSON")?;
        if value.get("result").is_some() {
            Ok(())
        } else {
            bail!("endpoint reported unhealthy: {value}")
        }
    }
}

/// Selects the first reachable endpoint from an ordered candidate list.
pub struct EndpointSelector {
    candidates: NonEmpty<String>,
    probe: Arc<dyn EndpointProbe>,
    probe_timeout: Duration,
    observer: Option<EndpointChangedSender>,
}

impl EndpointSelector {
    pub fn new(
        candidates: NonEmpty<String>,
        probe: Arc<dyn EndpointProbe>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            candidates,
            probe,
            probe_timeout,
            observer: None,
        }
    }

    /// Register an observer notified when an endpoint is selected.
    pub fn set_observer(&mut self, sender: EndpointChangedSender) {
        self.observer = Some(sender);
    }

    /// Probe candidates in order; the first success within the timeout is
    /// selected. Fails with `NoReachableEndpoint` when every candidate
    /// errors or times out.
    pub async fn select(&self) -> Result<String, RegistrationError> {
        for url in self.candidates.iter() {
            match timeout(self.probe_timeout, self.probe.probe(url)).await {
                Ok(Ok(())) => {
                    info!(endpoint = %url, "selected RPC endpoint");
                    if let Some(observer) = &self.observer {
                        let _ = observer.send(url.clone()).await;
                    }
                    return Ok(url.clone());
                }
                Ok(Err(e)) => {
                    warn!(endpoint = %url, "endpoint failed liveness probe: {e:#}");
                }
                Err(_) => {
                    warn!(
                        endpoint = %url,
                        "endpoint probe timed out after {:?}", self.probe_timeout
                    );
                }
            }
        }
        Err(RegistrationError::NoReachableEndpoint)
    }
}
