//! Status projection: renders workflow events for an observer.
//!
//! Purely a consumer; owns no workflow logic. Stage events become transient
//! notices that auto-dismiss after a configurable delay unless superseded;
//! terminal events become durable notifications retained until dismissed.

use crate::registrar::types::{Stage, WorkflowEvent, WorkflowEventReceiver};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// What the projector is currently displaying.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Transient progress indicator for an in-flight attempt
    Progress { name: String, stage: Stage },
    /// Durable success notification
    Success { message: String },
    /// Durable failure notification
    Failure { message: String },
}

impl Notice {
    fn is_transient(&self) -> bool {
        matches!(self, Notice::Progress { .. })
    }
}

/// Consumes workflow events and maintains the current display notice.
pub struct StatusProjector {
    events: WorkflowEventReceiver,
    dismiss_after: Duration,
    current: Option<Notice>,
}

impl StatusProjector {
    pub fn new(events: WorkflowEventReceiver, dismiss_after: Duration) -> Self {
        Self {
            events,
            dismiss_after,
            current: None,
        }
    }

    pub fn current_notice(&self) -> Option<&Notice> {
        self.current.as_ref()
    }

    /// Clear a durable notification.
    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Apply one event to the display state.
    pub fn apply(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::StageEntered { name, stage } => {
                info!(name = %name, stage = ?stage, "registration progress");
                self.current = Some(Notice::Progress { name, stage });
            }
            WorkflowEvent::Succeeded(receipt) => {
                info!(
                    name = %receipt.name,
                    signature = %receipt.signature,
                    "registration complete"
                );
                self.current = Some(Notice::Success {
                    message: format!(
                        "{} registered for {} SOL: {}",
                        receipt.name, receipt.cost_sol, receipt.explorer_link
                    ),
                });
            }
            WorkflowEvent::Failed { name, error } => {
                warn!(name = %name, "registration failed: {error}");
                self.current = Some(Notice::Failure {
                    message: error.to_string(),
                });
            }
        }
    }

    /// Run until the event stream closes. The dismiss timer restarts on
    /// every event, so a superseding notice keeps the display alive.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                maybe_event = self.events.recv() => {
                    match maybe_event {
                        Some(event) => self.apply(event),
                        None => {
                            debug!("workflow event stream closed, projector shutting down");
                            break;
                        }
                    }
                }
                _ = sleep(self.dismiss_after), if self.current.as_ref().is_some_and(Notice::is_transient) => {
                    debug!("dismissing stale progress notice");
                    self.current = None;
                }
            }
        }
    }
}
