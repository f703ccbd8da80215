//! Registrar core: name validation, pricing, endpoint selection, the wallet
//! session, and the registration workflow with its status projector.

pub mod chain;
pub mod endpoints;
pub mod pricing;
pub mod status;
pub mod types;
pub mod validator;
pub mod wallet;
pub mod workflow;

// Re-export the main surface
pub use chain::{name_account, Availability, ChainClient, RpcChainClient};
pub use endpoints::{EndpointProbe, EndpointSelector, HttpProbe};
pub use pricing::{quote, PriceQuote, NETWORK_FEE_SOL};
pub use status::{Notice, StatusProjector};
pub use types::{
    AttemptOutcome, RegistrarConfig, RegistrationAttempt, Stage, WorkflowEvent,
    WorkflowEventReceiver, WorkflowEventSender,
};
pub use validator::{validate, MAX_NAME_LEN};
pub use wallet::{
    LocalKeypairWallet, SessionState, WalletAdapter, WalletAdapterError, WalletSession,
};
pub use workflow::RegistrationWorkflow;
