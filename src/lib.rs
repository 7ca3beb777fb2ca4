//! Client for the Jito block-engine JSON-RPC API.
//!
//! ```text
//!   tx_builder ──► Bundle ──► JitoJsonRpcClient::submit_bundle ──► bundle id
//!                                   │                                   │
//!                               RpcTransport                      status::watch_bundle
//!                                   │                                   │
//!                              block engine  ◄── getBundleStatuses ── poller::poll
//! ```
//!
//! Submission errors surface immediately.  Status polling is bounded and
//! degrades to an "unknown" outcome instead of failing.

pub mod bundle;
pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod rpc;
pub mod status;
pub mod tx_builder;

pub use bundle::{
    Bundle, BundleStatusRecord, BundleStatusResponse, ConfirmationStatus, TipAccount, TxEncoding,
};
pub use client::JitoJsonRpcClient;
pub use config::ClientConfig;
pub use error::{JitoRpcError, Result};
pub use poller::{PollOutcome, PollPolicy, PollStep};
pub use status::{watch_bundle, watch_signature, BundleOutcome, SignatureOutcome};
