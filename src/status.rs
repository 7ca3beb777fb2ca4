/// Terminal-state tracking for bundles and single transactions.
///
/// Two watchers share the bounded loop in [`crate::poller`]; they differ
/// only in what they ask and how they read the answer.
///
/// # Bundle state machine
///
/// ```text
///   (no record) ──► processed ──► confirmed ──► finalized ─┬─ err = null ──► Landed
///        ▲              │              │                   └─ err = {..} ──► Failed
///        └── retry ─────┴── retry ─────┘
///   any other status string ──► Unexpected (stop, inspect manually)
/// ```
///
/// `confirmed` is deliberately not terminal: the watcher waits for full
/// finality before calling a bundle landed.
///
/// # Signature path
///
/// A signature is terminal as soon as an error shows up, or once its
/// confirmation count reaches the configured threshold (default 27).
use std::fmt;
use std::future::Future;
use std::str::FromStr;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signature::Signature;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::bundle::{BundleStatusRecord, BundleStatusResponse, ConfirmationStatus};
use crate::client::JitoJsonRpcClient;
use crate::error::{JitoRpcError, Result};
use crate::poller::{poll, PollOutcome, PollPolicy, PollStep};

/// Confirmations treated as final on the signature path.
pub const DEFAULT_CONFIRMATION_THRESHOLD: u64 = 27;

/// Explorer link for a transaction signature.
pub fn solscan_url(signature: &str) -> String {
    format!("https://solscan.io/tx/{signature}")
}

// ═══════════════════════════════════════════════════════════════════════════
//  Bundles
// ═══════════════════════════════════════════════════════════════════════════

/// Anything that can answer `getBundleStatuses`.
pub trait BundleStatusSource {
    fn bundle_statuses(
        &self,
        bundle_ids: &[String],
    ) -> impl Future<Output = Result<BundleStatusResponse>> + Send;
}

impl BundleStatusSource for JitoJsonRpcClient {
    async fn bundle_statuses(&self, bundle_ids: &[String]) -> Result<BundleStatusResponse> {
        self.get_bundle_statuses(bundle_ids).await
    }
}

/// Where a bundle stands after one status query.
#[derive(Clone, Debug, PartialEq)]
pub enum BundleProgress {
    /// No record yet: not visible to the network, or dropped.
    NotFound,
    Processed { slot: u64 },
    Confirmed { slot: u64 },
    /// Finalized with no execution error.
    Landed { slot: u64, transactions: Vec<String> },
    /// Finalized with an execution error.
    Failed { slot: u64, error: String },
    /// A status string we do not know how to interpret.
    Unexpected(String),
}

impl BundleProgress {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Landed { .. } | Self::Failed { .. } | Self::Unexpected(_)
        )
    }
}

/// Pure function of `(confirmation_status, err)`.
pub fn classify_bundle(record: Option<&BundleStatusRecord>) -> BundleProgress {
    let Some(record) = record else {
        return BundleProgress::NotFound;
    };

    match &record.confirmation_status {
        ConfirmationStatus::Processed => BundleProgress::Processed { slot: record.slot },
        ConfirmationStatus::Confirmed => BundleProgress::Confirmed { slot: record.slot },
        ConfirmationStatus::Finalized => match record.execution_error() {
            None => BundleProgress::Landed {
                slot: record.slot,
                transactions: record.transactions.clone(),
            },
            Some(err) => BundleProgress::Failed {
                slot: record.slot,
                error: err.to_string(),
            },
        },
        ConfirmationStatus::Other(status) => BundleProgress::Unexpected(status.clone()),
    }
}

/// Final report of [`watch_bundle`].
#[derive(Clone, Debug, PartialEq)]
pub enum BundleOutcome {
    Landed {
        bundle_id: String,
        slot: u64,
        transactions: Vec<String>,
        attempts: u32,
    },
    Failed {
        bundle_id: String,
        slot: u64,
        error: String,
        attempts: u32,
    },
    /// Polling stopped on an unrecognised status; check the bundle by hand.
    Unexpected {
        bundle_id: String,
        status: String,
        attempts: u32,
    },
    /// Attempts ran out.  The bundle may still land; do not assume it was
    /// dropped.
    Unknown {
        bundle_id: String,
        attempts: u32,
        last_error: Option<String>,
    },
    /// The status query failed in a way retrying cannot fix.
    Aborted {
        bundle_id: String,
        attempts: u32,
        error: String,
    },
    Cancelled { bundle_id: String, attempts: u32 },
}

impl BundleOutcome {
    pub fn is_landed(&self) -> bool {
        matches!(self, Self::Landed { .. })
    }

    pub fn bundle_id(&self) -> &str {
        match self {
            Self::Landed { bundle_id, .. }
            | Self::Failed { bundle_id, .. }
            | Self::Unexpected { bundle_id, .. }
            | Self::Unknown { bundle_id, .. }
            | Self::Aborted { bundle_id, .. }
            | Self::Cancelled { bundle_id, .. } => bundle_id,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Landed { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::Unexpected { attempts, .. }
            | Self::Unknown { attempts, .. }
            | Self::Aborted { attempts, .. }
            | Self::Cancelled { attempts, .. } => *attempts,
        }
    }
}

impl fmt::Display for BundleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Landed {
                bundle_id,
                slot,
                transactions,
                ..
            } => write!(
                f,
                "bundle {bundle_id} landed in slot {slot} ({} transactions)",
                transactions.len()
            ),
            Self::Failed {
                bundle_id,
                slot,
                error,
                ..
            } => write!(f, "bundle {bundle_id} failed in slot {slot}: {error}"),
            Self::Unexpected {
                bundle_id, status, ..
            } => write!(
                f,
                "bundle {bundle_id} reported unexpected status {status}; check it manually"
            ),
            Self::Unknown {
                bundle_id, attempts, ..
            } => write!(
                f,
                "bundle {bundle_id}: final status unknown after {attempts} attempts"
            ),
            Self::Aborted {
                bundle_id, error, ..
            } => write!(f, "bundle {bundle_id}: status query failed: {error}"),
            Self::Cancelled {
                bundle_id, attempts, ..
            } => write!(f, "bundle {bundle_id}: polling cancelled after {attempts} attempts"),
        }
    }
}

/// Poll one bundle until it is finalized, fails, reports something
/// unexpected, or the policy runs out.
#[instrument(skip(source, policy, cancel), fields(max_attempts = policy.max_attempts))]
pub async fn watch_bundle<S: BundleStatusSource>(
    source: &S,
    bundle_id: &str,
    policy: &PollPolicy,
    cancel: Option<watch::Receiver<bool>>,
) -> BundleOutcome {
    let request = vec![bundle_id.to_string()];
    let ids: &[String] = &request;

    let outcome = poll(
        policy,
        cancel,
        move |_| source.bundle_statuses(ids),
        |attempt, response: BundleStatusResponse| {
            let progress = classify_bundle(response.find(bundle_id));
            log_bundle_progress(attempt, &progress);
            if progress.is_terminal() {
                PollStep::Done(progress)
            } else {
                PollStep::Continue
            }
        },
    )
    .await;

    let bundle_id = bundle_id.to_string();
    match outcome {
        PollOutcome::Completed { value, attempts } => match value {
            BundleProgress::Landed { slot, transactions } => BundleOutcome::Landed {
                bundle_id,
                slot,
                transactions,
                attempts,
            },
            BundleProgress::Failed { slot, error } => BundleOutcome::Failed {
                bundle_id,
                slot,
                error,
                attempts,
            },
            BundleProgress::Unexpected(status) => BundleOutcome::Unexpected {
                bundle_id,
                status,
                attempts,
            },
            // Non-terminal progress never completes the loop.
            BundleProgress::NotFound
            | BundleProgress::Processed { .. }
            | BundleProgress::Confirmed { .. } => BundleOutcome::Unknown {
                bundle_id,
                attempts,
                last_error: None,
            },
        },
        PollOutcome::Exhausted {
            attempts,
            last_error,
        } => BundleOutcome::Unknown {
            bundle_id,
            attempts,
            last_error,
        },
        PollOutcome::Aborted { attempts, error } => BundleOutcome::Aborted {
            bundle_id,
            attempts,
            error,
        },
        PollOutcome::Cancelled { attempts } => BundleOutcome::Cancelled {
            bundle_id,
            attempts,
        },
    }
}

fn log_bundle_progress(attempt: u32, progress: &BundleProgress) {
    match progress {
        BundleProgress::NotFound => info!(attempt, "no bundle status available yet"),
        BundleProgress::Processed { slot } => {
            info!(attempt, slot, "bundle processed, continuing to poll")
        }
        BundleProgress::Confirmed { slot } => {
            info!(attempt, slot, "bundle confirmed, waiting for finalization")
        }
        BundleProgress::Landed { slot, transactions } => {
            info!(attempt, slot, txs = transactions.len(), "bundle finalized and executed");
            for sig in transactions {
                info!("  {}", solscan_url(sig));
            }
        }
        BundleProgress::Failed { slot, error } => {
            warn!(attempt, slot, error = %error, "bundle finalized with execution error")
        }
        BundleProgress::Unexpected(status) => {
            warn!(attempt, status = %status, "unexpected bundle status, check the bundle manually")
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Single transactions
// ═══════════════════════════════════════════════════════════════════════════

/// Ledger view of one transaction signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureStatus {
    pub signature: String,
    pub slot: u64,
    /// `None` once the slot is rooted.
    pub confirmations: Option<u64>,
    pub err: Option<String>,
}

/// Anything that can answer `getSignatureStatuses` for one signature.
pub trait SignatureStatusSource {
    fn signature_status(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<Option<SignatureStatus>>> + Send;
}

impl SignatureStatusSource for RpcClient {
    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        let sig = Signature::from_str(signature)
            .map_err(|e| JitoRpcError::InvalidSignature(format!("{signature}: {e}")))?;

        let response = self
            .get_signature_statuses_with_history(&[sig])
            .await
            .map_err(|e| JitoRpcError::SolanaRpc(e.to_string()))?;

        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .map(|status| SignatureStatus {
                signature: signature.to_string(),
                slot: status.slot,
                confirmations: status.confirmations.map(|c| c as u64),
                err: status.err.map(|e| e.to_string()),
            }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureProgress {
    NotFound,
    Pending { slot: u64, confirmations: u64 },
    /// Threshold reached, or the slot is already rooted (`None`).
    Confirmed { slot: u64, confirmations: Option<u64> },
    Failed { slot: u64, error: String },
}

impl SignatureProgress {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed { .. } | Self::Failed { .. })
    }
}

/// Errors win over confirmations; an absent count means rooted.
pub fn classify_signature(status: Option<&SignatureStatus>, threshold: u64) -> SignatureProgress {
    let Some(status) = status else {
        return SignatureProgress::NotFound;
    };

    if let Some(ref error) = status.err {
        return SignatureProgress::Failed {
            slot: status.slot,
            error: error.clone(),
        };
    }

    match status.confirmations {
        Some(n) if n < threshold => SignatureProgress::Pending {
            slot: status.slot,
            confirmations: n,
        },
        confirmations => SignatureProgress::Confirmed {
            slot: status.slot,
            confirmations,
        },
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureOutcome {
    Confirmed {
        signature: String,
        slot: u64,
        confirmations: Option<u64>,
        attempts: u32,
    },
    Failed {
        signature: String,
        slot: u64,
        error: String,
        attempts: u32,
    },
    Unknown {
        signature: String,
        attempts: u32,
        last_error: Option<String>,
    },
    Aborted {
        signature: String,
        attempts: u32,
        error: String,
    },
    Cancelled { signature: String, attempts: u32 },
}

impl SignatureOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn signature(&self) -> &str {
        match self {
            Self::Confirmed { signature, .. }
            | Self::Failed { signature, .. }
            | Self::Unknown { signature, .. }
            | Self::Aborted { signature, .. }
            | Self::Cancelled { signature, .. } => signature,
        }
    }
}

impl fmt::Display for SignatureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed {
                signature,
                confirmations,
                ..
            } => match confirmations {
                Some(n) => write!(f, "transaction {signature} confirmed with {n} confirmations"),
                None => write!(f, "transaction {signature} finalized"),
            },
            Self::Failed {
                signature, error, ..
            } => write!(f, "transaction {signature} failed: {error}"),
            Self::Unknown {
                signature, attempts, ..
            } => write!(
                f,
                "transaction {signature} did not reach the confirmation threshold after {attempts} attempts"
            ),
            Self::Aborted {
                signature, error, ..
            } => write!(f, "transaction {signature}: status query failed: {error}"),
            Self::Cancelled {
                signature, attempts, ..
            } => write!(f, "transaction {signature}: polling cancelled after {attempts} attempts"),
        }
    }
}

/// Poll one signature until it errors or reaches `threshold` confirmations.
#[instrument(skip(source, policy, cancel), fields(max_attempts = policy.max_attempts))]
pub async fn watch_signature<S: SignatureStatusSource>(
    source: &S,
    signature: &str,
    threshold: u64,
    policy: &PollPolicy,
    cancel: Option<watch::Receiver<bool>>,
) -> SignatureOutcome {
    let outcome = poll(
        policy,
        cancel,
        move |_| source.signature_status(signature),
        |attempt, status: Option<SignatureStatus>| {
            let progress = classify_signature(status.as_ref(), threshold);
            match &progress {
                SignatureProgress::NotFound => {
                    info!(attempt, "transaction status not available yet")
                }
                SignatureProgress::Pending {
                    slot,
                    confirmations,
                } => info!(attempt, slot, confirmations, threshold, "waiting for confirmations"),
                SignatureProgress::Confirmed {
                    slot,
                    confirmations,
                } => info!(attempt, slot, ?confirmations, "transaction confirmed"),
                SignatureProgress::Failed { slot, error } => {
                    warn!(attempt, slot, error = %error, "transaction failed")
                }
            }
            if progress.is_terminal() {
                PollStep::Done(progress)
            } else {
                PollStep::Continue
            }
        },
    )
    .await;

    let signature = signature.to_string();
    match outcome {
        PollOutcome::Completed { value, attempts } => match value {
            SignatureProgress::Confirmed {
                slot,
                confirmations,
            } => SignatureOutcome::Confirmed {
                signature,
                slot,
                confirmations,
                attempts,
            },
            SignatureProgress::Failed { slot, error } => SignatureOutcome::Failed {
                signature,
                slot,
                error,
                attempts,
            },
            SignatureProgress::NotFound | SignatureProgress::Pending { .. } => {
                SignatureOutcome::Unknown {
                    signature,
                    attempts,
                    last_error: None,
                }
            }
        },
        PollOutcome::Exhausted {
            attempts,
            last_error,
        } => SignatureOutcome::Unknown {
            signature,
            attempts,
            last_error,
        },
        PollOutcome::Aborted { attempts, error } => SignatureOutcome::Aborted {
            signature,
            attempts,
            error,
        },
        PollOutcome::Cancelled { attempts } => SignatureOutcome::Cancelled {
            signature,
            attempts,
        },
    }
}
