use thiserror::Error;

#[derive(Debug, Error)]
pub enum JitoRpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("RPC error from {method} (code {code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Malformed JSON-RPC envelope from {method}: {detail}")]
    MalformedEnvelope { method: String, detail: String },

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Unexpected payload from {method}: {detail}")]
    Decode { method: String, detail: String },

    #[error("No tip accounts available")]
    EmptyTipPool,

    #[error("Invalid pubkey {0}")]
    InvalidPubkey(String),

    #[error("Invalid signature {0}")]
    InvalidSignature(String),

    #[error("Signing error: {0}")]
    Signing(#[from] solana_sdk::signer::SignerError),

    #[error("Invalid tip amount: {0} lamports (minimum: {1})")]
    InvalidTipAmount(u64, u64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction too large: {size} bytes (maximum: {max})")]
    TransactionTooLarge { size: usize, max: usize },

    #[error("Invalid bundle size: {count} transactions (allowed: 1..={max})")]
    InvalidBundleSize { count: usize, max: usize },

    #[error("Solana RPC error: {0}")]
    SolanaRpc(String),

    #[error("Keypair load failed: {0}")]
    Keypair(String),
}

impl JitoRpcError {
    /// Errors raised while talking to a remote endpoint, as opposed to
    /// local validation or assembly failures.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Timeout(_)
                | Self::Rpc { .. }
                | Self::MalformedEnvelope { .. }
                | Self::Decode { .. }
                | Self::SolanaRpc(_)
        )
    }

    /// JSON-RPC error code, when the server reported one.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, JitoRpcError>;
