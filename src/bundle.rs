/// Bundle types for Jito atomic transaction bundles.
///
/// A bundle is an ordered list of 1–5 signed transactions that execute
/// atomically, in order, in a single slot.  Once the block engine accepts a
/// bundle it hands back an opaque bundle id used for status queries.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::error::{JitoRpcError, Result};

/// Maximum number of transactions the block engine accepts in one bundle.
pub const MAX_BUNDLE_SIZE: usize = 5;

// ─── Transaction encoding ───────────────────────────────────────────────────

/// Text encoding of serialised transactions on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TxEncoding {
    /// Default when no encoding option is sent.
    #[default]
    Base58,
    Base64,
}

impl TxEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base58 => "base58",
            Self::Base64 => "base64",
        }
    }

    /// Option object appended to `sendBundle` / `sendTransaction` params.
    /// Base58 is the server default and sends no option object.
    pub fn options(&self) -> Option<Value> {
        match self {
            Self::Base58 => None,
            Self::Base64 => Some(json!({ "encoding": self.as_str() })),
        }
    }
}

// ─── Bundle ─────────────────────────────────────────────────────────────────

/// Ordered, immutable list of encoded transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bundle {
    transactions: Vec<String>,
    encoding: TxEncoding,
}

impl Bundle {
    /// Base58-encoded bundle.
    pub fn new(transactions: Vec<String>) -> Result<Self> {
        Self::with_encoding(transactions, TxEncoding::Base58)
    }

    pub fn with_encoding(transactions: Vec<String>, encoding: TxEncoding) -> Result<Self> {
        if transactions.is_empty() || transactions.len() > MAX_BUNDLE_SIZE {
            return Err(JitoRpcError::InvalidBundleSize {
                count: transactions.len(),
                max: MAX_BUNDLE_SIZE,
            });
        }
        Ok(Self {
            transactions,
            encoding,
        })
    }

    pub fn transactions(&self) -> &[String] {
        &self.transactions
    }

    pub fn encoding(&self) -> TxEncoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// `sendBundle` params: the wire expects a list of bundles, so the
    /// transaction list is nested one level deeper.
    pub fn to_params(&self) -> Value {
        match self.encoding.options() {
            Some(opts) => json!([self.transactions, opts]),
            None => json!([self.transactions]),
        }
    }
}

// ─── Tip account ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TipAccount {
    pub address: String,
}

impl fmt::Display for TipAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

// ─── Bundle status ──────────────────────────────────────────────────────────

/// Commitment level reported by `getBundleStatuses`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
    /// Anything the server sends that we do not recognise.
    Other(String),
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ConfirmationStatus {
    fn from(s: &str) -> Self {
        match s {
            "processed" => Self::Processed,
            "confirmed" => Self::Confirmed,
            "finalized" => Self::Finalized,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConfirmationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

impl Serialize for ConfirmationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One entry of `getBundleStatuses`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BundleStatusRecord {
    pub bundle_id: String,
    /// Signatures of the bundle's transactions, in bundle order.
    #[serde(default)]
    pub transactions: Vec<String>,
    #[serde(default)]
    pub slot: u64,
    pub confirmation_status: ConfirmationStatus,
    /// Raw execution result: `null` or `{"Ok": null}` on success.
    #[serde(default)]
    pub err: Value,
}

impl BundleStatusRecord {
    /// The execution error, if the bundle failed.
    pub fn execution_error(&self) -> Option<&Value> {
        match &self.err {
            Value::Null => None,
            Value::Object(map) if map.contains_key("Ok") => None,
            other => Some(other),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// Decoded `getBundleStatuses` result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleStatusResponse {
    #[serde(default)]
    pub context: RpcContext,
    /// Unknown bundles are either omitted or reported as `null`.
    #[serde(default)]
    pub value: Vec<Option<BundleStatusRecord>>,
}

impl BundleStatusResponse {
    /// Look a record up by id.  Server order need not match request order.
    pub fn find(&self, bundle_id: &str) -> Option<&BundleStatusRecord> {
        self.records().find(|r| r.bundle_id == bundle_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &BundleStatusRecord> {
        self.value.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.records().next().is_none()
    }
}
