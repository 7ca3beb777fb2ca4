/// Jito block-engine JSON-RPC client.
///
/// Typed wrappers over [`RpcTransport`] for the `/bundles` and
/// `/transactions` resources.  Each method decodes its own payload shape at
/// this boundary, so callers never see untyped JSON except through
/// [`JitoJsonRpcClient::get_inflight_bundle_statuses`], whose shape varies by
/// deployment.
///
/// Errors are surfaced immediately; nothing here retries.
use rand::{seq::SliceRandom, Rng};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use crate::bundle::{Bundle, BundleStatusResponse, TipAccount, TxEncoding};
use crate::config::{endpoints, ClientConfig};
use crate::error::{JitoRpcError, Result};
use crate::rpc::RpcTransport;

// ─── Method names ───────────────────────────────────────────────────────────

pub mod methods {
    pub const GET_TIP_ACCOUNTS: &str = "getTipAccounts";
    pub const SEND_BUNDLE: &str = "sendBundle";
    pub const GET_BUNDLE_STATUSES: &str = "getBundleStatuses";
    pub const GET_INFLIGHT_BUNDLE_STATUSES: &str = "getInflightBundleStatuses";
    pub const SEND_TRANSACTION: &str = "sendTransaction";
}

// ─── Client ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct JitoJsonRpcClient {
    transport: RpcTransport,
}

impl JitoJsonRpcClient {
    /// Client for `base_url`, with an optional access token.
    pub fn new(base_url: &str, uuid: Option<String>) -> Self {
        Self::with_config(ClientConfig::new(base_url, uuid))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            transport: RpcTransport::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.transport.config()
    }

    // ── Tip accounts ────────────────────────────────────────────────────

    /// Current tip-account pool.  Not cached: membership rotates.
    #[instrument(skip_all)]
    pub async fn get_tip_accounts(&self) -> Result<Vec<String>> {
        let payload = self
            .transport
            .send(endpoints::BUNDLES_PATH, &[], methods::GET_TIP_ACCOUNTS, None)
            .await?;

        let accounts: Vec<String> = decode(methods::GET_TIP_ACCOUNTS, payload)?;
        debug!(count = accounts.len(), "fetched tip accounts");
        Ok(accounts)
    }

    /// Fetch the pool and pick one member uniformly at random.
    #[instrument(skip_all)]
    pub async fn get_random_tip_account(&self) -> Result<TipAccount> {
        let accounts = self.get_tip_accounts().await?;
        let picked = choose_tip_account(&accounts, &mut rand::thread_rng())?;
        debug!(tip_account = %picked, pool = accounts.len(), "selected tip account");
        Ok(picked)
    }

    // ── Bundle submission ───────────────────────────────────────────────

    /// Submit an ordered list of base58-encoded transactions as one bundle.
    ///
    /// Returns the bundle id assigned by the block engine.
    pub async fn send_bundle(&self, transactions: Vec<String>) -> Result<String> {
        self.submit_bundle(&Bundle::new(transactions)?).await
    }

    /// Like [`send_bundle`](Self::send_bundle) with an explicit encoding.
    pub async fn send_bundle_with_encoding(
        &self,
        transactions: Vec<String>,
        encoding: TxEncoding,
    ) -> Result<String> {
        self.submit_bundle(&Bundle::with_encoding(transactions, encoding)?)
            .await
    }

    #[instrument(skip_all, fields(bundle_size = bundle.len(), encoding = bundle.encoding().as_str()))]
    pub async fn submit_bundle(&self, bundle: &Bundle) -> Result<String> {
        info!("submitting bundle to block engine");

        let payload = self
            .transport
            .send(
                endpoints::BUNDLES_PATH,
                &[],
                methods::SEND_BUNDLE,
                Some(bundle.to_params()),
            )
            .await?;

        let bundle_id: String = decode(methods::SEND_BUNDLE, payload)?;
        info!(bundle_id = %bundle_id, "bundle accepted by block engine");
        Ok(bundle_id)
    }

    // ── Bundle status ───────────────────────────────────────────────────

    /// Landed-bundle statuses.  Records come back in server order; match
    /// them with [`BundleStatusResponse::find`], never by position.
    #[instrument(skip_all, fields(n_ids = bundle_ids.len()))]
    pub async fn get_bundle_statuses(&self, bundle_ids: &[String]) -> Result<BundleStatusResponse> {
        let payload = self
            .transport
            .send(
                endpoints::BUNDLES_PATH,
                &[],
                methods::GET_BUNDLE_STATUSES,
                Some(json!([bundle_ids])),
            )
            .await?;

        decode(methods::GET_BUNDLE_STATUSES, payload)
    }

    /// Raw `getInflightBundleStatuses` passthrough.
    #[instrument(skip_all)]
    pub async fn get_inflight_bundle_statuses(&self, params: Option<Value>) -> Result<Value> {
        self.transport
            .send(
                endpoints::BUNDLES_PATH,
                &[],
                methods::GET_INFLIGHT_BUNDLE_STATUSES,
                params,
            )
            .await
    }

    // ── Single transaction submission ───────────────────────────────────

    /// Submit one encoded transaction through `/transactions`.
    ///
    /// * `bundle_only = true`  → the block engine only lands it inside a
    ///   bundle, never forwarding it on its own.
    ///
    /// Returns the transaction signature.
    #[instrument(skip_all, fields(bundle_only = bundle_only, encoding = encoding.as_str()))]
    pub async fn send_transaction(
        &self,
        encoded_tx: &str,
        encoding: TxEncoding,
        bundle_only: bool,
    ) -> Result<String> {
        let params = match encoding.options() {
            Some(opts) => json!([encoded_tx, opts]),
            None => json!([encoded_tx]),
        };
        let query: &[(&str, &str)] = if bundle_only {
            &[("bundleOnly", "true")]
        } else {
            &[]
        };

        let payload = self
            .transport
            .send(
                endpoints::TRANSACTIONS_PATH,
                query,
                methods::SEND_TRANSACTION,
                Some(params),
            )
            .await?;

        let signature: String = decode(methods::SEND_TRANSACTION, payload)?;
        info!(signature = %signature, "transaction accepted");
        Ok(signature)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Pick one pool member uniformly with `rng`.
pub fn choose_tip_account<R: Rng + ?Sized>(pool: &[String], rng: &mut R) -> Result<TipAccount> {
    pool.choose(rng)
        .map(|address| TipAccount {
            address: address.clone(),
        })
        .ok_or(JitoRpcError::EmptyTipPool)
}

fn decode<T: DeserializeOwned>(method: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|e| JitoRpcError::Decode {
        method: method.to_string(),
        detail: e.to_string(),
    })
}
