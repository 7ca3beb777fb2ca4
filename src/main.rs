/// `jito-rpc`: command-line access to the Jito block-engine JSON-RPC API.
///
/// # Usage
/// ```bash
/// # Tip accounts on the default mainnet endpoint:
/// jito-rpc tip-accounts
///
/// # Custom endpoint and access token:
/// JITO_URL=https://ny.mainnet.block-engine.jito.wtf/api/v1 \
/// JITO_UUID=my-uuid \
/// jito-rpc watch-bundle <BUNDLE_ID>
///
/// # Tip + transfer bundle, then wait for finality:
/// jito-rpc send-bundle --keypair ~/.config/solana/id.json --receiver <PUBKEY>
/// ```
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{commitment_config::CommitmentConfig, signer::Signer};
use tokio::sync::watch;
use tracing::{error, info, warn};

use jito_rpc_client::config::ClientConfig;
use jito_rpc_client::poller::PollPolicy;
use jito_rpc_client::rpc::prettify_json;
use jito_rpc_client::status::{self, DEFAULT_CONFIRMATION_THRESHOLD};
use jito_rpc_client::tx_builder::{self, PayloadConfig};
use jito_rpc_client::{BundleOutcome, JitoJsonRpcClient, SignatureOutcome, TxEncoding};

const DEFAULT_SOLANA_RPC: &str = "https://api.mainnet-beta.solana.com";

#[derive(Parser, Debug)]
#[command(name = "jito-rpc", version, about = "Jito block-engine JSON-RPC client")]
struct Cli {
    /// Block-engine base URL [default: $JITO_URL, then mainnet].
    #[arg(long)]
    url: Option<String>,

    /// Access token sent as x-jito-auth and ?uuid= [default: $JITO_UUID].
    #[arg(long)]
    uuid: Option<String>,

    /// Per-request timeout in seconds [default: 30].
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the current tip accounts.
    TipAccounts,
    /// Pick one tip account at random.
    RandomTip,
    /// Landed status for one or more bundles.
    BundleStatus { bundle_ids: Vec<String> },
    /// Raw in-flight status for one or more bundles.
    Inflight { bundle_ids: Vec<String> },
    /// Poll a bundle until it is finalized.
    WatchBundle {
        bundle_id: String,
        #[command(flatten)]
        poll: PollArgs,
    },
    /// Poll a transaction signature until it reaches the confirmation threshold.
    WatchSignature {
        signature: String,
        #[arg(long, env = "RPC_URL", default_value = DEFAULT_SOLANA_RPC)]
        rpc_url: String,
        #[arg(long, default_value_t = DEFAULT_CONFIRMATION_THRESHOLD)]
        confirmations: u64,
        #[arg(long, default_value_t = PollPolicy::TRANSACTION_MAX_ATTEMPTS)]
        max_attempts: u32,
        #[arg(long, default_value_t = PollPolicy::TRANSACTION_INTERVAL.as_secs())]
        interval_secs: u64,
    },
    /// Build a tip + transfer bundle, submit it, and watch it.
    SendBundle {
        /// solana-keygen JSON keypair file.
        #[arg(long)]
        keypair: String,
        #[arg(long)]
        receiver: String,
        #[arg(long, default_value_t = 1_000)]
        lamports: u64,
        #[arg(long, default_value_t = 1_000)]
        tip_lamports: u64,
        #[arg(long, default_value = "Hello, Jito!")]
        memo: String,
        #[arg(long, env = "RPC_URL", default_value = DEFAULT_SOLANA_RPC)]
        rpc_url: String,
        #[arg(long)]
        base64: bool,
        #[command(flatten)]
        poll: PollArgs,
    },
}

#[derive(clap::Args, Debug)]
struct PollArgs {
    #[arg(long, default_value_t = PollPolicy::BUNDLE_MAX_ATTEMPTS)]
    max_attempts: u32,
    #[arg(long, default_value_t = PollPolicy::BUNDLE_INTERVAL.as_secs())]
    interval_secs: u64,
    /// Bound on each status query [default: the interval].
    #[arg(long)]
    query_timeout_secs: Option<u64>,
}

impl PollArgs {
    fn policy(&self) -> PollPolicy {
        let policy = PollPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs));
        match self.query_timeout_secs {
            Some(secs) => policy.with_query_timeout(Duration::from_secs(secs)),
            None => policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jito_rpc_client=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    // Flags win over JITO_URL / JITO_UUID.
    let from_env = ClientConfig::from_env();
    let mut config = ClientConfig::new(
        cli.url.unwrap_or(from_env.base_url),
        cli.uuid.or(from_env.uuid),
    );
    if let Some(secs) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    let jito = JitoJsonRpcClient::with_config(config);
    info!(url = %jito.config().base_url, authenticated = jito.config().uuid.is_some(), "client ready");

    match cli.command {
        Command::TipAccounts => {
            let accounts = jito.get_tip_accounts().await?;
            println!("{}", prettify_json(&json!(accounts)));
        }
        Command::RandomTip => {
            let tip = jito.get_random_tip_account().await?;
            println!("{tip}");
        }
        Command::BundleStatus { bundle_ids } => {
            let statuses = jito.get_bundle_statuses(&bundle_ids).await?;
            println!("{}", prettify_json(&serde_json::to_value(&statuses)?));
        }
        Command::Inflight { bundle_ids } => {
            let raw = jito
                .get_inflight_bundle_statuses(Some(json!([bundle_ids])))
                .await?;
            println!("{}", prettify_json(&raw));
        }
        Command::WatchBundle { bundle_id, poll } => {
            let outcome =
                status::watch_bundle(&jito, &bundle_id, &poll.policy(), Some(ctrl_c_signal())).await;
            report_bundle(&outcome);
        }
        Command::WatchSignature {
            signature,
            rpc_url,
            confirmations,
            max_attempts,
            interval_secs,
        } => {
            let rpc = RpcClient::new(rpc_url);
            let policy = PollPolicy::new(max_attempts, Duration::from_secs(interval_secs));
            let outcome = status::watch_signature(
                &rpc,
                &signature,
                confirmations,
                &policy,
                Some(ctrl_c_signal()),
            )
            .await;
            report_signature(&outcome);
        }
        Command::SendBundle {
            keypair,
            receiver,
            lamports,
            tip_lamports,
            memo,
            rpc_url,
            base64,
            poll,
        } => {
            let payer = tx_builder::load_keypair(&keypair)?;
            info!(pubkey = %payer.pubkey(), "wallet loaded");

            let receiver = tx_builder::parse_pubkey(&receiver)?;
            let tip_account = jito.get_random_tip_account().await?;
            let tip_pubkey = tx_builder::parse_pubkey(&tip_account.address)?;

            let rpc = RpcClient::new_with_commitment(rpc_url, CommitmentConfig::finalized());
            let blockhash = rpc
                .get_latest_blockhash()
                .await
                .context("failed to fetch latest blockhash")?;

            let tip_tx =
                tx_builder::build_tip_transaction(&payer, &tip_pubkey, tip_lamports, blockhash)?;
            let main_tx = tx_builder::build_payload_transaction(
                &payer,
                &PayloadConfig {
                    receiver,
                    lamports,
                    memo: Some(memo),
                    compute_unit_price: None,
                },
                blockhash,
            )?;

            let encoding = if base64 {
                TxEncoding::Base64
            } else {
                TxEncoding::Base58
            };
            let bundle = tx_builder::assemble_bundle(&[tip_tx, main_tx], encoding)?;
            let bundle_id = jito
                .submit_bundle(&bundle)
                .await
                .context("failed to send bundle")?;
            println!("Bundle sent successfully. Bundle ID: {bundle_id}");

            let outcome =
                status::watch_bundle(&jito, &bundle_id, &poll.policy(), Some(ctrl_c_signal())).await;
            report_bundle(&outcome);
        }
    }

    Ok(())
}

/// Flips to `true` on Ctrl-C so pollers stop between attempts.
fn ctrl_c_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current attempt");
            tx.send(true).ok();
        }
    });
    rx
}

fn report_bundle(outcome: &BundleOutcome) {
    match outcome {
        BundleOutcome::Landed { transactions, .. } => {
            info!("{outcome}");
            println!("Bundle executed successfully. Transaction URLs:");
            for sig in transactions {
                println!("- {}", status::solscan_url(sig));
            }
        }
        BundleOutcome::Failed { .. }
        | BundleOutcome::Unexpected { .. }
        | BundleOutcome::Aborted { .. } => error!("{outcome}"),
        BundleOutcome::Unknown { last_error, .. } => {
            warn!(last_error = ?last_error, "{outcome}")
        }
        BundleOutcome::Cancelled { .. } => warn!("{outcome}"),
    }
}

fn report_signature(outcome: &SignatureOutcome) {
    match outcome {
        SignatureOutcome::Confirmed { signature, .. } => {
            info!("{outcome}");
            println!("View transaction on Solscan: {}", status::solscan_url(signature));
        }
        SignatureOutcome::Failed { .. } | SignatureOutcome::Aborted { .. } => error!("{outcome}"),
        SignatureOutcome::Unknown { signature, .. } => {
            warn!("{outcome}");
            println!("View transaction on Solscan: {}", status::solscan_url(signature));
        }
        SignatureOutcome::Cancelled { .. } => warn!("{outcome}"),
    }
}
