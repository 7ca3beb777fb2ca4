/// Transaction assembly for Jito bundles.
///
/// A typical bundle is two legacy transactions signed by the same payer:
///
/// 1. a **tip transaction**, a plain SOL transfer to one of the block
///    engine's tip accounts;
/// 2. a **payload transaction** carrying the actual work (here a transfer
///    plus an optional memo and compute-unit price).
///
/// Both are signed, `bincode`-serialised, text-encoded and handed to
/// [`assemble_bundle`] in the order they must execute.
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
    system_instruction,
    transaction::Transaction,
};
use tracing::{debug, instrument};

use crate::bundle::{Bundle, TxEncoding};
use crate::error::{JitoRpcError, Result};

/// Maximum serialised transaction size on Solana.
pub const MAX_TX_SIZE: usize = 1_232;

/// Smallest tip worth sending.
pub const MIN_TIP_LAMPORTS: u64 = 1_000;

/// SPL Memo program.
pub const MEMO_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

// ─── Instructions ───────────────────────────────────────────────────────────

pub fn parse_pubkey(s: &str) -> Result<Pubkey> {
    Pubkey::from_str(s).map_err(|e| JitoRpcError::InvalidPubkey(format!("{s}: {e}")))
}

pub fn memo_instruction(message: &str) -> Instruction {
    Instruction::new_with_bytes(MEMO_PROGRAM_ID, message.as_bytes(), vec![])
}

pub fn compute_unit_price_instruction(micro_lamports: u64) -> Instruction {
    ComputeBudgetInstruction::set_compute_unit_price(micro_lamports)
}

// ─── Transactions ───────────────────────────────────────────────────────────

/// What goes into the payload transaction.
#[derive(Clone, Debug)]
pub struct PayloadConfig {
    pub receiver: Pubkey,
    pub lamports: u64,
    pub memo: Option<String>,
    /// Priority fee in micro-lamports per compute unit.
    pub compute_unit_price: Option<u64>,
}

/// Compile `instructions` into a legacy transaction paid and signed by
/// `payer`, then check it fits in a packet.
#[instrument(skip_all, fields(payer = %payer.pubkey(), n_instructions = instructions.len()))]
pub fn sign_transaction(
    instructions: &[Instruction],
    payer: &Keypair,
    recent_blockhash: Hash,
) -> Result<Transaction> {
    let mut tx = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
    tx.try_sign(&[payer], recent_blockhash)?;

    let size = serialize_transaction(&tx)?.len();
    if size > MAX_TX_SIZE {
        return Err(JitoRpcError::TransactionTooLarge {
            size,
            max: MAX_TX_SIZE,
        });
    }

    debug!(tx_size = size, "transaction signed");
    Ok(tx)
}

/// SOL transfer from `payer` to `tip_account`.
pub fn build_tip_transaction(
    payer: &Keypair,
    tip_account: &Pubkey,
    tip_lamports: u64,
    recent_blockhash: Hash,
) -> Result<Transaction> {
    if tip_lamports < MIN_TIP_LAMPORTS {
        return Err(JitoRpcError::InvalidTipAmount(tip_lamports, MIN_TIP_LAMPORTS));
    }

    let ix = system_instruction::transfer(&payer.pubkey(), tip_account, tip_lamports);
    sign_transaction(&[ix], payer, recent_blockhash)
}

/// Optional compute-unit price first, then the transfer, then the memo.
pub fn build_payload_transaction(
    payer: &Keypair,
    config: &PayloadConfig,
    recent_blockhash: Hash,
) -> Result<Transaction> {
    let mut instructions = Vec::with_capacity(3);
    if let Some(price) = config.compute_unit_price {
        instructions.push(compute_unit_price_instruction(price));
    }
    instructions.push(system_instruction::transfer(
        &payer.pubkey(),
        &config.receiver,
        config.lamports,
    ));
    if let Some(ref memo) = config.memo {
        instructions.push(memo_instruction(memo));
    }

    sign_transaction(&instructions, payer, recent_blockhash)
}

// ─── Encoding ───────────────────────────────────────────────────────────────

pub fn serialize_transaction(tx: &Transaction) -> Result<Vec<u8>> {
    bincode::serialize(tx).map_err(|e| JitoRpcError::Serialization(e.to_string()))
}

pub fn encode_transaction(tx: &Transaction, encoding: TxEncoding) -> Result<String> {
    let bytes = serialize_transaction(tx)?;
    Ok(match encoding {
        TxEncoding::Base58 => bs58::encode(bytes).into_string(),
        TxEncoding::Base64 => general_purpose::STANDARD.encode(bytes),
    })
}

/// First signature of a signed transaction, base58.
pub fn transaction_signature(tx: &Transaction) -> String {
    tx.signatures
        .first()
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// Encode `transactions` in execution order into a [`Bundle`].
pub fn assemble_bundle(transactions: &[Transaction], encoding: TxEncoding) -> Result<Bundle> {
    let encoded = transactions
        .iter()
        .map(|tx| encode_transaction(tx, encoding))
        .collect::<Result<Vec<_>>>()?;
    Bundle::with_encoding(encoded, encoding)
}

// ─── Wallet ─────────────────────────────────────────────────────────────────

/// Load a keypair from a `solana-keygen` JSON file.
pub fn load_keypair(path: impl AsRef<Path>) -> Result<Keypair> {
    let path = path.as_ref();
    read_keypair_file(path).map_err(|e| JitoRpcError::Keypair(format!("{}: {e}", path.display())))
}
