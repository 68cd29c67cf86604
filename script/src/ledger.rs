//! Ledger client seam and its JSON-RPC implementation.

use std::time::Duration;

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::Provider;
use alloy::transports::{RpcError, TransportError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The node could not be reached or answered garbage
    #[error("transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error (bad nonce, fees, revert, ...)
    #[error("rejected by node: {0}")]
    Rejected(String),
}

impl From<TransportError> for LedgerError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => LedgerError::Rejected(payload.message.to_string()),
            other => LedgerError::Transport(other.to_string()),
        }
    }
}

/// Terminal outcome of a mined transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    /// false: mined but execution reverted
    pub success: bool,
}

/// A locally signed transaction, ready for broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub hash: TxHash,
    /// Calldata, kept for inspection
    pub input: Bytes,
    /// EIP-2718 encoded envelope
    pub raw: Bytes,
}

/// What the orchestrator needs from the ledger. Every method is a
/// suspension point.
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    async fn chain_id(&self) -> Result<u64, LedgerError>;

    /// Transaction count of `address` including pending transactions, i.e.
    /// the next nonce to use.
    async fn pending_nonce(&self, address: Address) -> Result<u64, LedgerError>;

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError>;

    /// Suspend until `tx_hash` is mined. Unbounded; callers apply their own
    /// timeout.
    async fn confirmation(&self, tx_hash: TxHash) -> Result<Receipt, LedgerError>;
}

/// [`LedgerClient`] over an alloy provider.
pub struct RpcLedger<P> {
    provider: P,
    poll_interval: Duration,
}

impl<P: Provider> RpcLedger<P> {
    pub fn new(provider: P, poll_interval: Duration) -> Self {
        RpcLedger {
            provider,
            poll_interval,
        }
    }
}

impl<P: Provider> LedgerClient for RpcLedger<P> {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, LedgerError> {
        Ok(self.provider.get_transaction_count(address).pending().await?)
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let pending = self.provider.send_raw_transaction(tx.raw.as_ref()).await?;
        Ok(*pending.tx_hash())
    }

    async fn confirmation(&self, tx_hash: TxHash) -> Result<Receipt, LedgerError> {
        loop {
            if let Some(receipt) = self.provider.get_transaction_receipt(tx_hash).await? {
                return Ok(Receipt {
                    tx_hash: receipt.transaction_hash(),
                    block_number: receipt.block_number(),
                    gas_used: receipt.gas_used(),
                    success: receipt.status(),
                });
            }
            debug!(%tx_hash, "receipt not available yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
