//! Transaction submission: nonce assignment, local signing, broadcast and a
//! bounded wait for confirmation.
//!
//! The nonce is read from the ledger (pending tag) right before signing and
//! never cached. Two submissions from the same account that are not awaited
//! one after the other can therefore read the same nonce; the ledger rejects
//! the second one. Callers needing ordering await each submission.

use std::time::Duration;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use thiserror::Error;
use tracing::{info, warn};

use crate::account::{Account, AccountKey};
use crate::config::SubmitterConfig;
use crate::ledger::{LedgerClient, LedgerError, Receipt, SignedTransaction};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("could not read chain id: {0}")]
    ChainId(LedgerError),
    #[error("could not read pending nonce for {address}: {source}")]
    Sequence { address: Address, source: LedgerError },
    #[error("failed to sign transaction from {address}: {reason}")]
    Signing { address: Address, reason: String },
    #[error("transaction from {address} with nonce {nonce} rejected: {source}")]
    Submission {
        address: Address,
        nonce: u64,
        source: LedgerError,
    },
    #[error("transaction {tx_hash} reverted in block {:?}", receipt.block_number)]
    Reverted { tx_hash: TxHash, receipt: Receipt },
    #[error("waiting for {tx_hash} failed: {source}")]
    Confirmation { tx_hash: TxHash, source: LedgerError },
    #[error("no confirmation for {tx_hash} within {waited:?}; the transaction may still be mined")]
    ConfirmationTimeout { tx_hash: TxHash, waited: Duration },
}

/// Where to send what. The label only appears in logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub label: &'static str,
    pub to: Address,
    pub input: Bytes,
}

impl ContractCall {
    pub fn new(label: &'static str, to: Address, input: impl Into<Bytes>) -> Self {
        ContractCall {
            label,
            to,
            input: input.into(),
        }
    }
}

/// An unsigned legacy transaction with every field assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub chain_id: u64,
}

impl PendingTransaction {
    /// Sign with `key`. The signer only lives inside this call.
    pub async fn sign(self, key: &AccountKey) -> Result<SignedTransaction, SubmitError> {
        let signing_error = |reason: String| SubmitError::Signing {
            address: self.from,
            reason,
        };
        let wallet = EthereumWallet::from(key.signer().map_err(|e| signing_error(e.to_string()))?);

        let request = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.to)
            .with_input(self.input.clone())
            .with_nonce(self.nonce)
            .with_chain_id(self.chain_id)
            .with_gas_limit(self.gas_limit)
            .with_gas_price(self.gas_price);
        let envelope = request
            .build(&wallet)
            .await
            .map_err(|e| signing_error(e.to_string()))?;
        drop(wallet);

        let raw = envelope.encoded_2718();
        Ok(SignedTransaction {
            from: self.from,
            to: self.to,
            nonce: self.nonce,
            hash: keccak256(&raw),
            input: self.input,
            raw: raw.into(),
        })
    }
}

/// Submits one transaction at a time per call; holds no per-account state.
pub struct Submitter<L> {
    ledger: L,
    config: SubmitterConfig,
}

impl<L: LedgerClient> Submitter<L> {
    pub fn new(ledger: L, config: SubmitterConfig) -> Self {
        Submitter { ledger, config }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Assign a nonce, sign, broadcast and wait for a successful receipt.
    pub async fn submit(
        &self,
        account: &Account,
        call: ContractCall,
    ) -> Result<Receipt, SubmitError> {
        let signed = self.prepare(account, call.clone()).await?;
        let tx_hash = self
            .ledger
            .submit(&signed)
            .await
            .map_err(|source| SubmitError::Submission {
                address: signed.from,
                nonce: signed.nonce,
                source,
            })?;
        info!(
            from = %signed.from,
            to = %call.to,
            nonce = signed.nonce,
            %tx_hash,
            call = call.label,
            "transaction broadcast"
        );
        if tx_hash != signed.hash {
            warn!(
                local = %signed.hash,
                node = %tx_hash,
                "node reported a different transaction hash"
            );
        }

        let waited = self.config.confirmation_timeout;
        let confirmation = tokio::time::timeout(waited, self.ledger.confirmation(tx_hash));
        let receipt = match confirmation.await {
            Err(_) => return Err(SubmitError::ConfirmationTimeout { tx_hash, waited }),
            Ok(Err(source)) => return Err(SubmitError::Confirmation { tx_hash, source }),
            Ok(Ok(receipt)) => receipt,
        };
        if !receipt.success {
            return Err(SubmitError::Reverted { tx_hash, receipt });
        }
        info!(
            %tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            call = call.label,
            "transaction confirmed"
        );
        Ok(receipt)
    }

    /// Read chain id and the pending nonce, then sign.
    async fn prepare(
        &self,
        account: &Account,
        call: ContractCall,
    ) -> Result<SignedTransaction, SubmitError> {
        let from = account.address();
        let chain_id = self.ledger.chain_id().await.map_err(SubmitError::ChainId)?;
        let nonce = self
            .ledger
            .pending_nonce(from)
            .await
            .map_err(|source| SubmitError::Sequence { address: from, source })?;

        PendingTransaction {
            from,
            to: call.to,
            input: call.input,
            nonce,
            gas_limit: self.config.gas_limit,
            gas_price: self.config.gas_price,
            chain_id,
        }
        .sign(account.key())
        .await
    }
}
