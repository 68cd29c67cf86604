//! In-memory collaborators for unit tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{Address, TxHash};
use confidential_transfer_lib::{Note, Parties};

use crate::account::{Account, AccountKey};
use crate::config::Contracts;
use crate::ledger::{LedgerClient, LedgerError, Receipt, SignedTransaction};
use crate::notes::LocalNotes;
use crate::view::{reconstruct, NoteEvent, NoteEventKind, NoteLedgerView, ViewError};

pub fn account(n: u8) -> Account {
    Account::from_key(AccountKey::from_bytes([n; 32])).unwrap()
}

pub fn contracts() -> Contracts {
    Contracts {
        token: Address::repeat_byte(0xA1),
        zk_asset: Address::repeat_byte(0xA2),
        note_registry: Address::repeat_byte(0xA3),
        join_split: Address::repeat_byte(0xA4),
    }
}

pub fn parties(account: &Account) -> Parties {
    Parties {
        sender: account.address().into_array(),
        public_owner: account.address().into_array(),
        validator: contracts().join_split.into_array(),
    }
}

#[derive(Default)]
pub struct MockState {
    pub nonces: HashMap<Address, u64>,
    pub submitted: Vec<SignedTransaction>,
    pub receipts: HashMap<TxHash, Receipt>,
    /// Reject every broadcast with this message
    pub reject_all: Option<String>,
    /// Reject broadcasts whose calldata starts with this selector
    pub reject_selector: Option<[u8; 4]>,
    /// Mine calls with this selector as reverted
    pub revert_selector: Option<[u8; 4]>,
    /// Never resolve confirmations
    pub hang_confirmations: bool,
    /// Fail receipt queries with this transport error
    pub fail_confirmations: Option<String>,
    /// Yield to the scheduler after reading a nonce
    pub yield_on_nonce: bool,
}

/// Ledger with per-account nonces that mines every accepted transaction
/// instantly.
#[derive(Default)]
pub struct MockLedger {
    inner: Mutex<MockState>,
}

impl MockLedger {
    pub const CHAIN_ID: u64 = 31337;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap()
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state().submitted.clone()
    }

    pub fn selectors(&self) -> Vec<[u8; 4]> {
        self.submitted().iter().map(|tx| selector(&tx.input)).collect()
    }
}

fn selector(input: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    let n = input.len().min(4);
    out[..n].copy_from_slice(&input[..n]);
    out
}

impl LedgerClient for MockLedger {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(Self::CHAIN_ID)
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, LedgerError> {
        let (nonce, yield_now) = {
            let state = self.state();
            (state.nonces.get(&address).copied().unwrap_or(0), state.yield_on_nonce)
        };
        if yield_now {
            tokio::task::yield_now().await;
        }
        Ok(nonce)
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let mut state = self.state();
        if let Some(reason) = &state.reject_all {
            return Err(LedgerError::Rejected(reason.clone()));
        }
        let expected = state.nonces.get(&tx.from).copied().unwrap_or(0);
        if tx.nonce != expected {
            return Err(LedgerError::Rejected(format!(
                "nonce too low: next nonce {expected}, tx nonce {}",
                tx.nonce
            )));
        }
        let sel = selector(&tx.input);
        if state.reject_selector == Some(sel) {
            return Err(LedgerError::Rejected("execution reverted".into()));
        }

        state.nonces.insert(tx.from, expected + 1);
        state.submitted.push(tx.clone());
        let block = state.submitted.len() as u64;
        let success = state.revert_selector != Some(sel);
        state.receipts.insert(
            tx.hash,
            Receipt {
                tx_hash: tx.hash,
                block_number: Some(block),
                gas_used: 21_000,
                success,
            },
        );
        Ok(tx.hash)
    }

    async fn confirmation(&self, tx_hash: TxHash) -> Result<Receipt, LedgerError> {
        let (hang, receipt) = {
            let state = self.state();
            if let Some(reason) = &state.fail_confirmations {
                return Err(LedgerError::Transport(reason.clone()));
            }
            (state.hang_confirmations, state.receipts.get(&tx_hash).cloned())
        };
        if hang {
            std::future::pending::<()>().await;
        }
        receipt.ok_or_else(|| LedgerError::Transport(format!("unknown transaction {tx_hash}")))
    }
}

/// Note view over a fixed event log.
#[derive(Default)]
pub struct MemoryView {
    events: Mutex<Vec<NoteEvent>>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record creation of `notes` in one block.
    pub fn create(&self, notes: &[Note]) {
        let mut events = self.events.lock().unwrap();
        let block = events.len() as u64 + 1;
        for (i, note) in notes.iter().enumerate() {
            events.push(NoteEvent {
                block,
                log_index: i as u64,
                note_hash: note.note_hash.into(),
                kind: NoteEventKind::Created {
                    metadata: note.public_id.clone().into(),
                },
            });
        }
    }
}

impl NoteLedgerView for MemoryView {
    async fn spendable_notes(&self, account: &Account) -> Result<Vec<Note>, ViewError> {
        let events = self.events.lock().unwrap().clone();
        Ok(reconstruct(events, &LocalNotes, account))
    }
}
