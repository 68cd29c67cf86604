//! Spendable note reconstruction from the confidential token's events.

use std::collections::HashSet;

use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::Provider;
use confidential_transfer_lib::Note;
use thiserror::Error;
use tracing::{debug, info};

use crate::account::Account;
use crate::contracts::IZkAsset;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("note event query failed: {0}")]
    Query(String),
}

/// Opens note metadata with an account's secret. `None` when the note is not
/// the account's or the metadata is malformed.
pub trait NoteDecoder {
    fn decode_note(&self, metadata: &[u8], account: &Account) -> Option<Note>;
}

#[allow(async_fn_in_trait)]
pub trait NoteLedgerView {
    /// Notes owned by `account` that have been created and not yet destroyed,
    /// in creation order.
    async fn spendable_notes(&self, account: &Account) -> Result<Vec<Note>, ViewError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoteEventKind {
    Created { metadata: Bytes },
    Destroyed,
}

/// A note creation or destruction as logged by the confidential token. The
/// event's `owner` address is the submitting account, not the note's owner,
/// and is not kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteEvent {
    pub block: u64,
    pub log_index: u64,
    pub note_hash: B256,
    pub kind: NoteEventKind,
}

/// Replay `events` in (block, log index) order and return the account's
/// live notes.
///
/// Ownership is decided by the note key alone: a created note counts when its
/// metadata decodes with the account's secret to the hash the event
/// announced, whichever ledger account submitted it.
pub fn reconstruct<D: NoteDecoder + ?Sized>(
    mut events: Vec<NoteEvent>,
    decoder: &D,
    account: &Account,
) -> Vec<Note> {
    events.sort_by_key(|e| (e.block, e.log_index));

    let destroyed: HashSet<B256> = events
        .iter()
        .filter(|e| e.kind == NoteEventKind::Destroyed)
        .map(|e| e.note_hash)
        .collect();

    events
        .iter()
        .filter(|e| !destroyed.contains(&e.note_hash))
        .filter_map(|e| match &e.kind {
            NoteEventKind::Created { metadata } => decoder
                .decode_note(metadata, account)
                .filter(|note| note.note_hash == e.note_hash.0),
            NoteEventKind::Destroyed => None,
        })
        .collect()
}

/// [`NoteLedgerView`] scanning `CreateNote`/`DestroyNote` logs.
pub struct EventNoteView<P, D> {
    provider: P,
    asset: Address,
    from_block: u64,
    decoder: D,
}

impl<P: Provider, D: NoteDecoder> EventNoteView<P, D> {
    pub fn new(provider: P, asset: Address, from_block: u64, decoder: D) -> Self {
        EventNoteView {
            provider,
            asset,
            from_block,
            decoder,
        }
    }

    async fn events(&self) -> Result<Vec<NoteEvent>, ViewError> {
        let asset = IZkAsset::new(self.asset, &self.provider);
        let query_error = |e: alloy::contract::Error| ViewError::Query(e.to_string());

        let created = asset
            .CreateNote_filter()
            .from_block(self.from_block)
            .query()
            .await
            .map_err(query_error)?;
        let destroyed = asset
            .DestroyNote_filter()
            .from_block(self.from_block)
            .query()
            .await
            .map_err(query_error)?;
        debug!(created = created.len(), destroyed = destroyed.len(), "fetched note events");

        let mut events = Vec::with_capacity(created.len() + destroyed.len());
        for (event, log) in created {
            events.push(NoteEvent {
                block: log.block_number.unwrap_or(0),
                log_index: log.log_index.unwrap_or(0),
                note_hash: event.noteHash,
                kind: NoteEventKind::Created {
                    metadata: event.metadata,
                },
            });
        }
        for (event, log) in destroyed {
            events.push(NoteEvent {
                block: log.block_number.unwrap_or(0),
                log_index: log.log_index.unwrap_or(0),
                note_hash: event.noteHash,
                kind: NoteEventKind::Destroyed,
            });
        }
        Ok(events)
    }
}

impl<P: Provider, D: NoteDecoder> NoteLedgerView for EventNoteView<P, D> {
    async fn spendable_notes(&self, account: &Account) -> Result<Vec<Note>, ViewError> {
        let notes = reconstruct(self.events().await?, &self.decoder, account);
        info!(owner = %account.address(), notes = notes.len(), "reconstructed spendable notes");
        Ok(notes)
    }
}
