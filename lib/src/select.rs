//! Note selection: pick a prefix of an account's spendable notes that covers
//! a target amount.

use alloc::vec::Vec;
use thiserror::Error;

use crate::Note;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    #[error("transfer value must be greater than zero")]
    ZeroValue,
    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u64, have: u128 },
}

/// Notes chosen to cover a transfer, in the order they were offered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub notes: Vec<Note>,
    /// Sum of the selected note values
    pub total: u128,
    /// `total - target`, returned to the sender as change
    pub remainder: u64,
}

/// Greedily take notes from the front of `candidates` until their values
/// cover `value`.
///
/// The result is the shortest prefix whose sum is `>= value`. Candidates are
/// not reordered; callers wanting another policy sort first (see
/// [`largest_first`]). Nothing is marked as spent.
pub fn select_notes(candidates: &[Note], value: u64) -> Result<Selection, SelectError> {
    if value == 0 {
        return Err(SelectError::ZeroValue);
    }

    let target = value as u128;
    let mut total: u128 = 0;
    let mut taken = 0usize;

    while total < target {
        // Checked each round: the candidate list may be empty or run dry.
        let Some(note) = candidates.get(taken) else {
            return Err(SelectError::InsufficientBalance { need: value, have: total });
        };
        total += note.value as u128;
        taken += 1;
    }

    Ok(Selection {
        notes: candidates[..taken].to_vec(),
        total,
        // total - target < value of the last selected note, so this fits.
        remainder: (total - target) as u64,
    })
}

/// Stable sort by descending value; equal values keep ledger order.
pub fn largest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| b.value.cmp(&a.value));
}
