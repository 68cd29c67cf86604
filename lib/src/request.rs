//! Join-split request assembly.
//!
//! A [`TransferRequest`] can only be obtained through [`TransferRequest::new`]
//! or one of the builders below, all of which check shape and conservation:
//!
//! ```text
//! sum(output values) - sum(input values) + k_public == 0
//! ```

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use serde::Serialize;
use thiserror::Error;

use crate::{sum_values, LedgerAddress, Note, NotePublicKey, Selection};

/// Creates fresh notes bound to a public key. Implemented by the external
/// note library (it picks blinding factors and encrypts the value).
pub trait NoteFactory {
    fn create_note(&self, owner: &NotePublicKey, value: u64) -> Result<Note, RequestError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MalformedReason {
    /// `input_note_owners` is not parallel to `input_notes`
    OwnerCountMismatch { notes: usize, owners: usize },
    /// Owner at `index` does not hold the key the input note is bound to
    OwnerMismatch { index: usize },
    /// Neither inputs nor outputs
    Empty,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::OwnerCountMismatch { notes, owners } => {
                write!(f, "{notes} input notes but {owners} input note owners")
            }
            MalformedReason::OwnerMismatch { index } => {
                write!(f, "input note {index} is not owned by the listed owner")
            }
            MalformedReason::Empty => write!(f, "request has no input or output notes"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("malformed join-split request: {0}")]
    Malformed(MalformedReason),
    #[error("unbalanced join-split request: {outputs} out - {inputs} in + {k_public} public != 0")]
    Unbalanced {
        inputs: u128,
        outputs: u128,
        k_public: i128,
    },
    /// The note library could not produce an output note
    #[error("note construction failed: {0}")]
    NoteConstruction(String),
}

/// Addresses every request carries besides its notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parties {
    /// Account submitting the proof
    pub sender: LedgerAddress,
    /// Public balance `k_public` is drawn from or released to
    pub public_owner: LedgerAddress,
    /// Join-split validator the proof is bound to
    pub validator: LedgerAddress,
}

/// Unchecked request fields, see [`TransferRequest::new`].
#[derive(Clone, Debug)]
pub struct RequestParts {
    pub input_notes: Vec<Note>,
    pub input_note_owners: Vec<NotePublicKey>,
    pub output_notes: Vec<Note>,
    pub parties: Parties,
    pub k_public: i128,
}

/// A balanced join-split proof request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    input_notes: Vec<Note>,
    output_notes: Vec<Note>,
    sender: LedgerAddress,
    input_note_owners: Vec<NotePublicKey>,
    public_owner: LedgerAddress,
    k_public: i128,
    validator: LedgerAddress,
}

impl TransferRequest {
    /// Validate shape, then conservation.
    pub fn new(parts: RequestParts) -> Result<Self, RequestError> {
        let request = TransferRequest {
            input_notes: parts.input_notes,
            output_notes: parts.output_notes,
            sender: parts.parties.sender,
            input_note_owners: parts.input_note_owners,
            public_owner: parts.parties.public_owner,
            k_public: parts.k_public,
            validator: parts.parties.validator,
        };
        request.check()?;
        Ok(request)
    }

    /// Re-run every invariant. Called again right before a proof is requested.
    pub fn check(&self) -> Result<(), RequestError> {
        if self.input_notes.is_empty() && self.output_notes.is_empty() {
            return Err(RequestError::Malformed(MalformedReason::Empty));
        }
        if self.input_note_owners.len() != self.input_notes.len() {
            return Err(RequestError::Malformed(MalformedReason::OwnerCountMismatch {
                notes: self.input_notes.len(),
                owners: self.input_note_owners.len(),
            }));
        }
        if let Some(index) = self
            .input_notes
            .iter()
            .zip(&self.input_note_owners)
            .position(|(note, owner)| note.owner != *owner)
        {
            return Err(RequestError::Malformed(MalformedReason::OwnerMismatch { index }));
        }

        let inputs = sum_values(&self.input_notes);
        let outputs = sum_values(&self.output_notes);
        let unbalanced = RequestError::Unbalanced {
            inputs,
            outputs,
            k_public: self.k_public,
        };
        let (Ok(ins), Ok(outs)) = (i128::try_from(inputs), i128::try_from(outputs)) else {
            return Err(unbalanced);
        };
        match outs.checked_sub(ins).and_then(|d| d.checked_add(self.k_public)) {
            Some(0) => Ok(()),
            _ => Err(unbalanced),
        }
    }

    pub fn input_notes(&self) -> &[Note] {
        &self.input_notes
    }

    pub fn output_notes(&self) -> &[Note] {
        &self.output_notes
    }

    pub fn input_note_owners(&self) -> &[NotePublicKey] {
        &self.input_note_owners
    }

    pub fn sender(&self) -> LedgerAddress {
        self.sender
    }

    pub fn public_owner(&self) -> LedgerAddress {
        self.public_owner
    }

    pub fn validator(&self) -> LedgerAddress {
        self.validator
    }

    /// Negative: public balance → notes. Positive: notes → public balance.
    pub fn k_public(&self) -> i128 {
        self.k_public
    }

    /// Amount drawn from the public owner's token balance, if any.
    pub fn public_deposit(&self) -> Option<u128> {
        (self.k_public < 0).then(|| self.k_public.unsigned_abs())
    }
}

// =============================================================================
//                          REQUEST BUILDERS
// =============================================================================

/// Private note-to-note transfer.
///
/// Produces exactly two outputs, `[change → change_owner, value → recipient]`,
/// with `k_public = 0`. The change note is created even when the remainder is
/// zero so every private transfer has the same shape.
pub fn private_transfer<F: NoteFactory + ?Sized>(
    factory: &F,
    selection: &Selection,
    input_note_owners: Vec<NotePublicKey>,
    change_owner: &NotePublicKey,
    recipient: &NotePublicKey,
    value: u64,
    parties: Parties,
) -> Result<TransferRequest, RequestError> {
    let change = factory.create_note(change_owner, selection.remainder)?;
    let payment = factory.create_note(recipient, value)?;
    TransferRequest::new(RequestParts {
        input_notes: selection.notes.clone(),
        input_note_owners,
        output_notes: vec![change, payment],
        parties: Parties {
            public_owner: parties.sender,
            ..parties
        },
        k_public: 0,
    })
}

/// Convert `sum(values)` of the public owner's token balance into one new
/// note per value (pure creation, no inputs).
pub fn mint_in<F: NoteFactory + ?Sized>(
    factory: &F,
    owner: &NotePublicKey,
    values: &[u64],
    parties: Parties,
) -> Result<TransferRequest, RequestError> {
    let output_notes: Vec<Note> = values
        .iter()
        .map(|value| factory.create_note(owner, *value))
        .collect::<Result<_, _>>()?;
    let total = sum_values(&output_notes);
    let k_public = i128::try_from(total).map_err(|_| RequestError::Unbalanced {
        inputs: 0,
        outputs: total,
        k_public: 0,
    })?;
    TransferRequest::new(RequestParts {
        input_notes: Vec::new(),
        input_note_owners: Vec::new(),
        output_notes,
        parties,
        k_public: -k_public,
    })
}

/// Release `value` from the selected notes to the public owner's balance.
///
/// A change note is created only for a non-zero remainder; otherwise the
/// request destroys its inputs without creating anything.
pub fn redeem_out<F: NoteFactory + ?Sized>(
    factory: &F,
    selection: &Selection,
    input_note_owners: Vec<NotePublicKey>,
    change_owner: &NotePublicKey,
    value: u64,
    parties: Parties,
) -> Result<TransferRequest, RequestError> {
    let output_notes = if selection.remainder > 0 {
        vec![factory.create_note(change_owner, selection.remainder)?]
    } else {
        Vec::new()
    };
    TransferRequest::new(RequestParts {
        input_notes: selection.notes.clone(),
        input_note_owners,
        output_notes,
        parties,
        k_public: value as i128,
    })
}
