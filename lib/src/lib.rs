#![no_std]
extern crate alloc;

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

pub mod request;
pub mod select;

pub use request::{
    mint_in, private_transfer, redeem_out, MalformedReason, NoteFactory, Parties, RequestError,
    RequestParts, TransferRequest,
};
pub use select::{largest_first, select_notes, SelectError, Selection};

// =============================================================================
//                          KECCAK256 HELPERS
// =============================================================================

/// Compute keccak256 hash. This matches Solidity's keccak256() opcode.
/// Note: tiny_keccak::Keccak is the original Keccak-256 (NOT SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

/// keccak256 over the concatenation of several byte strings, without
/// allocating the concatenation.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

// =============================================================================
//                          LEDGER IDENTITIES
// =============================================================================

/// 20-byte ledger address (EVM account).
pub type LedgerAddress = [u8; 20];

/// Public key a note is bound to. Whoever holds the matching secret can
/// decrypt the note's value and spend it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotePublicKey(pub [u8; 32]);

impl NotePublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

const NOTE_SECRET_DOMAIN: &[u8] = b"confidential-transfer/note-secret/v1";

/// Derive the note decryption secret from an account's signing key.
/// note_secret = keccak256(domain || private_key)
pub fn derive_note_secret(private_key: &[u8; 32]) -> [u8; 32] {
    keccak256_concat(&[NOTE_SECRET_DOMAIN, private_key])
}

// =============================================================================
//                              NOTE TYPE
// =============================================================================

/// A confidential note as seen by its owner.
///
/// `value` is only known after decrypting `public_id` with the owner's
/// secret. `public_id` is the opaque metadata published on-ledger and
/// `note_hash` is the identity creation/destruction events refer to.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Key the note is bound to
    pub owner: NotePublicKey,
    /// Concealed value
    pub value: u64,
    /// Encoded note metadata (opaque to the orchestrator)
    pub public_id: Vec<u8>,
    /// Ledger identity of the note
    pub note_hash: [u8; 32],
}

/// Compute a note hash.
///
/// note_hash = keccak256(value_be_8bytes || owner_32bytes || blinding_32bytes)
/// Total preimage: 72 bytes.
pub fn note_hash(value: u64, owner: &NotePublicKey, blinding: &[u8; 32]) -> [u8; 32] {
    let mut preimage = [0u8; 72];
    preimage[0..8].copy_from_slice(&value.to_be_bytes());
    preimage[8..40].copy_from_slice(&owner.0);
    preimage[40..72].copy_from_slice(blinding);
    keccak256(&preimage)
}

/// Sum of note values. u128 cannot overflow for any realistic note count.
pub fn sum_values<'a>(notes: impl IntoIterator<Item = &'a Note>) -> u128 {
    notes.into_iter().map(|n| n.value as u128).sum()
}

// =============================================================================
//                              TESTS
// =============================================================================
