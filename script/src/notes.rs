//! Local note library: sealed-box note metadata over X25519/XSalsa20-Poly1305.
//!
//! Metadata layout (published on-ledger as the note's public id):
//!
//! ```text
//! ephemeral_pk (32) || nonce (24) || box(value_be (8) || blinding (32))
//! ```
//!
//! The note hash is `keccak256(value_be || owner || blinding)`, so whoever
//! opens the box can both recover the value and check the note's identity.

use confidential_transfer_lib::{note_hash, Note, NoteFactory, NotePublicKey, RequestError};
use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::account::Account;
use crate::view::NoteDecoder;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;
const PLAINTEXT_LEN: usize = 8 + 32;
const TAG_LEN: usize = 16;
pub const METADATA_LEN: usize = KEY_LEN + NONCE_LEN + PLAINTEXT_LEN + TAG_LEN;

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalNotes;

impl NoteFactory for LocalNotes {
    fn create_note(&self, owner: &NotePublicKey, value: u64) -> Result<Note, RequestError> {
        let mut rng = rand::thread_rng();
        let mut blinding = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut blinding[..]);

        let mut plaintext = Zeroizing::new([0u8; PLAINTEXT_LEN]);
        plaintext[..8].copy_from_slice(&value.to_be_bytes());
        plaintext[8..].copy_from_slice(&blinding[..]);

        let ephemeral = SecretKey::generate(&mut rng);
        let sealer = SalsaBox::new(&PublicKey::from(*owner.as_bytes()), &ephemeral);
        let nonce = SalsaBox::generate_nonce(&mut rng);
        let ciphertext = sealer
            .encrypt(&nonce, &plaintext[..])
            .map_err(|e| RequestError::NoteConstruction(e.to_string()))?;

        let mut public_id = Vec::with_capacity(METADATA_LEN);
        public_id.extend_from_slice(ephemeral.public_key().as_bytes());
        public_id.extend_from_slice(&nonce);
        public_id.extend_from_slice(&ciphertext);

        Ok(Note {
            owner: *owner,
            value,
            public_id,
            note_hash: note_hash(value, owner, &blinding),
        })
    }
}

impl NoteDecoder for LocalNotes {
    fn decode_note(&self, metadata: &[u8], account: &Account) -> Option<Note> {
        if metadata.len() != METADATA_LEN {
            return None;
        }
        let (ephemeral, rest) = metadata.split_at(KEY_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let ephemeral: [u8; KEY_LEN] = ephemeral.try_into().ok()?;

        let opener = SalsaBox::new(&PublicKey::from(ephemeral), &account.note_secret());
        let plaintext = Zeroizing::new(
            opener
                .decrypt(GenericArray::from_slice(nonce), ciphertext)
                .ok()?,
        );
        let value = u64::from_be_bytes(plaintext[..8].try_into().ok()?);
        let blinding: Zeroizing<[u8; 32]> = Zeroizing::new(plaintext[8..].try_into().ok()?);

        let owner = *account.public_key();
        Some(Note {
            owner,
            value,
            public_id: metadata.to_vec(),
            note_hash: note_hash(value, &owner, &blinding),
        })
    }
}
