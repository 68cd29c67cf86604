//! Accounts and their private keys.
//!
//! One private key both signs ledger transactions and (through a derived
//! X25519 secret) decrypts the account's notes. Key bytes are kept in
//! zeroizing storage and never formatted.

use std::fmt;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use confidential_transfer_lib::{derive_note_secret, NotePublicKey};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("private key is not valid hex")]
    InvalidHex,
    #[error("expected a 32-byte private key, got {0} bytes")]
    InvalidLength(usize),
    #[error("private key is not a valid secp256k1 scalar")]
    InvalidScalar,
}

/// Raw 32-byte private key, wiped on drop.
#[derive(Clone)]
pub struct AccountKey(Zeroizing<[u8; 32]>);

impl AccountKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        AccountKey(Zeroizing::new(bytes))
    }

    /// Parse a hex private key, with or without `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = Zeroizing::new(hex::decode(s).map_err(|_| KeyError::InvalidHex)?);
        let key: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(bytes.len()))?;
        Ok(AccountKey::from_bytes(key))
    }

    pub(crate) fn expose(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build a signer for the duration of one signing operation.
    pub(crate) fn signer(&self) -> Result<PrivateKeySigner, KeyError> {
        PrivateKeySigner::from_slice(self.expose().as_slice()).map_err(|_| KeyError::InvalidScalar)
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountKey(<redacted>)")
    }
}

/// A ledger identity plus the note key it owns.
#[derive(Clone)]
pub struct Account {
    address: Address,
    public_key: NotePublicKey,
    key: AccountKey,
}

impl Account {
    pub fn from_key(key: AccountKey) -> Result<Self, KeyError> {
        let address = key.signer()?.address();
        let public_key = NotePublicKey(*note_secret(&key).public_key().as_bytes());
        Ok(Account {
            address,
            public_key,
            key,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn public_key(&self) -> &NotePublicKey {
        &self.public_key
    }

    pub(crate) fn key(&self) -> &AccountKey {
        &self.key
    }

    /// Note decryption secret. `crypto_box::SecretKey` zeroizes on drop.
    pub(crate) fn note_secret(&self) -> crypto_box::SecretKey {
        note_secret(&self.key)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("public_key", &hex::encode(self.public_key.0))
            .finish_non_exhaustive()
    }
}

fn note_secret(key: &AccountKey) -> crypto_box::SecretKey {
    let secret = Zeroizing::new(derive_note_secret(key.expose()));
    crypto_box::SecretKey::from(*secret)
}
