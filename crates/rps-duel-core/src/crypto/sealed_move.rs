//! Sealed moves: a move encrypted under a per-round key.
//!
//! The ciphertext is sent first as a binding commitment; the key follows
//! once both commitments have crossed the channel.

use crate::games::Move;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Nonce length for ChaCha20-Poly1305
pub const NONCE_LEN: usize = 12;

/// Key length for ChaCha20-Poly1305
pub const KEY_LEN: usize = 32;

/// Errors from sealing or opening a move
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("commitment failed verification: wrong key or tampered ciphertext")]
    VerificationFailed,

    #[error("commitment decrypted to a non-move plaintext")]
    InvalidPlaintext,
}

/// Symmetric key for one round, never reused
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveKey([u8; KEY_LEN]);

impl MoveKey {
    /// Create a new random key
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl fmt::Debug for MoveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MoveKey({})", hex::encode(&self.0[..8]))
    }
}

/// Commitment to a move: nonce plus authenticated ciphertext
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMove {
    pub iv: [u8; NONCE_LEN],
    pub data: Vec<u8>,
}

impl SealedMove {
    /// Seal a move under a fresh key and nonce
    pub fn seal(mv: Move) -> Result<(MoveKey, SealedMove), CryptoError> {
        let key = MoveKey::random();
        let sealed = Self::seal_with(mv, &key)?;
        Ok((key, sealed))
    }

    /// Seal a move under the given key with a fresh nonce
    pub fn seal_with(mv: Move, key: &MoveKey) -> Result<SealedMove, CryptoError> {
        let mut iv = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let data = key
            .cipher()
            .encrypt(Nonce::from_slice(&iv), mv.as_str().as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(SealedMove { iv, data })
    }

    /// Decrypt and verify with the disclosed key
    pub fn open(&self, key: &MoveKey) -> Result<Move, CryptoError> {
        let plaintext = key
            .cipher()
            .decrypt(Nonce::from_slice(&self.iv), self.data.as_slice())
            .map_err(|_| CryptoError::VerificationFailed)?;

        std::str::from_utf8(&plaintext)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(CryptoError::InvalidPlaintext)
    }

    /// SHA-256 over nonce and ciphertext, for correlating commitments in logs
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.iv);
        hasher.update(&self.data);
        hasher.finalize().into()
    }
}

impl fmt::Debug for SealedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedMove({})", hex::encode(&self.fingerprint()[..8]))
    }
}
