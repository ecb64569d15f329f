//! Cryptographic primitives for the commit-reveal scheme.
//!
//! This module provides:
//! - MoveKey, the per-round symmetric key that is disclosed last
//! - SealedMove, the authenticated ciphertext sent as a commitment

mod sealed_move;

pub use sealed_move::{CryptoError, MoveKey, SealedMove, KEY_LEN, NONCE_LEN};
