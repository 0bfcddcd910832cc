//! Cryptography for Coffer.
//!
//! # Key model
//!
//! ```text
//! Identity (Ed25519 key pair, per member)
//!   ├── private half encrypted at rest under Argon2id(credential secret)
//!   └── public half used to wrap per-file keys (X25519 ECDH + AES-KW)
//! FileKey (256-bit, random, one per node)
//!   ├── encrypts the node's content (AES-256-CBC + canary trailer)
//!   └── encrypts the node's display name (AES-256-CBC, hex/base64 encoded)
//! ```
//!
//! Every transform here is pure: no persistence, no shared state, safe to
//! run in parallel across unrelated files.

mod content;
mod keypair;
mod keys;
mod names;
mod wrap;

pub use content::{decrypt_content, encrypt_content, FileKey};
pub use keypair::{generate_identity, unlock_secret_key, Identity, KdfParams};
pub use keys::{PublicKey, SecretKey, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE};
pub use names::{decrypt_name, encrypt_name, looks_encrypted};
pub use wrap::{wrap_for_members, WrappedKey, WRAPPED_KEY_SIZE};

/// Size of a per-file symmetric key in bytes (256-bit).
pub const KEY_SIZE: usize = 32;

/// Size of a cipher nonce in bytes. Fixed by the at-rest formats: content
/// carries it as a 16-byte trailer, encoded names as a 32-char hex prefix.
pub const NONCE_SIZE: usize = 16;

/// Fixed marker appended to plaintext before content encryption and checked
/// after decryption. A mismatch after a successful cipher decode is the only
/// tamper / wrong-key signal for content.
pub const CANARY: [u8; 8] = *b"T_26_M10";

/// Errors raised by the cryptographic transforms.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Wrong key or corrupt envelope; the cipher itself failed to decode.
    #[error("decryption failed: wrong key or corrupt envelope")]
    Decryption,
    /// The cipher decoded but the canary trailer did not match: the
    /// ciphertext was tampered with, or a logic bug fed the wrong key.
    #[error("integrity check failed: content canary mismatch")]
    Integrity,
    /// Input too short to even carry a nonce.
    #[error("malformed ciphertext: {0} bytes is shorter than a nonce")]
    Malformed(usize),
    /// Key derivation refused its parameters.
    #[error("key derivation failed: {0}")]
    Kdf(String),
    /// A key was not a valid point/scalar for its algebra.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buff = [0u8; N];
    getrandom::getrandom(&mut buff).expect("system RNG failure");
    buff
}
