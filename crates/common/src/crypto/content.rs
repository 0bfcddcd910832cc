//! Content encryption.
//!
//! Every node in the tree is encrypted under its own random [`FileKey`],
//! so revoking access to one file never exposes another. The at-rest
//! format is fixed:
//!
//! ```text
//! [ AES-256-CBC ciphertext of (plaintext || canary) ][ nonce: 16 bytes ]
//! ```
//!
//! The nonce trails the ciphertext, and an 8-byte canary trails the
//! plaintext. The canary check after decryption is the only tamper /
//! wrong-key signal for content and must never be skipped.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroize;

use super::{random_bytes, CryptoError, CANARY, KEY_SIZE, NONCE_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// A 256-bit symmetric key for a single file or directory.
///
/// Encrypts both the node's content and its display name. Distributed to
/// members only in wrapped form (see [`WrappedKey`](super::WrappedKey)).
/// Zeroized on drop so unwrapped keys do not linger in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct FileKey {
    bytes: [u8; KEY_SIZE],
}

impl FileKey {
    /// Generate a new random file key using a cryptographically secure RNG.
    pub fn generate() -> Self {
        Self {
            bytes: random_bytes::<KEY_SIZE>(),
        }
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Create a file key from a byte slice of exactly [`KEY_SIZE`] bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; KEY_SIZE] = data
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("file key is {} bytes", data.len())))?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for FileKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKey").field("bytes", &"[REDACTED]").finish()
    }
}

/// Encrypt content bytes under a file key.
///
/// Generates a fresh random nonce per call, appends the canary to the
/// plaintext, and emits `ciphertext || nonce`.
pub fn encrypt_content(key: &FileKey, plaintext: &[u8]) -> Vec<u8> {
    let nonce = random_bytes::<NONCE_SIZE>();

    let mut padded = Vec::with_capacity(plaintext.len() + CANARY.len());
    padded.extend_from_slice(plaintext);
    padded.extend_from_slice(&CANARY);

    let cipher = Aes256CbcEnc::new(key.as_bytes().into(), (&nonce).into());
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(&padded);
    padded.zeroize();

    let mut out = Vec::with_capacity(ciphertext.len() + NONCE_SIZE);
    out.extend_from_slice(&ciphertext);
    out.extend_from_slice(&nonce);
    out
}

/// Decrypt content bytes under a file key.
///
/// Splits the trailing nonce, decrypts, and verifies the canary trailer:
///
/// - [`CryptoError::Malformed`]: input shorter than a nonce, rejected
///   before any cipher work.
/// - [`CryptoError::Decryption`]: the cipher failed to decode (wrong key
///   detected through padding failure, or a corrupt envelope).
/// - [`CryptoError::Integrity`]: the cipher decoded but the canary does
///   not match; the file may have been tampered with. Never treated as
///   empty content.
pub fn decrypt_content(key: &FileKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::Malformed(data.len()));
    }

    let (ciphertext, nonce_bytes) = data.split_at(data.len() - NONCE_SIZE);
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::Decryption);
    }

    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);
    let cipher = Aes256CbcDec::new(key.as_bytes().into(), (&nonce).into());
    let mut decrypted = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decryption)?;

    if decrypted.len() < CANARY.len() {
        decrypted.zeroize();
        return Err(CryptoError::Integrity);
    }
    let canary_at = decrypted.len() - CANARY.len();
    if decrypted[canary_at..] != CANARY {
        decrypted.zeroize();
        return Err(CryptoError::Integrity);
    }

    decrypted.truncate(canary_at);
    Ok(decrypted)
}
