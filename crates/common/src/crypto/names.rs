//! Name encryption.
//!
//! File and directory names are encrypted under the node's [`FileKey`] and
//! stored as a single opaque string safe for any filename or URL context:
//!
//! ```text
//! hex(nonce: 16 bytes) ++ base64(AES-256-CBC ciphertext)
//! ```
//!
//! There is no separator; the hex prefix is always exactly 32 characters,
//! so the split point is unambiguous.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use super::{random_bytes, FileKey, NONCE_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const HEX_NONCE_LEN: usize = NONCE_SIZE * 2;

/// Encrypt a name under a file key, with a fresh nonce per call.
pub fn encrypt_name(key: &FileKey, name: &str) -> String {
    let nonce = random_bytes::<NONCE_SIZE>();

    let cipher = Aes256CbcEnc::new(key.as_bytes().into(), (&nonce).into());
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(name.as_bytes());

    format!("{}{}", hex::encode(nonce), BASE64.encode(ciphertext))
}

/// Decrypt an encoded name under a file key.
///
/// SOFT FAILURE: on any decode, decrypt, or UTF-8 failure the input is
/// returned unchanged instead of raising. Callers must treat a result that
/// still [`looks_encrypted`] as a failed decryption; directory listings
/// rely on this to display entries whose keys are not yet available.
pub fn decrypt_name(key: &FileKey, encoded: &str) -> String {
    match try_decrypt_name(key, encoded) {
        Some(name) => name,
        None => {
            tracing::debug!("name did not decrypt, returning it encoded");
            encoded.to_string()
        }
    }
}

fn try_decrypt_name(key: &FileKey, encoded: &str) -> Option<String> {
    let nonce_hex = encoded.get(..HEX_NONCE_LEN)?;
    let mut nonce = [0u8; NONCE_SIZE];
    hex::decode_to_slice(nonce_hex, &mut nonce).ok()?;

    let ciphertext = BASE64.decode(&encoded[HEX_NONCE_LEN..]).ok()?;
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return None;
    }

    let cipher = Aes256CbcDec::new(key.as_bytes().into(), (&nonce).into());
    let plaintext = cipher.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext).ok()?;

    String::from_utf8(plaintext).ok()
}

/// Whether a string still has the shape of an encoded name (a 32-char hex
/// nonce prefix). Used to recognize the soft-failure path of
/// [`decrypt_name`].
pub fn looks_encrypted(name: &str) -> bool {
    match name.get(..HEX_NONCE_LEN) {
        Some(prefix) => prefix.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}
