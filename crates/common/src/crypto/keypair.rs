//! Identity key pairs and their at-rest encryption.
//!
//! Every member owns one long-term Ed25519 key pair. The private half is
//! only ever stored inside an encrypted blob:
//!
//! ```text
//! [ salt: 16 bytes ][ nonce: 16 bytes ][ AES-256-CBC ciphertext of the seed ]
//! ```
//!
//! The blob key is derived from the member's credential secret with
//! Argon2id; the salt is fresh per identity and the derivation parameters
//! are explicit configuration, never hard-coded at call sites.
//!
//! A wrong secret is detected through unpadding failure of the blob cipher,
//! not a dedicated MAC. That detection is probabilistic (a wrong secret can
//! survive unpadding roughly once in 2^8) and is a known weakness of the
//! format; the seed-length check behind it narrows the window further.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroize;

use super::keys::{PublicKey, SecretKey, SECRET_KEY_SIZE};
use super::{random_bytes, CryptoError, KEY_SIZE, NONCE_SIZE};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the per-identity KDF salt in bytes.
const SALT_SIZE: usize = 16;

/// Argon2id parameters for deriving the private-key blob key.
///
/// These are deliberately configuration rather than constants: deployments
/// tune them to their hardware, and tests shrink them to stay fast.
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub mem_cost_kib: u32,
    /// Time cost (iterations).
    pub time_cost: u32,
    /// Lanes / parallelism.
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// A freshly generated identity: the public half in the clear, the private
/// half only as an encrypted blob.
#[derive(Debug, Clone)]
pub struct Identity {
    pub public_key: PublicKey,
    pub encrypted_secret_key: Vec<u8>,
}

impl Identity {
    /// Generate a new identity and encrypt its private key under `secret`.
    ///
    /// CPU-heavy (the KDF dominates); interactive callers should go through
    /// [`generate_identity`] instead so the work lands on the blocking pool.
    pub fn generate(secret: &str, params: &KdfParams) -> Result<Self, CryptoError> {
        let secret_key = SecretKey::generate();
        let public_key = secret_key.public();

        let salt = random_bytes::<SALT_SIZE>();
        let nonce = random_bytes::<NONCE_SIZE>();
        let mut blob_key = derive_blob_key(secret, &salt, params)?;

        let mut seed = secret_key.to_bytes();
        let cipher = Aes256CbcEnc::new((&blob_key).into(), (&nonce).into());
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(&seed);
        seed.zeroize();
        blob_key.zeroize();

        let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ciphertext.len());
        blob.extend_from_slice(&salt);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(Identity {
            public_key,
            encrypted_secret_key: blob,
        })
    }
}

/// Generate an identity off the interactive path.
///
/// Runs [`Identity::generate`] on the tokio blocking pool; the result is
/// delivered once, to the single caller awaiting this future. Nothing else
/// is blocked while the KDF grinds.
pub async fn generate_identity(secret: String, params: KdfParams) -> Result<Identity, CryptoError> {
    tokio::task::spawn_blocking(move || Identity::generate(&secret, &params))
        .await
        .map_err(|_| CryptoError::Kdf("identity generation task aborted".to_string()))?
}

/// Decrypt a private-key blob back into an in-memory [`SecretKey`].
///
/// Fails with [`CryptoError::Decryption`] when `secret` is wrong, detected
/// through unpadding failure or a seed of the wrong length.
pub fn unlock_secret_key(
    blob: &[u8],
    secret: &str,
    params: &KdfParams,
) -> Result<SecretKey, CryptoError> {
    if blob.len() < SALT_SIZE + NONCE_SIZE + 16 {
        return Err(CryptoError::Malformed(blob.len()));
    }

    let (salt_bytes, rest) = blob.split_at(SALT_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);
    if ciphertext.len() % 16 != 0 {
        return Err(CryptoError::Decryption);
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(salt_bytes);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(nonce_bytes);
    let mut blob_key = derive_blob_key(secret, &salt, params)?;

    let cipher = Aes256CbcDec::new((&blob_key).into(), (&nonce).into());
    let result = cipher.decrypt_padded_vec_mut::<Pkcs7>(ciphertext);
    blob_key.zeroize();

    let mut seed_bytes = result.map_err(|_| CryptoError::Decryption)?;
    if seed_bytes.len() != SECRET_KEY_SIZE {
        seed_bytes.zeroize();
        return Err(CryptoError::Decryption);
    }

    let mut seed = [0u8; SECRET_KEY_SIZE];
    seed.copy_from_slice(&seed_bytes);
    seed_bytes.zeroize();

    let secret_key = SecretKey::from(seed);
    seed.zeroize();
    Ok(secret_key)
}

fn derive_blob_key(
    secret: &str,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> Result<[u8; KEY_SIZE], CryptoError> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(secret.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id derivation failed: {e}")))?;
    Ok(key)
}
