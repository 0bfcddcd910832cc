use std::fmt;

use curve25519_dalek::montgomery::MontgomeryPoint;
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::{random_bytes, CryptoError};

/// Size of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of an Ed25519 private key seed in bytes.
pub const SECRET_KEY_SIZE: usize = 32;

/// The public half of a member's identity key pair.
///
/// Anyone holding this key can wrap a file key for the member; only the
/// matching [`SecretKey`] can unwrap it again. Stored and exchanged as PEM
/// (the member directory) or hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(VerifyingKey);

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        PublicKey(key)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff: [u8; PUBLIC_KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey(format!("public key is {} bytes", bytes.len())))?;
        let key = VerifyingKey::from_bytes(&buff)
            .map_err(|_| CryptoError::InvalidKey("not a valid edwards point".to_string()))?;
        Ok(PublicKey(key))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string.
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| CryptoError::InvalidKey("public key hex decode error".to_string()))?;
        Self::try_from(buff.as_slice())
    }

    /// Convert public key to raw bytes.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Convert public key to hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Encode the public key in PEM format for the member directory.
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("PUBLIC KEY", self.to_bytes().to_vec());
        pem::encode(&pem)
    }

    /// Parse a public key from PEM format.
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| CryptoError::InvalidKey(format!("failed to parse PEM: {e}")))?;
        if pem.tag() != "PUBLIC KEY" {
            return Err(CryptoError::InvalidKey(
                "invalid PEM tag, expected PUBLIC KEY".to_string(),
            ));
        }
        Self::try_from(pem.contents())
    }

    /// Convert the Ed25519 public key to X25519 (Montgomery curve) for ECDH.
    ///
    /// Key wrapping runs Diffie-Hellman on the Montgomery curve, so the
    /// Edwards point is mapped over before agreement.
    pub(crate) fn to_x25519(&self) -> X25519PublicKey {
        let montgomery: MontgomeryPoint = self.0.to_montgomery();
        X25519PublicKey::from(montgomery.to_bytes())
    }
}

/// The private half of a member's identity key pair.
///
/// Never stored in the clear: at rest it lives inside the encrypted blob
/// produced by [`Identity::generate`](super::Identity::generate), and in
/// memory it is held by a session for exactly as long as the session lasts.
/// The inner key material is zeroized on drop.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&"[REDACTED]").finish()
    }
}

impl From<[u8; SECRET_KEY_SIZE]> for SecretKey {
    fn from(seed: [u8; SECRET_KEY_SIZE]) -> Self {
        SecretKey(SigningKey::from_bytes(&seed))
    }
}

impl SecretKey {
    /// Generate a new random secret key using a cryptographically secure RNG.
    pub fn generate() -> Self {
        Self::from(random_bytes::<SECRET_KEY_SIZE>())
    }

    /// Derive the public key from this secret key.
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// Convert secret key to raw seed bytes.
    pub fn to_bytes(&self) -> [u8; SECRET_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// Parse a secret key from a hexadecimal string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; SECRET_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| CryptoError::InvalidKey("private key hex decode error".to_string()))?;
        Ok(Self::from(buff))
    }

    /// Convert secret key to hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Convert the Ed25519 secret key to X25519 for ECDH.
    ///
    /// The clamped scalar of the Ed25519 key doubles as the X25519 private
    /// key, matching the public-side Edwards→Montgomery mapping.
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0.to_scalar_bytes())
    }
}
