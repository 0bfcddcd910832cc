//! Per-member key wrapping.
//!
//! A file's symmetric key is distributed by wrapping it once per authorized
//! member: ephemeral X25519 ECDH against the member's public key derives a
//! key-encryption key, which AES Key Wrap (RFC 3394) then uses to encrypt
//! the raw file key. Only the member's private key can re-derive the KEK
//! and unwrap.
//!
//! # Wire Format
//!
//! ```text
//! [ ephemeral_pubkey: 32 bytes ][ wrapped_file_key: 40 bytes ]
//! ```
//!
//! AES-KW adds 8 bytes to the 32-byte file key, so a wrapped key is always
//! exactly 72 bytes.

use std::collections::BTreeMap;

use aes_kw::KekAes256 as Kek;
use serde::{Deserialize, Serialize};

use super::keys::{PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::{CryptoError, FileKey, KEY_SIZE};

/// Bytes AES-KW appends to the wrapped key.
const KW_OVERHEAD: usize = 8;

/// Total size of a wrapped key in bytes.
pub const WRAPPED_KEY_SIZE: usize = PUBLIC_KEY_SIZE + KEY_SIZE + KW_OVERHEAD;

/// A file key wrapped for exactly one member.
///
/// The grant record in the access ledger stores one of these per
/// (file, member) pair; holding a wrapped key is useless without the
/// member's private key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WrappedKey([u8; WRAPPED_KEY_SIZE]);

impl std::fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WrappedKey").field(&self.to_hex()).finish()
    }
}

impl Serialize for WrappedKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for WrappedKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};
        use std::fmt;

        struct WrappedKeyVisitor;

        impl<'de> Visitor<'de> for WrappedKeyVisitor {
            type Value = WrappedKey;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a byte array of {WRAPPED_KEY_SIZE} bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: Error,
            {
                WrappedKey::try_from(v).map_err(|_| {
                    E::invalid_length(v.len(), &format!("{WRAPPED_KEY_SIZE} bytes").as_str())
                })
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut bytes = Vec::new();
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                WrappedKey::try_from(bytes.as_slice()).map_err(|_| {
                    A::Error::invalid_length(
                        bytes.len(),
                        &format!("{WRAPPED_KEY_SIZE} bytes").as_str(),
                    )
                })
            }
        }

        // bytes for compact formats, seq fallback for JSON
        deserializer.deserialize_byte_buf(WrappedKeyVisitor)
    }
}

impl From<[u8; WRAPPED_KEY_SIZE]> for WrappedKey {
    fn from(bytes: [u8; WRAPPED_KEY_SIZE]) -> Self {
        WrappedKey(bytes)
    }
}

impl TryFrom<&[u8]> for WrappedKey {
    type Error = CryptoError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let buff: [u8; WRAPPED_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("wrapped key is {} bytes", bytes.len()))
        })?;
        Ok(WrappedKey(buff))
    }
}

impl WrappedKey {
    /// Wrap a file key for a single member.
    ///
    /// 1. Generate an ephemeral Ed25519 key pair
    /// 2. X25519 ECDH between the ephemeral private and the member's
    ///    public key
    /// 3. AES-KW the raw file key under the shared secret
    /// 4. Emit `ephemeral_pubkey || wrapped_key`
    pub fn wrap(key: &FileKey, member: &PublicKey) -> Result<Self, CryptoError> {
        let ephemeral = SecretKey::generate();

        let shared = ephemeral.to_x25519().diffie_hellman(&member.to_x25519());
        let kek = Kek::from(*shared.as_bytes());
        let wrapped = kek
            .wrap_vec(key.as_bytes())
            .map_err(|_| CryptoError::InvalidKey("AES-KW wrap error".to_string()))?;

        let mut out = [0u8; WRAPPED_KEY_SIZE];
        out[..PUBLIC_KEY_SIZE].copy_from_slice(&ephemeral.public().to_bytes());
        out[PUBLIC_KEY_SIZE..].copy_from_slice(&wrapped);
        Ok(WrappedKey(out))
    }

    /// Unwrap the file key with the member's private key.
    ///
    /// Fails with [`CryptoError::Decryption`] when the private key does not
    /// match the public key this was wrapped for, or when the bytes were
    /// tampered with; AES-KW authenticates the wrapped payload.
    pub fn unwrap_with(&self, member_secret: &SecretKey) -> Result<FileKey, CryptoError> {
        // A garbled ephemeral point is a corrupt envelope, same failure
        // class as a key mismatch.
        let ephemeral_public =
            PublicKey::try_from(&self.0[..PUBLIC_KEY_SIZE]).map_err(|_| CryptoError::Decryption)?;

        let shared = member_secret
            .to_x25519()
            .diffie_hellman(&ephemeral_public.to_x25519());
        let kek = Kek::from(*shared.as_bytes());
        let unwrapped = kek
            .unwrap_vec(&self.0[PUBLIC_KEY_SIZE..])
            .map_err(|_| CryptoError::Decryption)?;

        FileKey::from_slice(&unwrapped).map_err(|_| CryptoError::Decryption)
    }

    /// Parse a wrapped key from a hexadecimal string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let mut buff = [0; WRAPPED_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff)
            .map_err(|_| CryptoError::InvalidKey("wrapped key hex decode error".to_string()))?;
        Ok(WrappedKey(buff))
    }

    /// Convert the wrapped key to a hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get a reference to the raw wrapped bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Wrap one file key for a whole member set.
///
/// Order-independent and all-or-nothing: if wrapping fails for any member
/// the entire batch is rejected and nothing is returned, so a caller can
/// never persist a partial grant set.
pub fn wrap_for_members(
    key: &FileKey,
    members: &BTreeMap<String, PublicKey>,
) -> Result<BTreeMap<String, WrappedKey>, CryptoError> {
    members
        .iter()
        .map(|(username, public_key)| Ok((username.clone(), WrappedKey::wrap(key, public_key)?)))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let key = FileKey::generate();
        let member_secret = SecretKey::generate();

        let wrapped = WrappedKey::wrap(&key, &member_secret.public()).unwrap();
        let recovered = wrapped.unwrap_with(&member_secret).unwrap();
        assert_eq!(key, recovered);
    }

    #[test]
    fn test_unwrap_with_wrong_key_fails() {
        let key = FileKey::generate();
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();

        let wrapped = WrappedKey::wrap(&key, &alice.public()).unwrap();
        assert!(wrapped.unwrap_with(&alice).is_ok());

        let err = wrapped.unwrap_with(&bob).unwrap_err();
        assert!(matches!(err, CryptoError::Decryption));
    }

    #[test]
    fn test_tampered_wrap_fails() {
        let key = FileKey::generate();
        let member = SecretKey::generate();

        let wrapped = WrappedKey::wrap(&key, &member.public()).unwrap();
        let mut bytes = [0u8; WRAPPED_KEY_SIZE];
        bytes.copy_from_slice(wrapped.bytes());
        // corrupt the AES-KW payload
        bytes[PUBLIC_KEY_SIZE + 3] ^= 0xFF;

        let err = WrappedKey::from(bytes).unwrap_with(&member).unwrap_err();
        assert!(matches!(err, CryptoError::Decryption));
    }

    #[test]
    fn test_hex_roundtrip() {
        let key = FileKey::generate();
        let member = SecretKey::generate();

        let wrapped = WrappedKey::wrap(&key, &member.public()).unwrap();
        let recovered = WrappedKey::from_hex(&wrapped.to_hex()).unwrap();
        assert_eq!(wrapped, recovered);
        assert_eq!(key, recovered.unwrap_with(&member).unwrap());
    }

    #[test]
    fn test_wrap_for_members_covers_everyone() {
        let key = FileKey::generate();
        let alice = SecretKey::generate();
        let bob = SecretKey::generate();

        let members = BTreeMap::from([
            ("alice".to_string(), alice.public()),
            ("bob".to_string(), bob.public()),
        ]);

        let wrapped = wrap_for_members(&key, &members).unwrap();
        assert_eq!(wrapped.len(), 2);

        // Every member recovers the same key, each through their own grant.
        assert_eq!(key, wrapped["alice"].unwrap_with(&alice).unwrap());
        assert_eq!(key, wrapped["bob"].unwrap_with(&bob).unwrap());
        // And never through someone else's grant.
        assert!(wrapped["alice"].unwrap_with(&bob).is_err());
    }

    #[test]
    fn test_serde_json_roundtrip() {
        let key = FileKey::generate();
        let member = SecretKey::generate();

        let wrapped = WrappedKey::wrap(&key, &member.public()).unwrap();
        let json = serde_json::to_string(&wrapped).unwrap();
        let recovered: WrappedKey = serde_json::from_str(&json).unwrap();

        assert_eq!(wrapped, recovered);
        assert_eq!(key, recovered.unwrap_with(&member).unwrap());
    }

    #[test]
    fn test_wrapped_key_size_validation() {
        assert!(WrappedKey::try_from([0u8; WRAPPED_KEY_SIZE - 1].as_slice()).is_err());
        assert!(WrappedKey::try_from([0u8; WRAPPED_KEY_SIZE + 1].as_slice()).is_err());
        assert!(WrappedKey::try_from([0u8; WRAPPED_KEY_SIZE].as_slice()).is_ok());
    }
}
