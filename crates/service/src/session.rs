//! Per-login session key material.
//!
//! The unlocked private key lives in exactly one place: a `Session` owned
//! by the caller, never in process-global state. Logging out clears the
//! session; the key bytes are zeroized when dropped.

use common::crypto::{unlock_secret_key, CryptoError, KdfParams, PublicKey, SecretKey};

/// An authenticated member's in-memory key material.
#[derive(Debug)]
pub struct Session {
    username: String,
    secret_key: Option<SecretKey>,
}

impl Session {
    /// Unlock a member's private key blob with their credential secret.
    ///
    /// Fails with [`CryptoError::Decryption`] when the secret is wrong.
    pub fn open(
        username: impl Into<String>,
        encrypted_secret_key: &[u8],
        secret: &str,
        kdf: &KdfParams,
    ) -> Result<Self, CryptoError> {
        let secret_key = unlock_secret_key(encrypted_secret_key, secret, kdf)?;
        Ok(Session {
            username: username.into(),
            secret_key: Some(secret_key),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The unlocked private key, or `None` after [`Session::clear`].
    pub fn secret_key(&self) -> Option<&SecretKey> {
        self.secret_key.as_ref()
    }

    /// The session's public key, recomputed from the private half.
    pub fn public_key(&self) -> Option<PublicKey> {
        self.secret_key.as_ref().map(|k| k.public())
    }

    pub fn is_active(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Drop the key material. The session is unusable afterwards; open a
    /// new one to log back in.
    pub fn clear(&mut self) {
        self.secret_key = None;
    }
}
