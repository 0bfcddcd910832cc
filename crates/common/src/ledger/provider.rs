use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crypto::{PublicKey, WrappedKey};
use crate::fs::{FileNode, FileTree};

/// Errors surfaced by ledger providers.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Unhandled provider error (database, I/O, ...).
    #[error("ledger provider error: {0}")]
    Provider(#[from] anyhow::Error),
    #[error("file not found: {0}")]
    FileNotFound(Uuid),
    #[error("member not found: {0}")]
    MemberNotFound(String),
}

/// One member's wrapped copy of one file's key.
///
/// Exactly one grant exists per (file, member) pair, and its existence is
/// the sole authorization proof for that member on that file. Grants are
/// deleted on revoke and wholesale *replaced* during a re-key, never
/// updated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub file_id: Uuid,
    pub member: String,
    pub wrapped_key: WrappedKey,
}

/// Append-only record of a mutating operation.
///
/// Written as a side effect of every mutation; nothing in the core reads
/// these back, they exist for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub file_id: Uuid,
    pub actor: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(file_id: Uuid, actor: impl Into<String>, message: impl Into<String>) -> Self {
        AuditEntry {
            file_id,
            actor: actor.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// A member identity as the directory stores it.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub username: String,
    pub public_key: PublicKey,
    /// The member's private key blob; opaque to the backend, decryptable
    /// only with the member's credential secret.
    pub encrypted_secret_key: Vec<u8>,
}

/// The durable (file, member) → wrapped-key mapping.
///
/// Implementations must serialize mutations at least per file: two
/// concurrent writers to the same file's grant set must not interleave.
/// `replace_grants` is the last-writer-wins primitive used by re-keying;
/// each caller supplies the complete member set it intends.
#[async_trait]
pub trait AccessLedger: Send + Sync {
    /// All grants for a file.
    async fn grants_for(&self, file_id: Uuid) -> Result<Vec<AccessGrant>, LedgerError>;

    /// A single member's grant on a file, if any.
    async fn grant_for(
        &self,
        file_id: Uuid,
        member: &str,
    ) -> Result<Option<AccessGrant>, LedgerError>;

    /// Atomically replace the whole grant set for a file.
    async fn replace_grants(
        &self,
        file_id: Uuid,
        grants: Vec<(String, WrappedKey)>,
    ) -> Result<(), LedgerError>;

    /// Add one grant. Replaces an existing grant for the same member.
    async fn add_grant(
        &self,
        file_id: Uuid,
        member: &str,
        wrapped_key: WrappedKey,
    ) -> Result<(), LedgerError>;

    /// Remove one grant; returns whether a grant existed.
    async fn remove_grant(&self, file_id: Uuid, member: &str) -> Result<bool, LedgerError>;

    /// Set or clear the needs-rekey flag on a file.
    async fn mark_needs_rekey(&self, file_id: Uuid, needs_rekey: bool) -> Result<(), LedgerError>;
}

/// Durable storage for file tree records.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn insert_node(&self, node: &FileNode) -> Result<(), LedgerError>;

    async fn node(&self, id: Uuid) -> Result<Option<FileNode>, LedgerError>;

    /// Replace a node's encrypted name and bump its modified time.
    async fn set_name(&self, id: Uuid, encrypted_name: &str) -> Result<(), LedgerError>;

    /// Bump a node's modified time.
    async fn touch(&self, id: Uuid) -> Result<(), LedgerError>;

    /// Delete a single node record; its grants go with it. Audit entries
    /// survive deletion.
    async fn delete_node(&self, id: Uuid) -> Result<(), LedgerError>;

    /// Direct children of a directory.
    async fn children(&self, parent: Uuid) -> Result<Vec<FileNode>, LedgerError>;

    /// The subtree rooted at `root`, as an arena for traversal.
    async fn subtree(&self, root: Uuid) -> Result<FileTree, LedgerError>;
}

/// Who exists, and with which public key.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn register_member(&self, record: &MemberRecord) -> Result<(), LedgerError>;

    async fn member(&self, username: &str) -> Result<Option<MemberRecord>, LedgerError>;

    /// Public keys for a set of usernames.
    ///
    /// All-or-nothing: fails with [`LedgerError::MemberNotFound`] if any
    /// username is unknown, so share/upload flows reject before wrapping
    /// anything.
    async fn public_keys(
        &self,
        usernames: &[String],
    ) -> Result<BTreeMap<String, PublicKey>, LedgerError>;
}

/// Append-only audit sink.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), LedgerError>;

    async fn entries_for(&self, file_id: Uuid) -> Result<Vec<AuditEntry>, LedgerError>;
}
