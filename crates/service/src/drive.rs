//! The operation surface over the encrypted tree.
//!
//! A [`Drive`] pairs a ledger provider (grants, file records, members,
//! audit) with a content store and exposes the operations the original
//! file controller offers: register, create, download, rename, share,
//! revoke, delete, list. The drive enforces the authorization predicates
//! and membership completeness *before* touching the ledger; the crypto
//! itself happened on the client, so everything arriving here is already
//! ciphertext and wrapped keys.
//!
//! Cascading operations (share, revoke, delete) walk the subtree and apply
//! per-node, skipping nodes the actor may not administer (ownership can
//! legitimately vary inside a shared tree) and continuing with the rest.
//! They are sequences of per-file transactions, not one atomic unit;
//! callers re-issue to converge after partial completion.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::crypto::{
    encrypt_content, encrypt_name, generate_identity, CryptoError, FileKey, Identity, KdfParams,
    PublicKey, WrappedKey,
};
use common::fs::FileNode;
use common::ledger::authz::{self, Decision};
use common::ledger::{
    AccessLedger, AuditEntry, AuditLog, FileStore, LedgerError, MemberDirectory, MemberRecord,
};

use crate::config::Config;
use crate::content::ContentStore;
use crate::database::Database;
use crate::session::Session;

/// Errors surfaced by drive operations.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// The actor lacks a grant or ownership for the requested action.
    #[error("authorization denied: {reason}")]
    Authorization { reason: String },
    /// A wrapped key was omitted for a member who must receive one.
    #[error("missing wrapped keys for members: {missing:?}")]
    MembershipIncomplete { missing: Vec<String> },
    #[error("file not found: {0}")]
    NotFound(Uuid),
    #[error("{0} is a directory")]
    IsDirectory(Uuid),
    #[error("{0} is not a directory")]
    NotADirectory(Uuid),
    #[error("content store error: {0}")]
    Io(#[from] std::io::Error),
}

fn allow(decision: Decision) -> Result<(), DriveError> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(DriveError::Authorization { reason }),
    }
}

/// One directory listing entry: the raw node plus the caller's wrapped key
/// when they hold a grant. Without a key the encrypted name stays as-is on
/// display; that is the soft-failure path of name decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildEntry {
    pub node: FileNode,
    pub wrapped_key: Option<WrappedKey>,
}

/// Per-node outcome of a cascading operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeOutcome {
    Applied,
    Skipped { reason: String },
}

/// Cascade results in traversal (pre-)order.
pub type CascadeReport = Vec<(Uuid, CascadeOutcome)>;

/// Client-side result of preparing a node for upload: the fresh key, the
/// ciphertexts, and one wrapped key per member.
#[derive(Debug)]
pub struct SealedNode {
    pub file_key: FileKey,
    pub encrypted_name: String,
    pub ciphertext: Option<Vec<u8>>,
    pub wrapped: BTreeMap<String, WrappedKey>,
}

/// Encrypt a file for upload: fresh key, encrypted name and content, and a
/// wrapped key for every intended member. All-or-nothing over the member
/// set.
pub fn seal_file(
    name: &str,
    content: &[u8],
    members: &BTreeMap<String, PublicKey>,
) -> Result<SealedNode, CryptoError> {
    let file_key = FileKey::generate();
    let encrypted_name = encrypt_name(&file_key, name);
    let ciphertext = encrypt_content(&file_key, content);
    let wrapped = common::crypto::wrap_for_members(&file_key, members)?;
    Ok(SealedNode {
        file_key,
        encrypted_name,
        ciphertext: Some(ciphertext),
        wrapped,
    })
}

/// Encrypt a directory for creation; like [`seal_file`] without content.
pub fn seal_dir(
    name: &str,
    members: &BTreeMap<String, PublicKey>,
) -> Result<SealedNode, CryptoError> {
    let file_key = FileKey::generate();
    let encrypted_name = encrypt_name(&file_key, name);
    let wrapped = common::crypto::wrap_for_members(&file_key, members)?;
    Ok(SealedNode {
        file_key,
        encrypted_name,
        ciphertext: None,
        wrapped,
    })
}

/// Client-side registration bundle: a fresh identity plus the member's
/// personal root directory, keyed and wrapped for themselves only.
#[derive(Debug)]
pub struct Enrollment {
    pub identity: Identity,
    pub root_key: FileKey,
    pub root_encrypted_name: String,
    pub root_wrapped: WrappedKey,
}

/// Prepare everything a new member needs: identity (generated off the
/// interactive path), root key, encrypted root name, self-wrapped root key.
pub async fn prepare_enrollment(
    username: &str,
    secret: &str,
    kdf: &KdfParams,
) -> Result<Enrollment, CryptoError> {
    let identity = generate_identity(secret.to_string(), kdf.clone()).await?;
    let root_key = FileKey::generate();
    let root_encrypted_name = encrypt_name(&root_key, username);
    let root_wrapped = WrappedKey::wrap(&root_key, &identity.public_key)?;
    Ok(Enrollment {
        identity,
        root_key,
        root_encrypted_name,
        root_wrapped,
    })
}

/// The server-side operation surface.
pub struct Drive<P> {
    provider: P,
    content: ContentStore,
}

impl Drive<Database> {
    /// Assemble a drive from configuration: sqlite (file or in-memory) plus
    /// the content blob directory.
    pub async fn from_config(config: &Config) -> Result<Self, DriveError> {
        let provider = match &config.sqlite_path {
            Some(path) => Database::new(path).await?,
            None => Database::in_memory().await?,
        };
        let content = ContentStore::open(config.content_dir()).await?;
        Ok(Drive::new(provider, content))
    }
}

impl<P> Drive<P>
where
    P: AccessLedger + FileStore + MemberDirectory + AuditLog,
{
    pub fn new(provider: P, content: ContentStore) -> Self {
        Drive { provider, content }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    async fn require_node(&self, id: Uuid) -> Result<FileNode, DriveError> {
        self.provider
            .node(id)
            .await?
            .ok_or(DriveError::NotFound(id))
    }

    async fn has_grant(&self, file_id: Uuid, actor: &str) -> Result<bool, DriveError> {
        Ok(self.provider.grant_for(file_id, actor).await?.is_some())
    }

    async fn member_set(&self, file_id: Uuid) -> Result<BTreeSet<String>, DriveError> {
        Ok(self
            .provider
            .grants_for(file_id)
            .await?
            .into_iter()
            .map(|g| g.member)
            .collect())
    }

    async fn audit(
        &self,
        file_id: Uuid,
        actor: &str,
        message: impl Into<String>,
    ) -> Result<(), DriveError> {
        self.provider
            .append(&AuditEntry::new(file_id, actor, message))
            .await?;
        Ok(())
    }

    /// Register a member and create their personal root directory.
    ///
    /// The root arrives already encrypted and wrapped (see
    /// [`prepare_enrollment`]); the backend never learns the root key.
    pub async fn register_member(
        &self,
        username: &str,
        identity: &Identity,
        root_encrypted_name: String,
        root_wrapped: WrappedKey,
    ) -> Result<FileNode, DriveError> {
        self.provider
            .register_member(&MemberRecord {
                username: username.to_string(),
                public_key: identity.public_key,
                encrypted_secret_key: identity.encrypted_secret_key.clone(),
            })
            .await?;

        let root = FileNode::new_dir(root_encrypted_name, username.to_string(), None);
        self.provider.insert_node(&root).await?;
        self.provider
            .replace_grants(root.id, vec![(username.to_string(), root_wrapped)])
            .await?;
        self.audit(root.id, username, "registered, root directory created")
            .await?;

        tracing::info!(member = username, root = %root.id, "registered member");
        Ok(root)
    }

    /// Unlock a member's private key into a fresh [`Session`].
    pub async fn open_session(
        &self,
        username: &str,
        secret: &str,
        kdf: &KdfParams,
    ) -> Result<Session, DriveError> {
        let record = self
            .provider
            .member(username)
            .await?
            .ok_or_else(|| LedgerError::MemberNotFound(username.to_string()))?;
        Ok(Session::open(
            username,
            &record.encrypted_secret_key,
            secret,
            kdf,
        )?)
    }

    /// Validate a create: parent exists and is a directory, actor holds a
    /// grant on it, and the supplied wrapped keys cover the parent's member
    /// set exactly, since the child inherits that set at creation time. Rejects
    /// before any mutation.
    async fn validate_create(
        &self,
        actor: &str,
        parent_id: Uuid,
        wrapped: &BTreeMap<String, WrappedKey>,
    ) -> Result<FileNode, DriveError> {
        let parent = self.require_node(parent_id).await?;
        let has_grant = self.has_grant(parent_id, actor).await?;
        allow(authz::may_create_child(actor, &parent, has_grant))?;

        let members = self.member_set(parent_id).await?;
        let missing: Vec<String> = members
            .iter()
            .filter(|m| !wrapped.contains_key(*m))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DriveError::MembershipIncomplete { missing });
        }
        if let Some(extra) = wrapped.keys().find(|m| !members.contains(*m)) {
            return Err(DriveError::Authorization {
                reason: format!("{extra} is not a member of parent {parent_id}"),
            });
        }
        Ok(parent)
    }

    /// Create a leaf file under `parent_id` with already-encrypted content.
    pub async fn create_file(
        &self,
        actor: &str,
        parent_id: Uuid,
        encrypted_name: String,
        ciphertext: Vec<u8>,
        wrapped: BTreeMap<String, WrappedKey>,
    ) -> Result<FileNode, DriveError> {
        self.validate_create(actor, parent_id, &wrapped).await?;

        let storage_path = self.content.new_blob_path();
        self.content.put(&storage_path, &ciphertext).await?;

        let node = FileNode::new_file(encrypted_name, actor.to_string(), parent_id, storage_path);
        self.provider.insert_node(&node).await?;
        self.provider
            .replace_grants(node.id, wrapped.into_iter().collect())
            .await?;
        self.provider.touch(parent_id).await?;
        self.audit(node.id, actor, "created file").await?;

        tracing::info!(file = %node.id, actor, "created file");
        Ok(node)
    }

    /// Create a directory under `parent_id`.
    pub async fn create_dir(
        &self,
        actor: &str,
        parent_id: Uuid,
        encrypted_name: String,
        wrapped: BTreeMap<String, WrappedKey>,
    ) -> Result<FileNode, DriveError> {
        self.validate_create(actor, parent_id, &wrapped).await?;

        let node = FileNode::new_dir(encrypted_name, actor.to_string(), Some(parent_id));
        self.provider.insert_node(&node).await?;
        self.provider
            .replace_grants(node.id, wrapped.into_iter().collect())
            .await?;
        self.provider.touch(parent_id).await?;
        self.audit(node.id, actor, "created directory").await?;

        tracing::info!(dir = %node.id, actor, "created directory");
        Ok(node)
    }

    /// Fetch a file's ciphertext plus the caller's wrapped key.
    pub async fn download(
        &self,
        actor: &str,
        file_id: Uuid,
    ) -> Result<(Vec<u8>, WrappedKey), DriveError> {
        let node = self.require_node(file_id).await?;
        let grant = self.provider.grant_for(file_id, actor).await?;
        allow(authz::may_access(actor, &node, grant.is_some()))?;
        // grant present once allowed
        let grant = grant.ok_or(DriveError::NotFound(file_id))?;

        let Some(storage_path) = &node.storage_path else {
            return Err(DriveError::IsDirectory(file_id));
        };
        let ciphertext = self.content.get(storage_path).await?;
        Ok((ciphertext, grant.wrapped_key))
    }

    /// Replace a file's content with new ciphertext under the same key.
    pub async fn update_content(
        &self,
        actor: &str,
        file_id: Uuid,
        ciphertext: Vec<u8>,
    ) -> Result<(), DriveError> {
        let node = self.require_node(file_id).await?;
        let has_grant = self.has_grant(file_id, actor).await?;
        allow(authz::may_access(actor, &node, has_grant))?;

        let Some(storage_path) = &node.storage_path else {
            return Err(DriveError::IsDirectory(file_id));
        };
        self.content.put(storage_path, &ciphertext).await?;
        self.provider.touch(file_id).await?;
        self.audit(file_id, actor, "updated content").await?;
        Ok(())
    }

    /// Replace a node's encrypted name.
    pub async fn rename(
        &self,
        actor: &str,
        file_id: Uuid,
        new_encrypted_name: String,
    ) -> Result<(), DriveError> {
        let node = self.require_node(file_id).await?;
        let has_grant = self.has_grant(file_id, actor).await?;
        allow(authz::may_access(actor, &node, has_grant))?;

        self.provider.set_name(file_id, &new_encrypted_name).await?;
        self.audit(file_id, actor, "renamed").await?;
        Ok(())
    }

    /// List a directory: every child, with the caller's wrapped key where
    /// one exists. Children without a key keep their encrypted names.
    pub async fn list_children(
        &self,
        actor: &str,
        dir_id: Uuid,
    ) -> Result<Vec<ChildEntry>, DriveError> {
        let dir = self.require_node(dir_id).await?;
        if !dir.is_dir {
            return Err(DriveError::NotADirectory(dir_id));
        }
        let has_grant = self.has_grant(dir_id, actor).await?;
        allow(authz::may_access(actor, &dir, has_grant))?;

        let mut entries = Vec::new();
        for node in self.provider.children(dir_id).await? {
            let wrapped_key = self
                .provider
                .grant_for(node.id, actor)
                .await?
                .map(|g| g.wrapped_key);
            entries.push(ChildEntry { node, wrapped_key });
        }
        Ok(entries)
    }

    /// Every wrapped key the actor holds within a subtree, keyed by node
    /// id. Nodes without a grant for the actor are simply absent; this is
    /// what a client unwraps before re-wrapping a subtree for a new member.
    pub async fn grants_in_subtree(
        &self,
        actor: &str,
        root: Uuid,
    ) -> Result<BTreeMap<Uuid, WrappedKey>, DriveError> {
        let tree = self.provider.subtree(root).await?;
        if tree.is_empty() {
            return Err(DriveError::NotFound(root));
        }

        let mut grants = BTreeMap::new();
        for id in tree.traverse(&root) {
            if let Some(grant) = self.provider.grant_for(id, actor).await? {
                grants.insert(id, grant.wrapped_key);
            }
        }
        Ok(grants)
    }

    /// Share a subtree with another member.
    ///
    /// The caller supplies one wrapped key per node (only someone holding a
    /// node's key can wrap it for the new member). Applies per node in
    /// traversal order; nodes the actor does not own, or for which no key
    /// was supplied, are skipped and the rest proceed.
    pub async fn share(
        &self,
        actor: &str,
        file_id: Uuid,
        member: &str,
        wrapped_per_node: &BTreeMap<Uuid, WrappedKey>,
    ) -> Result<CascadeReport, DriveError> {
        self.provider
            .member(member)
            .await?
            .ok_or_else(|| LedgerError::MemberNotFound(member.to_string()))?;

        let tree = self.provider.subtree(file_id).await?;
        if tree.is_empty() {
            return Err(DriveError::NotFound(file_id));
        }

        let mut report = Vec::new();
        for id in tree.traverse(&file_id) {
            let Some(node) = tree.node(&id) else { continue };

            if let Some(reason) = authz::may_administer(actor, node).reason() {
                tracing::warn!(file = %id, actor, reason, "share skipped node");
                report.push((id, CascadeOutcome::Skipped { reason: reason.to_string() }));
                continue;
            }
            let Some(wrapped) = wrapped_per_node.get(&id) else {
                report.push((
                    id,
                    CascadeOutcome::Skipped {
                        reason: "no wrapped key supplied".to_string(),
                    },
                ));
                continue;
            };

            self.provider.add_grant(id, member, *wrapped).await?;
            self.audit(id, actor, format!("shared with {member}")).await?;
            report.push((id, CascadeOutcome::Applied));
        }

        tracing::info!(file = %file_id, actor, member, "shared subtree");
        Ok(report)
    }

    /// Revoke a member's access over a subtree.
    ///
    /// Per node: remove the grant; when other grants survive, flag the node
    /// as needing a re-key, because the removed member still knows the old key. A
    /// node losing its last grant is not flagged (nobody is left to re-key
    /// for). Nodes the actor does not own are skipped.
    pub async fn revoke(
        &self,
        actor: &str,
        file_id: Uuid,
        member: &str,
    ) -> Result<CascadeReport, DriveError> {
        let tree = self.provider.subtree(file_id).await?;
        if tree.is_empty() {
            return Err(DriveError::NotFound(file_id));
        }

        let mut report = Vec::new();
        for id in tree.traverse(&file_id) {
            let Some(node) = tree.node(&id) else { continue };

            if let Some(reason) = authz::may_administer(actor, node).reason() {
                tracing::warn!(file = %id, actor, reason, "revoke skipped node");
                report.push((id, CascadeOutcome::Skipped { reason: reason.to_string() }));
                continue;
            }

            let removed = self.provider.remove_grant(id, member).await?;
            if !removed {
                report.push((
                    id,
                    CascadeOutcome::Skipped {
                        reason: format!("{member} holds no grant"),
                    },
                ));
                continue;
            }

            if !self.provider.grants_for(id).await?.is_empty() {
                self.provider.mark_needs_rekey(id, true).await?;
            }
            self.audit(id, actor, format!("revoked access for {member}"))
                .await?;
            report.push((id, CascadeOutcome::Applied));
        }

        tracing::info!(file = %file_id, actor, member, "revoked over subtree");
        Ok(report)
    }

    /// Delete a subtree.
    ///
    /// The traversal enumerates pre-order; rows are removed children-first
    /// so that a node the actor may not touch keeps its ancestors alive
    /// (deleting them would cascade over the survivor). Skipped nodes and
    /// their ancestors are reported; re-issuing after regaining access
    /// converges.
    pub async fn delete(&self, actor: &str, file_id: Uuid) -> Result<CascadeReport, DriveError> {
        let tree = self.provider.subtree(file_id).await?;
        if tree.is_empty() {
            return Err(DriveError::NotFound(file_id));
        }

        let order = tree.traverse(&file_id);
        let mut kept: BTreeSet<Uuid> = BTreeSet::new();
        let mut report = Vec::new();

        for id in order.iter().rev() {
            let Some(node) = tree.node(id) else { continue };

            let has_grant = self.has_grant(*id, actor).await?;
            if let Some(reason) = authz::may_access(actor, node, has_grant).reason() {
                tracing::warn!(file = %id, actor, reason, "delete skipped node");
                kept.insert(*id);
                report.push((*id, CascadeOutcome::Skipped { reason: reason.to_string() }));
                continue;
            }
            if tree.children(id).iter().any(|c| kept.contains(&c.id)) {
                kept.insert(*id);
                report.push((
                    *id,
                    CascadeOutcome::Skipped {
                        reason: "descendants were kept".to_string(),
                    },
                ));
                continue;
            }

            if let Some(storage_path) = &node.storage_path {
                self.content.remove(storage_path).await?;
            }
            self.audit(*id, actor, "deleted").await?;
            self.provider.delete_node(*id).await?;
            report.push((*id, CascadeOutcome::Applied));
        }

        report.reverse();
        tracing::info!(file = %file_id, actor, "deleted subtree");
        Ok(report)
    }
}
