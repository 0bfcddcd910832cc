//! Re-keying ("reciphering") after membership shrinks.
//!
//! Each file is a two-state machine: `current` or `needs-rekey`. A revoke
//! that removes at least one grant while at least one survives sets the
//! flag (the removed member still knows the old key); only an explicit
//! owner operation carrying a fresh key wrapped for the *full* surviving
//! member set clears it. Nothing re-keys automatically.
//!
//! There is no subtree-wide atomic primitive. [`RekeyCoordinator::rekey_subtree`]
//! applies [`rekey_leaf`](RekeyCoordinator::rekey_leaf) once per node and
//! reports per-node outcomes; on partial failure the flags left standing
//! mean a re-issued pass converges.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::crypto::{
    encrypt_content, encrypt_name, wrap_for_members, CryptoError, FileKey, PublicKey, WrappedKey,
};
use common::ledger::authz;
use common::ledger::{AccessLedger, AuditLog, FileStore, MemberDirectory};

use crate::drive::{Drive, DriveError};

/// Everything the owner supplies to re-key one node: a fresh key wrapped
/// for each surviving member, plus the name/content re-encrypted under it.
#[derive(Debug)]
pub struct RekeyRequest {
    pub wrapped: BTreeMap<String, WrappedKey>,
    pub new_encrypted_name: Option<String>,
    pub new_content: Option<Vec<u8>>,
}

/// Build a [`RekeyRequest`] client-side: generate the replacement key, wrap
/// it for the surviving members, re-encrypt what the caller passes in.
pub fn seal_rekey(
    name: Option<&str>,
    content: Option<&[u8]>,
    members: &BTreeMap<String, PublicKey>,
) -> Result<(FileKey, RekeyRequest), CryptoError> {
    let file_key = FileKey::generate();
    let wrapped = wrap_for_members(&file_key, members)?;
    let request = RekeyRequest {
        wrapped,
        new_encrypted_name: name.map(|n| encrypt_name(&file_key, n)),
        new_content: content.map(|c| encrypt_content(&file_key, c)),
    };
    Ok((file_key, request))
}

/// Per-node outcome of a subtree re-key pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RekeyOutcome {
    /// Grants replaced, flag cleared.
    Rekeyed,
    /// The node was not flagged; nothing to do.
    Current,
    /// Authorization or input kept this node untouched; reason attached.
    Skipped { reason: String },
}

/// Orchestrates grant replacement and flag transitions over a [`Drive`].
pub struct RekeyCoordinator<'a, P> {
    drive: &'a Drive<P>,
}

impl<P> Drive<P>
where
    P: AccessLedger + FileStore + MemberDirectory + AuditLog,
{
    pub fn rekey(&self) -> RekeyCoordinator<'_, P> {
        RekeyCoordinator { drive: self }
    }
}

impl<P> RekeyCoordinator<'_, P>
where
    P: AccessLedger + FileStore + MemberDirectory + AuditLog,
{
    /// Re-key a single node.
    ///
    /// Owner-only. The supplied wrapped set must cover the current
    /// grant-holders exactly: an omitted survivor is
    /// [`DriveError::MembershipIncomplete`], a supplied non-member is
    /// rejected outright. Grants are replaced atomically, the optional
    /// replacement name/content land under the new key, and the
    /// needs-rekey flag clears.
    pub async fn rekey_leaf(
        &self,
        actor: &str,
        file_id: Uuid,
        request: RekeyRequest,
    ) -> Result<(), DriveError> {
        let provider = self.drive.provider();
        let node = provider
            .node(file_id)
            .await?
            .ok_or(DriveError::NotFound(file_id))?;

        match authz::may_administer(actor, &node) {
            authz::Decision::Allow => {}
            authz::Decision::Deny(reason) => return Err(DriveError::Authorization { reason }),
        }

        let current: BTreeSet<String> = provider
            .grants_for(file_id)
            .await?
            .into_iter()
            .map(|g| g.member)
            .collect();

        let missing: Vec<String> = current
            .iter()
            .filter(|m| !request.wrapped.contains_key(*m))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DriveError::MembershipIncomplete { missing });
        }
        if let Some(extra) = request.wrapped.keys().find(|m| !current.contains(*m)) {
            return Err(DriveError::Authorization {
                reason: format!("{extra} holds no grant on {file_id}"),
            });
        }

        provider
            .replace_grants(file_id, request.wrapped.into_iter().collect())
            .await?;

        if let Some(name) = &request.new_encrypted_name {
            provider.set_name(file_id, name).await?;
        }
        if let Some(content) = &request.new_content {
            let Some(storage_path) = &node.storage_path else {
                return Err(DriveError::IsDirectory(file_id));
            };
            self.drive.content().put(storage_path, content).await?;
            provider.touch(file_id).await?;
        }

        provider.mark_needs_rekey(file_id, false).await?;
        provider
            .append(&common::ledger::AuditEntry::new(
                file_id,
                actor,
                "re-keyed for current members",
            ))
            .await?;

        tracing::info!(file = %file_id, actor, "re-keyed");
        Ok(())
    }

    /// Re-key every flagged node in a subtree, one node at a time.
    ///
    /// `requests` maps node ids to their replacements (see [`seal_rekey`]).
    /// Unflagged nodes report [`RekeyOutcome::Current`]; denials and
    /// missing/incomplete requests are skipped with a reason while the walk
    /// continues. Infrastructure failures abort the pass; the flags still
    /// set make a retry converge.
    pub async fn rekey_subtree(
        &self,
        actor: &str,
        root: Uuid,
        mut requests: BTreeMap<Uuid, RekeyRequest>,
    ) -> Result<Vec<(Uuid, RekeyOutcome)>, DriveError> {
        let tree = self.drive.provider().subtree(root).await?;
        if tree.is_empty() {
            return Err(DriveError::NotFound(root));
        }

        let mut report = Vec::new();
        for id in tree.traverse(&root) {
            let Some(node) = tree.node(&id) else { continue };

            if !node.needs_rekey {
                report.push((id, RekeyOutcome::Current));
                continue;
            }
            let Some(request) = requests.remove(&id) else {
                report.push((
                    id,
                    RekeyOutcome::Skipped {
                        reason: "no replacement supplied".to_string(),
                    },
                ));
                continue;
            };

            match self.rekey_leaf(actor, id, request).await {
                Ok(()) => report.push((id, RekeyOutcome::Rekeyed)),
                Err(
                    e @ (DriveError::Authorization { .. }
                    | DriveError::MembershipIncomplete { .. }
                    | DriveError::NotFound(_)),
                ) => {
                    tracing::warn!(file = %id, actor, error = %e, "re-key skipped node");
                    report.push((
                        id,
                        RekeyOutcome::Skipped {
                            reason: e.to_string(),
                        },
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}
