use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the encrypted file tree.
///
/// The backend stores nodes exactly like this: the name is ciphertext, the
/// content (for leaves) lives at `storage_path` as ciphertext, and nothing
/// here can be read without an unwrapped file key.
///
/// Invariants:
/// - `is_dir` is true iff `storage_path` is `None`
/// - `parent` is `None` only for a member's root directory
/// - parents form a tree, never a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: Uuid,
    /// Encrypted display name (`hex(nonce) ++ base64(ciphertext)`).
    pub encrypted_name: String,
    /// Username of the owning member. Only the owner may share, revoke or
    /// re-key this node.
    pub owner: String,
    /// Parent node id; stored as an id rather than a reference so the tree
    /// stays an arena without ownership cycles.
    pub parent: Option<Uuid>,
    pub is_dir: bool,
    /// Set when a revoke left this node's key known to a former member;
    /// cleared only by an explicit re-key.
    pub needs_rekey: bool,
    /// Ciphertext location for leaf content; `None` for directories.
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl FileNode {
    /// Create a directory node.
    pub fn new_dir(encrypted_name: String, owner: String, parent: Option<Uuid>) -> Self {
        let now = Utc::now();
        FileNode {
            id: Uuid::new_v4(),
            encrypted_name,
            owner,
            parent,
            is_dir: true,
            needs_rekey: false,
            storage_path: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Create a leaf node pointing at stored ciphertext.
    pub fn new_file(
        encrypted_name: String,
        owner: String,
        parent: Uuid,
        storage_path: String,
    ) -> Self {
        let now = Utc::now();
        FileNode {
            id: Uuid::new_v4(),
            encrypted_name,
            owner,
            parent: Some(parent),
            is_dir: false,
            needs_rekey: false,
            storage_path: Some(storage_path),
            created_at: now,
            modified_at: now,
        }
    }

    /// Whether this node satisfies the directory/storage invariant.
    pub fn is_consistent(&self) -> bool {
        self.is_dir == self.storage_path.is_none()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_constructors_uphold_invariant() {
        let dir = FileNode::new_dir("enc-name".into(), "alice".into(), None);
        assert!(dir.is_dir);
        assert!(dir.is_consistent());

        let file = FileNode::new_file("enc-name".into(), "alice".into(), dir.id, "blob/1".into());
        assert!(!file.is_dir);
        assert!(file.is_consistent());
        assert_eq!(file.parent, Some(dir.id));
    }

    #[test]
    fn test_inconsistent_node_is_detectable() {
        let mut node = FileNode::new_dir("n".into(), "alice".into(), None);
        node.storage_path = Some("blob/oops".into());
        assert!(!node.is_consistent());
    }
}
