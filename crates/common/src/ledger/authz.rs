//! The authorization predicates.
//!
//! Three rules, no role hierarchy beyond owner vs. member:
//!
//! 1. Creating a child requires a grant on the parent directory.
//! 2. Reading or writing a file requires a grant on that exact file.
//! 3. Sharing, revoking and re-keying require ownership.
//!
//! Each predicate is a pure function over the facts (actor, node, grant
//! existence) and returns an explicit decision with a reason, so callers
//! can log and surface *why* something was denied.

use crate::fs::FileNode;

/// Outcome of an authorization predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// The denial reason, if denied.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(reason.as_str()),
        }
    }
}

/// May `actor` create a child under `parent`?
pub fn may_create_child(actor: &str, parent: &FileNode, has_parent_grant: bool) -> Decision {
    if !parent.is_dir {
        return Decision::Deny(format!("{} is not a directory", parent.id));
    }
    if !has_parent_grant {
        return Decision::Deny(format!("{actor} holds no grant on parent {}", parent.id));
    }
    Decision::Allow
}

/// May `actor` read or write `node`?
pub fn may_access(actor: &str, node: &FileNode, has_grant: bool) -> Decision {
    if !has_grant {
        return Decision::Deny(format!("{actor} holds no grant on {}", node.id));
    }
    Decision::Allow
}

/// May `actor` share, revoke or re-key `node`?
pub fn may_administer(actor: &str, node: &FileNode) -> Decision {
    if actor != node.owner {
        return Decision::Deny(format!(
            "{actor} does not own {} (owner: {})",
            node.id, node.owner
        ));
    }
    Decision::Allow
}
