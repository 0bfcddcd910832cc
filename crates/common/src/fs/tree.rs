use std::collections::BTreeMap;

use uuid::Uuid;

use super::node::FileNode;

/// An id-keyed arena of [`FileNode`]s.
///
/// Cascading operations (share, revoke, delete, re-key) load the affected
/// subtree into one of these and walk it; nodes hold parent ids only, so
/// there are no reference cycles to manage.
#[derive(Debug, Clone, Default)]
pub struct FileTree {
    nodes: BTreeMap<Uuid, FileNode>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from a flat node list, e.g. a subtree query result.
    pub fn from_nodes(nodes: impl IntoIterator<Item = FileNode>) -> Self {
        FileTree {
            nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
        }
    }

    pub fn insert(&mut self, node: FileNode) {
        self.nodes.insert(node.id, node);
    }

    pub fn node(&self, id: &Uuid) -> Option<&FileNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of a node, ordered by id.
    pub fn children(&self, id: &Uuid) -> Vec<&FileNode> {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(*id))
            .collect()
    }

    /// Pre-order traversal of the subtree rooted at `root`, root first,
    /// every parent before its children. This is the walk order for
    /// cascading delete/share/revoke.
    pub fn traverse(&self, root: &Uuid) -> Vec<Uuid> {
        let mut order = Vec::new();
        if !self.nodes.contains_key(root) {
            return order;
        }

        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            // parents form a tree, but a corrupt snapshot must not hang us
            if order.contains(&id) {
                continue;
            }
            order.push(id);
            // reverse so the smallest child id is visited first
            for child in self.children(&id).iter().rev() {
                stack.push(child.id);
            }
        }
        order
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileNode> {
        self.nodes.values()
    }
}
