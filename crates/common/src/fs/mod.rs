mod node;
mod tree;

pub use node::FileNode;
pub use tree::FileTree;
