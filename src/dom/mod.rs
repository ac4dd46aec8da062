//! DOM Module - Arena-based XML Tree
//!
//! Implements a mutable DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - An iterative writer for serialization

pub mod node;
pub mod tree;
pub mod writer;

pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, ROOT};
pub use tree::{is_valid_name, ChildIter, DescendantIter, XmlTree, MAX_DEPTH};
pub use writer::{write_node, write_tree, WriteOptions};
