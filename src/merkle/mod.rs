//! Binary merkle tree over an ordered list of items
//!
//! - Each leaf's digest comes from a caller-supplied [`LeafHasher`]
//! - Each internal node's digest is [`Digest::combine`] of its children
//! - An unpaired node at the end of a level is paired with itself
//!
//! [`LeafHasher`]: crate::digest::LeafHasher
//! [`Digest::combine`]: crate::digest::Digest::combine

mod node;
mod tree;

pub use node::{Node, NodeId, NodeKind};
pub use tree::{MerkleTree, TreeBuilder, DEFAULT_LABEL};
