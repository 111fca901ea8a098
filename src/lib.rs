//! # merkle_guard
//!
//! A binary merkle tree over a mutable, ordered collection of items.
//!
//! The tree keeps a single root digest that changes whenever an item is
//! added, removed or modified, so two copies of a data set can be compared
//! by root digest instead of by content.
//!
//! ## Core Concepts
//!
//! - **Digests**: 64-character uppercase hex strings of 256-bit hashes
//! - **Leaf hashers**: caller-supplied digest functions for items
//! - **Rebuilds**: adding or removing an item rebuilds every internal node
//! - **Integrity**: the last committed root is kept so out-of-band changes
//!   to node digests can be detected
//!
//! ## Example
//!
//! ```
//! use merkle_guard::{Digest, MerkleTree, Sha256Leaf};
//!
//! let tree: MerkleTree<String> = MerkleTree::new(Sha256Leaf);
//! tree.add("data1".to_string())?;
//! tree.add("data2".to_string())?;
//!
//! let expected = Digest::combine(&Digest::sha256("data1"), &Digest::sha256("data2"));
//! assert_eq!(tree.root_hash(), Some(expected));
//! assert!(tree.verify_integrity());
//! # Ok::<(), merkle_guard::Error>(())
//! ```

pub mod config;
pub mod digest;
pub mod merkle;

mod error;

pub use config::{LeafDigest, TreeConfig};
pub use digest::{Blake3Leaf, Digest, LeafHasher, SerializedLeaf, Sha256Leaf, DIGEST_HEX_LEN};
pub use error::{BoxError, Error, Result};
pub use merkle::{MerkleTree, Node, NodeId, NodeKind, TreeBuilder};
