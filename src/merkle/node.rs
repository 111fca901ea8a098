//! Tree node types
//!
//! Nodes live in a [`NodeArena`] owned by the tree. Children are referenced
//! top-down by [`NodeId`]; the `parent` field is a plain index back into the
//! same arena and is only used to walk from a leaf to the root.

use crate::digest::{Digest, LeafHasher};
use crate::Result;

/// Handle of a node inside its tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Placeholder for a leaf that has not been placed in an arena yet
    const DETACHED: NodeId = NodeId(usize::MAX);

    pub fn index(self) -> usize {
        self.0
    }

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index)
    }
}

/// What a node holds
#[derive(Clone, Debug)]
pub enum NodeKind<T> {
    /// A leaf wrapping one data item
    Leaf { data: T },
    /// An internal node over two children
    ///
    /// `left == right` when an unpaired trailing node was paired with
    /// itself.
    Internal { left: NodeId, right: NodeId },
}

/// A node in the merkle tree
#[derive(Clone, Debug)]
pub struct Node<T> {
    id: NodeId,
    kind: NodeKind<T>,
    digest: Digest,
    parent: Option<NodeId>,
}

impl<T> Node<T> {
    /// Create a leaf, hashing `data` immediately
    ///
    /// Fails with whatever error the hasher returns. The id stays
    /// meaningless until the arena places the node.
    pub(crate) fn leaf(data: T, hasher: &dyn LeafHasher<T>) -> Result<Self> {
        let digest = hasher.digest(&data)?;
        Ok(Node {
            id: NodeId::DETACHED,
            kind: NodeKind::Leaf { data },
            digest,
            parent: None,
        })
    }

    /// Position of this node in its tree, valid until the next rebuild
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind<T> {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// The payload, for leaves
    pub fn data(&self) -> Option<&T> {
        match &self.kind {
            NodeKind::Leaf { data } => Some(data),
            NodeKind::Internal { .. } => None,
        }
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Left and right child, for internal nodes
    pub fn children(&self) -> Option<(NodeId, NodeId)> {
        match self.kind {
            NodeKind::Internal { left, right } => Some((left, right)),
            NodeKind::Leaf { .. } => None,
        }
    }

    pub fn left(&self) -> Option<NodeId> {
        self.children().map(|(left, _)| left)
    }

    pub fn right(&self) -> Option<NodeId> {
        self.children().map(|(_, right)| right)
    }

    /// The internal node that adopted this one, if any
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Overwrite the stored digest without touching any ancestor
    ///
    /// Nothing above this node is recomputed, so the tree's committed root
    /// no longer describes its contents. Integrity checks report this.
    pub fn set_digest(&mut self, digest: Digest) {
        self.digest = digest;
    }

    /// Swap the payload of a leaf together with its precomputed digest
    pub(crate) fn replace_leaf(&mut self, data: T, digest: Digest) {
        self.kind = NodeKind::Leaf { data };
        self.digest = digest;
    }
}

/// Flat storage for every node of one tree
///
/// Leaves occupy the first slots, in sequence order. Internal nodes follow,
/// each one stored after both of its children.
#[derive(Clone, Debug)]
pub(crate) struct NodeArena<T> {
    nodes: Vec<Node<T>>,
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        NodeArena { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node<T>> {
        self.nodes.iter()
    }

    /// Place a node and assign its id
    pub fn push(&mut self, mut node: Node<T>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
    }

    /// Create an internal node over `left` and `right` and adopt both
    pub fn join(&mut self, left: NodeId, right: NodeId) -> NodeId {
        let digest = Digest::combine(&self.nodes[left.0].digest, &self.nodes[right.0].digest);
        let id = self.push(Node {
            id: NodeId::DETACHED,
            kind: NodeKind::Internal { left, right },
            digest,
            parent: None,
        });
        self.nodes[left.0].parent = Some(id);
        self.nodes[right.0].parent = Some(id);
        id
    }

    /// Recompute one node's digest from its data or its children's current
    /// digests. Does not recurse.
    pub fn compute_hash(&mut self, id: NodeId, hasher: &dyn LeafHasher<T>) -> Result<()> {
        let digest = match &self.nodes[id.0].kind {
            NodeKind::Leaf { data } => hasher.digest(data)?,
            NodeKind::Internal { left, right } => {
                Digest::combine(&self.nodes[left.0].digest, &self.nodes[right.0].digest)
            }
        };
        self.nodes[id.0].digest = digest;
        Ok(())
    }

    /// Drop every node after the first `len` slots
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Remove the node at `index`, shifting later slots down
    pub fn remove(&mut self, index: usize) -> Node<T> {
        self.nodes.remove(index)
    }

    /// Renumber every node by slot and forget all parent links
    pub fn detach_all(&mut self) {
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.id = NodeId(index);
            node.parent = None;
        }
    }
}
