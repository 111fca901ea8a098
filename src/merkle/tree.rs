//! Merkle tree over an ordered, mutable sequence of items

use super::node::{Node, NodeArena, NodeId, NodeKind};
use crate::digest::{Digest, LeafHasher};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::fmt;

/// Label used when none is configured
pub const DEFAULT_LABEL: &str = "merkle";

/// A binary merkle tree over an ordered list of items
///
/// Items keep insertion order and may repeat. Adding or removing an item
/// rebuilds every internal node from the leaves; updating an item repairs
/// only the digests on the path from its leaf to the root.
///
/// Every operation holds one tree-wide lock for its whole duration,
/// including the visitor callback passed to [`MerkleTree::traverse`].
pub struct MerkleTree<T> {
    label: String,
    hasher: Box<dyn LeafHasher<T>>,
    state: Mutex<TreeState<T>>,
}

/// Everything the lock protects
struct TreeState<T> {
    arena: NodeArena<T>,
    /// Leaves occupy arena slots `0..leaf_count`
    leaf_count: usize,
    root: Option<NodeId>,
    /// Root digest captured by the last successful rebuild or update
    committed: Option<Digest>,
}

impl<T> TreeState<T> {
    fn new() -> Self {
        TreeState {
            arena: NodeArena::new(),
            leaf_count: 0,
            root: None,
            committed: None,
        }
    }

    fn root_digest(&self) -> Option<Digest> {
        self.root
            .and_then(|id| self.arena.get(id))
            .map(|node| node.digest().clone())
    }

    fn leaves(&self) -> impl Iterator<Item = &Node<T>> {
        self.arena.iter().take(self.leaf_count)
    }

    /// Slot of the first leaf whose data equals `item`
    fn position(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.leaves().position(|leaf| leaf.data() == Some(item))
    }

    /// Drop the internal layers, leaving only the leaves
    fn strip_internal(&mut self) {
        self.arena.truncate(self.leaf_count);
        self.root = None;
    }

    fn push_leaf(&mut self, leaf: Node<T>) {
        self.strip_internal();
        self.arena.push(leaf);
        self.leaf_count += 1;
    }

    fn remove_leaf(&mut self, index: usize) {
        self.strip_internal();
        self.arena.remove(index);
        self.leaf_count -= 1;
    }

    /// Rebuild every internal node from the current leaves
    ///
    /// Returns the height of the new tree, `None` when empty.
    fn rebuild(&mut self) -> Option<usize> {
        self.strip_internal();
        self.arena.detach_all();

        if self.leaf_count == 0 {
            self.committed = None;
            return None;
        }

        let mut level: Vec<NodeId> = self.leaves().map(Node::id).collect();
        let mut height = 0;
        while level.len() > 1 {
            let mut next_level = Vec::with_capacity(level.len().div_ceil(2));
            for pair in level.chunks(2) {
                let left = pair[0];
                // An unpaired trailing node is paired with itself.
                let right = pair.get(1).copied().unwrap_or(left);
                next_level.push(self.arena.join(left, right));
            }
            level = next_level;
            height += 1;
        }

        self.root = level.first().copied();
        self.committed = self.root_digest();
        Some(height)
    }

    fn height(&self) -> Option<usize> {
        let mut cursor = self.arena.get(self.root?)?;
        let mut height = 0;
        while let Some(left) = cursor.left() {
            cursor = self.arena.get(left)?;
            height += 1;
        }
        Some(height)
    }

    fn walk<F: FnMut(&Node<T>)>(&self, id: NodeId, visit: &mut F) {
        let Some(node) = self.arena.get(id) else {
            return;
        };
        visit(node);
        if let Some((left, right)) = node.children() {
            self.walk(left, visit);
            self.walk(right, visit);
        }
    }
}

impl<T> MerkleTree<T> {
    /// Create an empty tree that digests leaves with `hasher`
    pub fn new(hasher: impl LeafHasher<T> + 'static) -> Self {
        MerkleTree::with_parts(DEFAULT_LABEL.to_string(), Box::new(hasher))
    }

    /// Start configuring a tree
    pub fn builder() -> TreeBuilder<T> {
        TreeBuilder::new()
    }

    /// Create a tree already holding `items`, in order
    pub fn from_items(
        hasher: impl LeafHasher<T> + 'static,
        items: impl IntoIterator<Item = T>,
    ) -> Result<Self> {
        let tree = MerkleTree::new(hasher);
        tree.extend(items)?;
        Ok(tree)
    }

    fn with_parts(label: String, hasher: Box<dyn LeafHasher<T>>) -> Self {
        MerkleTree {
            label,
            hasher,
            state: Mutex::new(TreeState::new()),
        }
    }

    /// Label attached to this tree's log events
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Append an item and rebuild
    ///
    /// The item is hashed before the leaf list is touched, so a hasher
    /// error leaves the tree unchanged.
    pub fn add(&self, item: T) -> Result<()> {
        let mut state = self.state.lock();
        let leaf = Node::leaf(item, self.hasher.as_ref())?;
        state.push_leaf(leaf);
        let height = state.rebuild();
        self.log_rebuild(&state, height);
        Ok(())
    }

    /// Append many items with a single rebuild
    ///
    /// All items are hashed first; if any fails, nothing is appended.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
        let mut state = self.state.lock();
        let leaves = items
            .into_iter()
            .map(|item| Node::leaf(item, self.hasher.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if leaves.is_empty() {
            return Ok(());
        }
        for leaf in leaves {
            state.push_leaf(leaf);
        }
        let height = state.rebuild();
        self.log_rebuild(&state, height);
        Ok(())
    }

    /// Remove the first item equal to `item` and rebuild
    ///
    /// Returns `false`, leaving the tree untouched, when no item matches.
    pub fn remove(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let mut state = self.state.lock();
        let Some(index) = state.position(item) else {
            tracing::trace!(tree = %self.label, "remove: no matching leaf");
            return false;
        };
        state.remove_leaf(index);
        let height = state.rebuild();
        self.log_rebuild(&state, height);
        true
    }

    /// Replace the first item equal to `old` with `new`
    ///
    /// Only the updated leaf and its ancestors are rehashed. Returns
    /// `Ok(false)` when no item matches. A hasher error on `new` leaves the
    /// tree untouched.
    pub fn update(&self, old: &T, new: T) -> Result<bool>
    where
        T: PartialEq,
    {
        let mut state = self.state.lock();
        let Some(index) = state.position(old) else {
            tracing::trace!(tree = %self.label, "update: no matching leaf");
            return Ok(false);
        };

        let digest = self.hasher.digest(&new)?;
        let leaf_id = leaf_at(index);
        if let Some(leaf) = state.arena.get_mut(leaf_id) {
            leaf.replace_leaf(new, digest);
        }

        let mut repaired = 0;
        let mut cursor = state.arena.get(leaf_id).and_then(Node::parent);
        while let Some(id) = cursor {
            state.arena.compute_hash(id, self.hasher.as_ref())?;
            repaired += 1;
            cursor = state.arena.get(id).and_then(Node::parent);
        }
        state.committed = state.root_digest();

        tracing::debug!(
            tree = %self.label,
            leaf = index,
            repaired,
            root = ?state.committed,
            "updated leaf in place"
        );
        Ok(true)
    }

    /// Drop every item
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.leaf_count = 0;
        let height = state.rebuild();
        self.log_rebuild(&state, height);
    }

    /// Current root digest, `None` for an empty tree
    pub fn root_hash(&self) -> Option<Digest> {
        self.state.lock().root_digest()
    }

    /// Root digest recorded by the last successful mutation
    pub fn committed_root(&self) -> Option<Digest> {
        self.state.lock().committed.clone()
    }

    /// Check the current root digest against the committed one
    ///
    /// This only reads the root. It catches changes made to the root itself
    /// outside the tree API; use [`MerkleTree::verify_deep`] to catch
    /// tampering anywhere below it.
    pub fn verify_integrity(&self) -> bool {
        let state = self.state.lock();
        let current = state.root_digest();
        let intact = current == state.committed;
        if !intact {
            tracing::warn!(
                tree = %self.label,
                current = ?current,
                committed = ?state.committed,
                "root digest diverged from committed snapshot"
            );
        }
        intact
    }

    /// Recompute every digest from the leaf data up and compare each one
    /// with what is stored, then the resulting root with the committed one
    pub fn verify_deep(&self) -> Result<bool> {
        let state = self.state.lock();
        let mut expected: Vec<Digest> = Vec::with_capacity(state.arena.len());
        let mut mismatches = 0usize;

        // Children are always stored before their parent.
        for node in state.arena.iter() {
            let digest = match node.kind() {
                NodeKind::Leaf { data } => self.hasher.digest(data)?,
                NodeKind::Internal { left, right } => {
                    Digest::combine(&expected[left.index()], &expected[right.index()])
                }
            };
            if &digest != node.digest() {
                mismatches += 1;
            }
            expected.push(digest);
        }

        let recomputed_root = state.root.map(|id| expected[id.index()].clone());
        let intact = mismatches == 0 && recomputed_root == state.committed;
        if !intact {
            tracing::warn!(
                tree = %self.label,
                mismatches,
                "deep verification found tampered digests"
            );
        }
        Ok(intact)
    }

    /// Visit every node in pre-order: node, left subtree, right subtree
    ///
    /// A node paired with itself is reached through both edges of its parent
    /// and is visited twice. Does nothing on an empty tree.
    ///
    /// The tree lock is held while `visit` runs and is not reentrant: calling
    /// any method of this tree from inside `visit`, including formatting it
    /// with `{:?}`, deadlocks the calling thread. Other threads block until
    /// the traversal returns.
    pub fn traverse<F: FnMut(&Node<T>)>(&self, mut visit: F) {
        let state = self.state.lock();
        if let Some(root) = state.root {
            state.walk(root, &mut visit);
        }
    }

    /// Run `f` against one node with mutable access
    ///
    /// Changes made here bypass the tree's bookkeeping. Returns `None` when
    /// `id` does not name a node of the current tree.
    pub fn with_node_mut<R>(&self, id: NodeId, f: impl FnOnce(&mut Node<T>) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.arena.get_mut(id).map(f)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.state.lock().leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Edges between the root and any leaf, `None` for an empty tree
    pub fn height(&self) -> Option<usize> {
        self.state.lock().height()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.state.lock().position(item).is_some()
    }

    /// Leaf digests in sequence order
    pub fn leaf_digests(&self) -> Vec<Digest> {
        let state = self.state.lock();
        state.leaves().map(|leaf| leaf.digest().clone()).collect()
    }

    /// Copies of the items in sequence order
    pub fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        let state = self.state.lock();
        state.leaves().filter_map(|leaf| leaf.data().cloned()).collect()
    }

    fn log_rebuild(&self, state: &TreeState<T>, height: Option<usize>) {
        tracing::debug!(
            tree = %self.label,
            leaves = state.leaf_count,
            height = ?height,
            root = ?state.committed,
            "rebuilt merkle tree"
        );
    }
}

/// Leaves sit in the first arena slots, in order.
fn leaf_at(index: usize) -> NodeId {
    NodeId::from_index(index)
}

impl<T> fmt::Debug for MerkleTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MerkleTree")
            .field("label", &self.label)
            .field("leaves", &state.leaf_count)
            .field("root", &state.root_digest())
            .finish()
    }
}

/// Builder for [`MerkleTree`]
pub struct TreeBuilder<T> {
    label: String,
    hasher: Option<Box<dyn LeafHasher<T>>>,
}

impl<T> TreeBuilder<T> {
    pub fn new() -> Self {
        TreeBuilder {
            label: DEFAULT_LABEL.to_string(),
            hasher: None,
        }
    }

    /// Set the label attached to log events
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the leaf digest function (required)
    pub fn leaf_hasher(mut self, hasher: impl LeafHasher<T> + 'static) -> Self {
        self.hasher = Some(Box::new(hasher));
        self
    }

    /// Build the tree
    ///
    /// Fails with [`Error::Config`] if no leaf hasher was set or the label
    /// is empty.
    pub fn build(self) -> Result<MerkleTree<T>> {
        let hasher = self
            .hasher
            .ok_or_else(|| Error::Config("no leaf digest function configured".into()))?;
        if self.label.trim().is_empty() {
            return Err(Error::Config("tree label must not be empty".into()));
        }
        Ok(MerkleTree::with_parts(self.label, hasher))
    }
}

impl<T> Default for TreeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
