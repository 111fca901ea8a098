//! Declarative tree configuration
//!
//! A [`TreeConfig`] selects one of the built-in leaf digest algorithms and a
//! label for log events. It can be kept as JSON next to whatever owns the
//! tree:
//!
//! ```json
//! { "label": "inventory", "leaf_digest": "blake3" }
//! ```

use crate::digest::{Blake3Leaf, Sha256Leaf};
use crate::merkle::{MerkleTree, DEFAULT_LABEL};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in leaf digest algorithms
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafDigest {
    /// SHA-256 of the item's bytes
    #[default]
    Sha256,
    /// BLAKE3 of the item's bytes
    Blake3,
}

/// Configuration for a byte-oriented tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Label attached to log events
    #[serde(default = "default_label")]
    pub label: String,
    /// Algorithm applied to each leaf item
    #[serde(default)]
    pub leaf_digest: LeafDigest,
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            label: default_label(),
            leaf_digest: LeafDigest::default(),
        }
    }
}

impl TreeConfig {
    /// Parse a config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TreeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file, falling back to defaults if the file
    /// does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Save the config as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(Error::Config("tree label must not be empty".into()));
        }
        Ok(())
    }

    /// Build an empty tree for byte-like items
    pub fn build<T: AsRef<[u8]>>(&self) -> Result<MerkleTree<T>> {
        self.validate()?;
        let builder = MerkleTree::builder().label(self.label.clone());
        match self.leaf_digest {
            LeafDigest::Sha256 => builder.leaf_hasher(Sha256Leaf).build(),
            LeafDigest::Blake3 => builder.leaf_hasher(Blake3Leaf).build(),
        }
    }
}
