//! Content store module
//!
//! Provides the course content tree and the per-user position state:
//! - `ModuleStore` trait for hierarchical block lookup
//! - In-memory store loaded from a content file
//! - Position state persisted to a TOML file

mod memory;
mod positions;

pub use memory::MemoryStore;
pub use positions::{PositionRecord, PositionStore, SharedPositionStore};

use crate::keys::{CourseKey, UsageKey};
use serde::Serialize;
use std::fmt;

/// A stored content block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub location: UsageKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub children: Vec<UsageKey>,
}

impl Block {
    pub fn block_type(&self) -> &str {
        self.location.block_type()
    }
}

/// A block with its children loaded to some depth
#[derive(Debug, Clone, Serialize)]
pub struct BlockNode {
    #[serde(flatten)]
    pub block: Block,
    /// Loaded children, empty past the requested depth
    #[serde(rename = "loaded_children", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    pub const fn location(&self) -> &UsageKey {
        &self.block.location
    }

    /// First loaded child matching the predicate
    pub fn get_child_by<P>(&self, predicate: P) -> Option<&Self>
    where
        P: Fn(&Self) -> bool,
    {
        self.children.iter().find(|child| predicate(child))
    }
}

/// Content store errors
#[derive(Debug)]
pub enum StoreError {
    /// No block at the location
    ItemNotFound(UsageKey),
    /// Content file could not be read or is inconsistent
    Load(String),
    /// Position state could not be written
    Persist(String),
    /// A lock was poisoned by a panicking writer
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ItemNotFound(location) => write!(f, "Item not found: {location}"),
            Self::Load(msg) => write!(f, "Failed to load content: {msg}"),
            Self::Persist(msg) => write!(f, "Failed to persist state: {msg}"),
            Self::Poisoned => write!(f, "Store lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Hierarchical content storage
pub trait ModuleStore: Send + Sync {
    /// Load a course's root block with children expanded `depth` levels.
    /// `Ok(None)` when the course does not exist.
    fn get_course(&self, course_key: &CourseKey, depth: usize)
        -> Result<Option<BlockNode>, StoreError>;

    /// Load a single block
    fn get_item(&self, location: &UsageKey) -> Result<Block, StoreError>;

    /// Location of the block's parent, `None` for a course root
    fn get_parent_location(&self, location: &UsageKey) -> Result<Option<UsageKey>, StoreError>;
}
