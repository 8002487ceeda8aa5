//! Block binding module
//!
//! Materializes stored blocks for an acting user. A bound block exposes a
//! position field only when its block type supports one; callers check the
//! capability through `BoundBlock::position_mut`.

use std::collections::HashSet;
use std::fmt;

use crate::keys::UsageKey;
use crate::store::{Block, SharedPositionStore, StoreError};

/// The user on whose behalf blocks are bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    User(String),
    Anonymous,
}

impl Actor {
    /// Build an actor from an optional username, treating blank names as anonymous
    pub fn from_username(username: Option<&str>) -> Self {
        match username.map(str::trim) {
            Some(name) if !name.is_empty() => Self::User(name.to_string()),
            _ => Self::Anonymous,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::User(name) => Some(name.as_str()),
            Self::Anonymous => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(name) => write!(f, "{name}"),
            Self::Anonymous => write!(f, "<anonymous>"),
        }
    }
}

/// User-scoped position field of a bound block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionField {
    value: Option<u32>,
    dirty: bool,
}

impl PositionField {
    const fn new(value: Option<u32>) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    /// Current 1-based position, `None` when never set
    pub const fn get(&self) -> Option<u32> {
        self.value
    }

    /// Update the value; marks the field dirty only on change
    pub fn set(&mut self, position: u32) {
        if self.value != Some(position) {
            self.value = Some(position);
            self.dirty = true;
        }
    }

    #[cfg(test)]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A block materialized for one user
pub struct BoundBlock {
    block: Block,
    user: String,
    position: Option<PositionField>,
    positions: SharedPositionStore,
}

impl BoundBlock {
    pub fn children(&self) -> &[UsageKey] {
        &self.block.children
    }

    /// Position field, if this block type has one
    pub const fn position(&self) -> Option<&PositionField> {
        self.position.as_ref()
    }

    /// Mutable position field, if this block type has one
    pub fn position_mut(&mut self) -> Option<&mut PositionField> {
        self.position.as_mut()
    }

    /// Write dirty fields to the position store. Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool, StoreError> {
        let Some(field) = self.position.as_mut() else {
            return Ok(false);
        };
        let (true, Some(value)) = (field.dirty, field.value) else {
            return Ok(false);
        };
        self.positions.set(&self.user, &self.block.location, value)?;
        field.dirty = false;
        Ok(true)
    }
}

impl fmt::Debug for BoundBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundBlock")
            .field("location", &self.block.location.to_string())
            .field("user", &self.user)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

/// Materializes blocks for an actor
pub trait BlockBinder: Send + Sync {
    /// Bind a stored block. `Ok(None)` when the actor cannot have state on it.
    fn bind(&self, actor: &Actor, block: Block) -> Result<Option<BoundBlock>, StoreError>;
}

/// Binder backed by the position store
pub struct RuntimeBinder {
    positioned_types: HashSet<String>,
    positions: SharedPositionStore,
}

impl RuntimeBinder {
    pub fn new<I, S>(positioned_types: I, positions: SharedPositionStore) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positioned_types: positioned_types.into_iter().map(Into::into).collect(),
            positions,
        }
    }

    pub fn has_position(&self, block_type: &str) -> bool {
        self.positioned_types.contains(block_type)
    }
}

impl BlockBinder for RuntimeBinder {
    fn bind(&self, actor: &Actor, block: Block) -> Result<Option<BoundBlock>, StoreError> {
        // Anonymous users have no user-scoped state
        let Some(user) = actor.username() else {
            return Ok(None);
        };

        let position = if self.has_position(block.block_type()) {
            Some(PositionField::new(self.positions.get(user, &block.location)?))
        } else {
            None
        };

        Ok(Some(BoundBlock {
            block,
            user: user.to_string(),
            position,
            positions: self.positions.clone(),
        }))
    }
}
