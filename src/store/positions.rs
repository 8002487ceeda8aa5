// Position state module
// Per-user "last visited child" positions, saved to a TOML state file

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::StoreError;
use crate::keys::UsageKey;
use crate::logger;

/// One persisted position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub user: String,
    pub location: UsageKey,
    /// 1-based index of the last visited child
    pub position: u32,
}

/// State file layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistentState {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    positions: Vec<PositionRecord>,
}

type PositionMap = HashMap<String, HashMap<UsageKey, u32>>;

/// Position state manager
pub struct PositionStore {
    /// Path to state file
    state_path: PathBuf,
    /// Positions by user, then block location
    positions: RwLock<PositionMap>,
    /// Whether changes are written to disk
    enabled: bool,
}

impl PositionStore {
    /// Create a position store, loading the state file when persistence is enabled
    pub fn new(state_path: PathBuf, enabled: bool) -> Self {
        let positions = if enabled {
            Self::load_state(&state_path).unwrap_or_default()
        } else {
            PositionMap::new()
        };

        Self {
            state_path,
            positions: RwLock::new(positions),
            enabled,
        }
    }

    /// Load state from file
    fn load_state(path: &Path) -> Option<PositionMap> {
        if !path.exists() {
            return None;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to read state file {}: {e}",
                    path.display()
                ));
                return None;
            }
        };

        match toml::from_str::<PersistentState>(&content) {
            Ok(state) => {
                logger::log_info(&format!(
                    "Loaded {} position(s) from {}",
                    state.positions.len(),
                    path.display()
                ));
                let mut map = PositionMap::new();
                for record in state.positions {
                    map.entry(record.user)
                        .or_default()
                        .insert(record.location, record.position);
                }
                Some(map)
            }
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to parse state file {}: {e}",
                    path.display()
                ));
                None
            }
        }
    }

    /// Save state to file
    fn save_state(&self, positions: &PositionMap) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }

        let state = PersistentState {
            positions: collect_records(positions, None),
        };
        let content = toml::to_string_pretty(&state)
            .map_err(|e| StoreError::Persist(format!("Failed to serialize state: {e}")))?;

        if let Some(parent) = self.state_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Persist(format!("Failed to create state dir: {e}")))?;
            }
        }
        fs::write(&self.state_path, content)
            .map_err(|e| StoreError::Persist(format!("Failed to write state file: {e}")))
    }

    /// Stored position of a block for a user
    pub fn get(&self, user: &str, location: &UsageKey) -> Result<Option<u32>, StoreError> {
        let positions = self.positions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(positions
            .get(user)
            .and_then(|blocks| blocks.get(location))
            .copied())
    }

    /// Store a position and write the state file
    pub fn set(&self, user: &str, location: &UsageKey, position: u32) -> Result<(), StoreError> {
        let mut positions = self.positions.write().map_err(|_| StoreError::Poisoned)?;
        positions
            .entry(user.to_string())
            .or_default()
            .insert(location.clone(), position);
        self.save_state(&positions)
    }

    /// All positions stored for a user, ordered by location
    pub fn for_user(&self, user: &str) -> Result<Vec<PositionRecord>, StoreError> {
        let positions = self.positions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collect_records(&positions, Some(user)))
    }

    /// Clear all positions and remove the state file
    pub fn clear(&self) -> Result<(), StoreError> {
        {
            let mut positions = self.positions.write().map_err(|_| StoreError::Poisoned)?;
            positions.clear();
        }

        if self.enabled && self.state_path.exists() {
            fs::remove_file(&self.state_path)
                .map_err(|e| StoreError::Persist(format!("Failed to remove state file: {e}")))?;
        }

        Ok(())
    }

    /// Get state file path
    #[allow(clippy::missing_const_for_fn)]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Check if persistence is enabled
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

fn collect_records(positions: &PositionMap, user: Option<&str>) -> Vec<PositionRecord> {
    let mut records: Vec<PositionRecord> = positions
        .iter()
        .filter(|(name, _)| user.map_or(true, |u| u == name.as_str()))
        .flat_map(|(name, blocks)| {
            blocks.iter().map(move |(location, position)| PositionRecord {
                user: name.clone(),
                location: location.clone(),
                position: *position,
            })
        })
        .collect();
    records.sort_by_cached_key(|r| (r.user.clone(), r.location.to_string()));
    records
}

/// Wrapper for Arc<PositionStore>
pub type SharedPositionStore = Arc<PositionStore>;
