// In-memory module store
// Loads course trees from a TOML or JSON content file and serves read-only lookups

use serde::Deserialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

use super::{Block, BlockNode, ModuleStore, StoreError};
use crate::keys::{CourseKey, UsageKey};

const ROOT_BLOCK_TYPE: &str = "course";

/// Content file layout
#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(default)]
    courses: Vec<CourseDefinition>,
}

/// One course: its key and a flat list of blocks
#[derive(Debug, Deserialize)]
struct CourseDefinition {
    key: CourseKey,
    #[serde(default)]
    blocks: Vec<BlockDefinition>,
}

/// One block; children are referenced by block id within the same course
#[derive(Debug, Deserialize)]
struct BlockDefinition {
    #[serde(rename = "type")]
    block_type: String,
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    children: Vec<String>,
}

/// Read-only store holding every block in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    blocks: HashMap<UsageKey, Block>,
    parents: HashMap<UsageKey, UsageKey>,
    /// Root block per course, keyed by the `course-v1:` form
    roots: HashMap<CourseKey, UsageKey>,
}

impl MemoryStore {
    /// Load a content file, choosing the format by extension (`.json`, otherwise TOML)
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)
            .map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let store = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        crate::logger::log_info(&format!(
            "Loaded {} course(s), {} block(s) from {}",
            store.course_count(),
            store.blocks.len(),
            path.display()
        ));
        Ok(store)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, StoreError> {
        let file: ContentFile =
            toml::from_str(content).map_err(|e| StoreError::Load(format!("Invalid TOML: {e}")))?;
        Self::from_definitions(file.courses)
    }

    pub fn from_json_str(content: &str) -> Result<Self, StoreError> {
        let file: ContentFile = serde_json::from_str(content)
            .map_err(|e| StoreError::Load(format!("Invalid JSON: {e}")))?;
        Self::from_definitions(file.courses)
    }

    pub fn course_count(&self) -> usize {
        self.roots.len()
    }

    fn from_definitions(courses: Vec<CourseDefinition>) -> Result<Self, StoreError> {
        let mut store = Self::default();
        for course in courses {
            store.insert_course(course)?;
        }
        Ok(store)
    }

    fn insert_course(&mut self, definition: CourseDefinition) -> Result<(), StoreError> {
        let course_key = definition.key.to_v1();
        if self.roots.contains_key(&course_key) {
            return Err(StoreError::Load(format!("Duplicate course {course_key}")));
        }

        // First pass: assign locations by block id
        let mut locations: HashMap<&str, UsageKey> = HashMap::new();
        for block in &definition.blocks {
            let location = UsageKey::new(&course_key, &block.block_type, &block.id)
                .map_err(|e| StoreError::Load(e.to_string()))?;
            if locations.insert(block.id.as_str(), location).is_some() {
                return Err(StoreError::Load(format!(
                    "Duplicate block id '{}' in {course_key}",
                    block.id
                )));
            }
        }

        // Second pass: resolve children and parents
        let mut blocks = HashMap::new();
        let mut parents = HashMap::new();
        for block in &definition.blocks {
            let location = locations[block.id.as_str()].clone();
            let mut children = Vec::with_capacity(block.children.len());
            for child_id in &block.children {
                let child = locations.get(child_id.as_str()).ok_or_else(|| {
                    StoreError::Load(format!(
                        "Block '{}' in {course_key} has unknown child '{child_id}'",
                        block.id
                    ))
                })?;
                if parents.insert(child.clone(), location.clone()).is_some() {
                    return Err(StoreError::Load(format!(
                        "Block '{child_id}' in {course_key} has more than one parent"
                    )));
                }
                children.push(child.clone());
            }
            blocks.insert(
                location.clone(),
                Block {
                    location,
                    display_name: block.display_name.clone(),
                    children,
                },
            );
        }

        let mut roots = blocks
            .keys()
            .filter(|loc| loc.block_type() == ROOT_BLOCK_TYPE);
        let (Some(root), None) = (roots.next().cloned(), roots.next()) else {
            return Err(StoreError::Load(format!(
                "{course_key} must have exactly one '{ROOT_BLOCK_TYPE}' block"
            )));
        };
        if parents.contains_key(&root) {
            return Err(StoreError::Load(format!(
                "Root block of {course_key} cannot be a child"
            )));
        }

        let reachable = reachable_from(&root, &blocks);
        if reachable.len() != blocks.len() {
            return Err(StoreError::Load(format!(
                "{course_key} has {} block(s) unreachable from its root",
                blocks.len() - reachable.len()
            )));
        }

        self.roots.insert(course_key, root);
        self.parents.extend(parents);
        self.blocks.extend(blocks);
        Ok(())
    }

    fn build_node(&self, location: &UsageKey, depth: usize) -> Result<BlockNode, StoreError> {
        let block = self.get_item(location)?;
        let children = if depth == 0 {
            Vec::new()
        } else {
            block
                .children
                .iter()
                .map(|child| self.build_node(child, depth - 1))
                .collect::<Result<_, _>>()?
        };
        Ok(BlockNode { block, children })
    }
}

fn reachable_from(root: &UsageKey, blocks: &HashMap<UsageKey, Block>) -> HashSet<UsageKey> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([root.clone()]);
    while let Some(location) = queue.pop_front() {
        if !seen.insert(location.clone()) {
            continue;
        }
        if let Some(block) = blocks.get(&location) {
            queue.extend(block.children.iter().cloned());
        }
    }
    seen
}

impl ModuleStore for MemoryStore {
    fn get_course(
        &self,
        course_key: &CourseKey,
        depth: usize,
    ) -> Result<Option<BlockNode>, StoreError> {
        self.roots
            .get(&course_key.to_v1())
            .map(|root| self.build_node(root, depth))
            .transpose()
    }

    fn get_item(&self, location: &UsageKey) -> Result<Block, StoreError> {
        self.blocks
            .get(location)
            .cloned()
            .ok_or_else(|| StoreError::ItemNotFound(location.clone()))
    }

    fn get_parent_location(&self, location: &UsageKey) -> Result<Option<UsageKey>, StoreError> {
        if !self.blocks.contains_key(location) {
            return Err(StoreError::ItemNotFound(location.clone()));
        }
        Ok(self.parents.get(location).cloned())
    }
}
