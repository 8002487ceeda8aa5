//! Shared fixtures for unit tests.
//!
//! The demo course mirrors a small real course outline:
//!
//! ```text
//! course
//! ├── intro (chapter)
//! │   └── welcome (sequential): welcome_unit, welcome_video
//! └── week1 (chapter)
//!     ├── lesson1 (sequential): lesson1_unit
//!     └── lesson2 (sequential): lesson2_unit_a, lesson2_unit_b, lesson2_unit_c
//! ```

use crate::config::{AppState, Config};
use crate::keys::{CourseKey, UsageKey};
use crate::store::{MemoryStore, PositionStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DEMO_COURSE_ID: &str = "course-v1:edX+DemoX+2024";

pub const DEMO_COURSE: &str = r#"
[[courses]]
key = "course-v1:edX+DemoX+2024"

[[courses.blocks]]
type = "course"
id = "course"
display_name = "Demo Course"
children = ["intro", "week1"]

[[courses.blocks]]
type = "chapter"
id = "intro"
children = ["welcome"]

[[courses.blocks]]
type = "sequential"
id = "welcome"
children = ["welcome_unit", "welcome_video"]

[[courses.blocks]]
type = "vertical"
id = "welcome_unit"
children = ["welcome_html"]

[[courses.blocks]]
type = "html"
id = "welcome_html"

[[courses.blocks]]
type = "vertical"
id = "welcome_video"

[[courses.blocks]]
type = "chapter"
id = "week1"
children = ["lesson1", "lesson2"]

[[courses.blocks]]
type = "sequential"
id = "lesson1"
children = ["lesson1_unit"]

[[courses.blocks]]
type = "vertical"
id = "lesson1_unit"

[[courses.blocks]]
type = "sequential"
id = "lesson2"
children = ["lesson2_unit_a", "lesson2_unit_b", "lesson2_unit_c"]

[[courses.blocks]]
type = "vertical"
id = "lesson2_unit_a"

[[courses.blocks]]
type = "vertical"
id = "lesson2_unit_b"

[[courses.blocks]]
type = "vertical"
id = "lesson2_unit_c"
"#;

pub fn demo_store() -> MemoryStore {
    MemoryStore::from_toml_str(DEMO_COURSE).unwrap()
}

pub fn demo_course_key() -> CourseKey {
    DEMO_COURSE_ID.parse().unwrap()
}

pub fn demo_key(block_type: &str, id: &str) -> UsageKey {
    UsageKey::new(&demo_course_key(), block_type, id).unwrap()
}

/// Unique state file path under the system temp directory
pub fn temp_state_path(label: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "courseware-redirect-{label}-{}-{n}.toml",
        std::process::id()
    ))
}

/// Position store that never touches the filesystem
pub fn memory_positions() -> PositionStore {
    PositionStore::new(temp_state_path("unused"), false)
}

/// Application state over the demo course with in-memory positions
pub fn demo_state() -> Arc<AppState> {
    let mut cfg = Config::load_from("/nonexistent/courseware-redirect-config").unwrap();
    cfg.courseware.mfe_base_url = "http://mfe.test".to_string();
    cfg.logging.access_log = false;
    Arc::new(AppState::new(
        &cfg,
        Arc::new(demo_store()),
        Arc::new(memory_positions()),
    ))
}
