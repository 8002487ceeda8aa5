//! Opaque key module
//!
//! String forms for course and content-block identifiers:
//! - `course-v1:{org}+{course}+{run}` (and the deprecated `{org}/{course}/{run}`)
//! - `block-v1:{org}+{course}+{run}+type@{block_type}+block@{block_id}`

mod course;
mod usage;

pub use course::CourseKey;
pub use usage::UsageKey;

use std::fmt;

/// Key parsing error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyError {
    kind: &'static str,
    input: String,
}

impl KeyError {
    pub(crate) fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }

    /// The rejected input string
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {} key: '{}'", self.kind, self.input)
    }
}

impl std::error::Error for KeyError {}

/// Check a key component against the allowed id characters `[A-Za-z0-9_\-~.:]`
fn is_valid_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '~' | '.' | ':'))
}
