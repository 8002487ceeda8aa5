//! Courseware module
//!
//! Resolves legacy courseware URLs to the learning MFE and records
//! per-user positions on the content tree.

mod index;
mod mfe;
mod position;

pub use index::{courseware_index, parse_courseware_path};
pub use mfe::make_learning_mfe_courseware_url;
pub use position::{save_positions_recursively_up, PositionUpdate};

use std::fmt;

use crate::http::QueryParams;
use crate::keys::KeyError;
use crate::store::{ModuleStore, StoreError};

/// Default depth of the course load used to resolve chapters and sections
pub const CONTENT_DEPTH: usize = 2;

/// Block type the MFE can activate as a unit
pub const UNIT_BLOCK_TYPE: &str = "vertical";

/// What the dispatcher should do with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send the browser to this URL
    Redirect(String),
    /// Not a courseware request; try the next route
    Continue,
}

/// Courseware request errors
#[derive(Debug)]
pub enum CoursewareError {
    InvalidCourseKey(KeyError),
    Store(StoreError),
}

impl fmt::Display for CoursewareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCourseKey(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CoursewareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidCourseKey(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<KeyError> for CoursewareError {
    fn from(e: KeyError) -> Self {
        Self::InvalidCourseKey(e)
    }
}

impl From<StoreError> for CoursewareError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Collaborators and settings for courseware requests
pub struct CoursewareContext<'a> {
    pub store: &'a dyn ModuleStore,
    pub mfe_base_url: &'a str,
    pub content_depth: usize,
}

/// Handle `path` if it is a courseware URL
pub fn dispatch(
    ctx: &CoursewareContext<'_>,
    path: &str,
    params: &QueryParams,
) -> Result<Outcome, CoursewareError> {
    match parse_courseware_path(path) {
        Some(route) => courseware_index(ctx, &route, params),
        None => Ok(Outcome::Continue),
    }
}
