// API type definitions module
// Request/response bodies of the management API

use serde::{Deserialize, Serialize};

use crate::courseware::PositionUpdate;
use crate::store::{BlockNode, PositionRecord};

/// Body of `POST /v1/positions`
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    /// Learner; absent or empty means anonymous
    #[serde(default)]
    pub user: Option<String>,
    /// Block the learner visited
    pub usage_key: String,
}

/// Acknowledgement of a position save
#[derive(Debug, Serialize)]
pub struct PositionAck {
    pub status: &'static str,
    pub user: Option<String>,
    pub usage_key: String,
    /// Positioned ancestors, root-ward
    pub updates: Vec<PositionUpdate>,
}

/// Persisted positions of one learner
#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub user: String,
    pub persisted: bool,
    pub positions: Vec<PositionRecord>,
}

/// Course tree loaded to some depth
#[derive(Debug, Serialize)]
pub struct OutlineResponse {
    pub course_key: String,
    pub depth: usize,
    pub outline: BlockNode,
    /// The requested learner's positions within this course
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<PositionRecord>>,
}
