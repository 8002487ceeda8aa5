//! Courseware index redirect
//!
//! `/courses/{course_id}/courseware[/{chapter}[/{section}[/{position}]]]` is
//! no longer rendered here. The equivalent learning MFE URL is resolved and
//! returned as a redirect. Access checks happen in the MFE.

use super::{
    make_learning_mfe_courseware_url, CoursewareContext, CoursewareError, Outcome,
    UNIT_BLOCK_TYPE,
};
use crate::http::query::decode_path_segment;
use crate::http::QueryParams;
use crate::keys::{CourseKey, UsageKey};
use crate::logger;

const COURSES_PREFIX: &str = "/courses/";
const COURSEWARE_SEGMENT: &str = "/courseware";
const ACTIVATE_BLOCK_PARAM: &str = "activate_block_id";

/// Decoded segments of a courseware URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursewarePath {
    pub course_id: String,
    pub chapter: Option<String>,
    pub section: Option<String>,
    pub position: Option<String>,
}

/// Match a courseware URL path. A single trailing slash is accepted.
pub fn parse_courseware_path(path: &str) -> Option<CoursewarePath> {
    let rest = path.strip_prefix(COURSES_PREFIX)?;

    // Deprecated course ids contain slashes, so find the `/courseware` segment itself
    let (course_id, tail) = rest.match_indices(COURSEWARE_SEGMENT).find_map(|(idx, _)| {
        let tail = &rest[idx + COURSEWARE_SEGMENT.len()..];
        (tail.is_empty() || tail.starts_with('/')).then(|| (&rest[..idx], tail))
    })?;
    if course_id.is_empty() {
        return None;
    }

    let tail = tail.strip_prefix('/').unwrap_or(tail);
    let tail = tail.strip_suffix('/').unwrap_or(tail);
    let segments: Vec<&str> = if tail.is_empty() {
        Vec::new()
    } else {
        tail.split('/').collect()
    };
    if segments.len() > 3 || segments.iter().any(|s| s.is_empty()) {
        return None;
    }

    let segment = |i: usize| segments.get(i).map(|s| decode_path_segment(s));
    Some(CoursewarePath {
        course_id: decode_path_segment(course_id),
        chapter: segment(0),
        section: segment(1),
        position: segment(2),
    })
}

/// Resolve a courseware URL to its learning MFE location
pub fn courseware_index(
    ctx: &CoursewareContext<'_>,
    request: &CoursewarePath,
    params: &QueryParams,
) -> Result<Outcome, CoursewareError> {
    let course_key: CourseKey = request.course_id.parse()?;

    // Shallow course load to resolve chapters/sections. An unknown course still
    // redirects; the MFE renders its own not-found page.
    let course = ctx.store.get_course(&course_key, ctx.content_depth)?;
    if course.is_none() {
        logger::log_debug(&format!("[Courseware] Course {course_key} not in store"));
    }

    let mut section_location = None;
    if let (Some(chapter), Some(section)) = (request.chapter.as_deref(), request.section.as_deref()) {
        section_location = course
            .as_ref()
            .and_then(|course| course.get_child_by(|m| m.location().block_id() == chapter))
            .and_then(|chapter_block| {
                chapter_block.get_child_by(|m| m.location().block_id() == section)
            })
            .map(|section_block| section_block.location().clone());
        if section_location.is_none() {
            logger::log_debug(&format!(
                "[Courseware] {chapter}/{section} not found in {course_key}"
            ));
        }
    }

    if let Some(position) = &request.position {
        logger::log_debug(&format!(
            "[Courseware] Ignoring position '{position}', the MFE tracks it"
        ));
    }

    let unit_key = activate_unit_key(params);

    let url = make_learning_mfe_courseware_url(
        ctx.mfe_base_url,
        &course_key,
        section_location.as_ref(),
        unit_key.as_ref(),
        params,
        false,
    );
    Ok(Outcome::Redirect(url))
}

/// `activate_block_id` as a unit key; invalid keys and non-unit blocks are dropped
fn activate_unit_key(params: &QueryParams) -> Option<UsageKey> {
    let raw = params.get(ACTIVATE_BLOCK_PARAM).unwrap_or_default();
    match raw.parse::<UsageKey>() {
        Ok(key) if key.block_type() == UNIT_BLOCK_TYPE => Some(key),
        Ok(key) => {
            logger::log_debug(&format!(
                "[Courseware] Ignoring {ACTIVATE_BLOCK_PARAM} of type '{}'",
                key.block_type()
            ));
            None
        }
        Err(e) => {
            if !raw.is_empty() {
                logger::log_debug(&format!("[Courseware] Ignoring {ACTIVATE_BLOCK_PARAM}: {e}"));
            }
            None
        }
    }
}
