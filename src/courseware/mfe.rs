//! Learning MFE URL construction

use crate::http::QueryParams;
use crate::keys::{CourseKey, UsageKey};

/// Build the learning MFE URL for a course location.
///
/// The unit segment is only emitted when a sequence is present, since the MFE
/// resolves units relative to their sequence.
pub fn make_learning_mfe_courseware_url(
    base_url: &str,
    course_key: &CourseKey,
    sequence_key: Option<&UsageKey>,
    unit_key: Option<&UsageKey>,
    params: &QueryParams,
    preview: bool,
) -> String {
    let mut path = format!("/course/{course_key}");
    if let Some(sequence) = sequence_key {
        path.push('/');
        path.push_str(&sequence.to_string());
        if let Some(unit) = unit_key {
            path.push('/');
            path.push_str(&unit.to_string());
        }
    }
    if preview {
        path.insert_str(0, "/preview");
    }

    let mut url = format!("{}{path}", base_url.trim_end_matches('/'));
    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.encode());
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{demo_course_key, demo_key};

    const BASE: &str = "http://learning.example.com/";

    #[test]
    fn test_course_only() {
        let url = make_learning_mfe_courseware_url(
            BASE,
            &demo_course_key(),
            None,
            None,
            &QueryParams::default(),
            false,
        );
        assert_eq!(
            url,
            "http://learning.example.com/course/course-v1:edX+DemoX+2024"
        );
    }

    #[test]
    fn test_sequence_and_unit() {
        let seq = demo_key("sequential", "lesson2");
        let unit = demo_key("vertical", "lesson2_unit_b");
        let url = make_learning_mfe_courseware_url(
            BASE,
            &demo_course_key(),
            Some(&seq),
            Some(&unit),
            &QueryParams::default(),
            false,
        );
        assert_eq!(
            url,
            "http://learning.example.com/course/course-v1:edX+DemoX+2024\
             /block-v1:edX+DemoX+2024+type@sequential+block@lesson2\
             /block-v1:edX+DemoX+2024+type@vertical+block@lesson2_unit_b"
        );
    }

    #[test]
    fn test_unit_without_sequence_dropped() {
        let unit = demo_key("vertical", "lesson2_unit_b");
        let url = make_learning_mfe_courseware_url(
            BASE,
            &demo_course_key(),
            None,
            Some(&unit),
            &QueryParams::default(),
            false,
        );
        assert!(!url.contains("lesson2_unit_b"));
    }

    #[test]
    fn test_preview_and_params() {
        let seq = demo_key("sequential", "lesson1");
        let params = QueryParams::parse(Some("utm_source=mail&show=all"));
        let url = make_learning_mfe_courseware_url(
            "http://mfe:2000",
            &demo_course_key(),
            Some(&seq),
            None,
            &params,
            true,
        );
        assert_eq!(
            url,
            "http://mfe:2000/preview/course/course-v1:edX+DemoX+2024\
             /block-v1:edX+DemoX+2024+type@sequential+block@lesson1\
             ?utm_source=mail&show=all"
        );
    }
}
