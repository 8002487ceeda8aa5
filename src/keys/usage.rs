//! Usage key parsing and rendering

use super::{is_valid_component, CourseKey, KeyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BLOCK_PREFIX: &str = "block-v1:";

/// Identifier of a content block within a course
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsageKey {
    course_key: CourseKey,
    block_type: String,
    block_id: String,
}

impl UsageKey {
    pub fn new(course_key: &CourseKey, block_type: &str, block_id: &str) -> Result<Self, KeyError> {
        if !is_valid_component(block_type) || !is_valid_component(block_id) {
            return Err(KeyError::new(
                "usage",
                &format!("{course_key}+type@{block_type}+block@{block_id}"),
            ));
        }
        Ok(Self {
            course_key: course_key.to_v1(),
            block_type: block_type.to_string(),
            block_id: block_id.to_string(),
        })
    }

    pub const fn course_key(&self) -> &CourseKey {
        &self.course_key
    }

    pub fn block_type(&self) -> &str {
        &self.block_type
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }
}

impl FromStr for UsageKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::new("usage", s);
        let body = s.strip_prefix(BLOCK_PREFIX).ok_or_else(invalid)?;
        let parts: Vec<&str> = body.split('+').collect();
        let [org, course, run, type_part, block_part] = parts.as_slice() else {
            return Err(invalid());
        };
        let block_type = type_part.strip_prefix("type@").ok_or_else(invalid)?;
        let block_id = block_part.strip_prefix("block@").ok_or_else(invalid)?;
        let course_key = CourseKey::new(org, course, run).map_err(|_| invalid())?;
        Self::new(&course_key, block_type, block_id).map_err(|_| invalid())
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{BLOCK_PREFIX}{}+{}+{}+type@{}+block@{}",
            self.course_key.org(),
            self.course_key.course(),
            self.course_key.run(),
            self.block_type,
            self.block_id
        )
    }
}

impl TryFrom<String> for UsageKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsageKey> for String {
    fn from(key: UsageKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTICAL: &str = "block-v1:edX+DemoX+Demo_2024+type@vertical+block@welcome_unit";

    #[test]
    fn test_parse_block_key() {
        let key: UsageKey = VERTICAL.parse().unwrap();
        assert_eq!(key.block_type(), "vertical");
        assert_eq!(key.block_id(), "welcome_unit");
        assert_eq!(
            key.course_key().to_string(),
            "course-v1:edX+DemoX+Demo_2024"
        );
        assert_eq!(key.to_string(), VERTICAL);
    }

    #[test]
    fn test_new_from_deprecated_course() {
        let course: CourseKey = "edX/DemoX/Demo_2024".parse().unwrap();
        let key = UsageKey::new(&course, "vertical", "welcome_unit").unwrap();
        assert_eq!(key.to_string(), VERTICAL);
        assert!(!key.course_key().is_deprecated());
    }

    #[test]
    fn test_parse_invalid() {
        for input in [
            "",
            "welcome_unit",
            "block-v1:edX+DemoX+Demo_2024+type@vertical",
            "block-v1:edX+DemoX+Demo_2024+vertical+block@welcome_unit",
            "block-v1:edX+DemoX+Demo_2024+type@vertical+welcome_unit",
            "block-v1:edX+DemoX+Demo_2024+type@+block@welcome_unit",
            "block-v1:edX+DemoX+type@vertical+block@welcome_unit",
            "course-v1:edX+DemoX+Demo_2024",
        ] {
            assert!(input.parse::<UsageKey>().is_err(), "accepted {input:?}");
        }
    }
}
