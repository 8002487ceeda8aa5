//! Course key parsing and rendering

use super::{is_valid_component, KeyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const COURSE_PREFIX: &str = "course-v1:";

/// Identifier of a course run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseKey {
    org: String,
    course: String,
    run: String,
    /// Parsed from the `{org}/{course}/{run}` form
    deprecated: bool,
}

impl CourseKey {
    pub fn new(org: &str, course: &str, run: &str) -> Result<Self, KeyError> {
        if ![org, course, run].iter().all(|c| is_valid_component(c)) {
            return Err(KeyError::new("course", &format!("{org}+{course}+{run}")));
        }
        Ok(Self {
            org: org.to_string(),
            course: course.to_string(),
            run: run.to_string(),
            deprecated: false,
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn course(&self) -> &str {
        &self.course
    }

    pub fn run(&self) -> &str {
        &self.run
    }

    pub const fn is_deprecated(&self) -> bool {
        self.deprecated
    }

    /// Same course rendered in the `course-v1:` form
    #[must_use]
    pub fn to_v1(&self) -> Self {
        Self {
            deprecated: false,
            ..self.clone()
        }
    }

    fn parse_v1(input: &str, body: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = body.split('+').collect();
        match parts.as_slice() {
            [org, course, run] => {
                Self::new(org, course, run).map_err(|_| KeyError::new("course", input))
            }
            _ => Err(KeyError::new("course", input)),
        }
    }

    fn parse_deprecated(input: &str) -> Result<Self, KeyError> {
        let parts: Vec<&str> = input.split('/').collect();
        match parts.as_slice() {
            [org, course, run] => {
                let mut key =
                    Self::new(org, course, run).map_err(|_| KeyError::new("course", input))?;
                key.deprecated = true;
                Ok(key)
            }
            _ => Err(KeyError::new("course", input)),
        }
    }
}

impl FromStr for CourseKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(COURSE_PREFIX).map_or_else(
            || Self::parse_deprecated(s),
            |body| Self::parse_v1(s, body),
        )
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deprecated {
            write!(f, "{}/{}/{}", self.org, self.course, self.run)
        } else {
            write!(f, "{COURSE_PREFIX}{}+{}+{}", self.org, self.course, self.run)
        }
    }
}

impl TryFrom<String> for CourseKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CourseKey> for String {
    fn from(key: CourseKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v1() {
        let key: CourseKey = "course-v1:edX+DemoX+Demo_2024".parse().unwrap();
        assert_eq!(key.org(), "edX");
        assert_eq!(key.course(), "DemoX");
        assert_eq!(key.run(), "Demo_2024");
        assert!(!key.is_deprecated());
        assert_eq!(key.to_string(), "course-v1:edX+DemoX+Demo_2024");
    }

    #[test]
    fn test_parse_deprecated() {
        let key: CourseKey = "edX/DemoX/Demo_2024".parse().unwrap();
        assert!(key.is_deprecated());
        assert_eq!(key.to_string(), "edX/DemoX/Demo_2024");
        assert_eq!(key.to_v1().to_string(), "course-v1:edX+DemoX+Demo_2024");
        assert_ne!(key, key.to_v1());
    }

    #[test]
    fn test_parse_invalid() {
        for input in [
            "",
            "course-v1:",
            "course-v1:edX+DemoX",
            "course-v1:edX+DemoX+run+extra",
            "course-v1:edX++run",
            "edX/DemoX",
            "edX/Demo X/run",
            "not a key",
        ] {
            let err = input.parse::<CourseKey>().unwrap_err();
            assert_eq!(err.input(), input);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let key: CourseKey = "course-v1:edX+DemoX+Demo_2024".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"course-v1:edX+DemoX+Demo_2024\"");
        let back: CourseKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<CourseKey>("\"bogus\"").is_err());
    }
}
