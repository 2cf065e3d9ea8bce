use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

define_id!(
    /// Identifier of a learner (or a course teacher) in the identity service.
    UserId
);
define_id!(
    /// Identifier of a course in the catalog.
    CourseId
);
define_id!(
    /// Identifier of a lesson in the catalog.
    LessonId
);
define_id!(
    /// Row identifier of an enrollment.
    EnrollmentId
);
define_id!(
    /// Row identifier of a lesson completion record.
    CompletionId
);
define_id!(
    /// Row identifier of an issued certificate.
    CertificateId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prints_bare_number() {
        assert_eq!(UserId::new(42).to_string(), "42");
        assert_eq!(format!("{:?}", LessonId::new(7)), "LessonId(7)");
    }

    #[test]
    fn parses_from_str() {
        let id: CourseId = " 123 ".parse().unwrap();
        assert_eq!(id, CourseId::new(123));
    }

    #[test]
    fn rejects_malformed_identifier() {
        let err = "lesson-1".parse::<LessonId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse LessonId from string");
        assert!("-4".parse::<UserId>().is_err());
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&CertificateId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
