//! Course model

use serde::{Deserialize, Serialize};
use std::fmt;

/// A course the account is enrolled in for some semester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Portal-assigned course ID
    pub id: String,
    /// Course name in the requested language
    pub name: String,
    /// Name of the teacher running the course
    pub teacher_name: String,
}

/// Role under which course content is requested.
///
/// Post-graduate accounts see a different course catalogue, which the
/// portal models as a separate role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseRole {
    #[default]
    Student,
    PostGraduate,
}

impl fmt::Display for CourseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::PostGraduate => write!(f, "postgraduate"),
        }
    }
}
