//! Assignment (homework) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attachment;

/// A homework assignment with its submission state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Portal-assigned assignment ID
    pub id: String,
    /// Per-student submission record ID, needed when submitting work
    pub student_homework_id: String,
    /// ID of the course this assignment belongs to
    pub course_id: String,
    /// Course name, denormalized for display without a join
    pub course_name: String,
    /// Course teacher name, denormalized likewise
    pub course_teacher_name: String,
    /// Assignment title
    pub title: String,
    /// Raw HTML description as served by the portal
    pub description: String,
    /// Plain-text rendering of the description
    pub summary: String,
    /// Submission deadline
    pub deadline: DateTime<Utc>,
    /// Attached file, if any
    pub attachment: Option<Attachment>,
    /// Whether work has been handed in
    pub submitted: bool,
    /// When work was handed in
    pub submitted_at: Option<DateTime<Utc>>,
    /// Text content of the submission, if any
    pub submitted_content: Option<String>,
    /// Grade assigned by the teacher, if graded
    pub grade: Option<f64>,
    /// Free-form grading comment, if any
    pub grade_content: Option<String>,
}

impl Assignment {
    /// Whether the deadline has already passed
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.deadline < now
    }

    /// Whether the teacher has graded this assignment
    pub fn graded(&self) -> bool {
        self.grade.is_some() || self.grade_content.is_some()
    }
}
