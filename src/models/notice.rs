//! Notice (course announcement) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Attachment;

/// A course announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Portal-assigned notice ID
    pub id: String,
    /// ID of the course this notice belongs to
    pub course_id: String,
    /// Course name, denormalized for display without a join
    pub course_name: String,
    /// Course teacher name, denormalized likewise
    pub course_teacher_name: String,
    /// Notice title
    pub title: String,
    /// Who published the notice
    pub publisher: String,
    /// When the notice was published
    pub published_at: DateTime<Utc>,
    /// Raw HTML body as served by the portal
    pub content: String,
    /// Plain-text rendering of the body (tags stripped, entities decoded)
    pub summary: String,
    /// Whether the portal has marked this notice as read
    pub has_read: bool,
    /// Attached file, if any
    pub attachment: Option<Attachment>,
}

impl Notice {
    /// Get a short preview of the summary (for list display)
    pub fn preview(&self, max_len: usize) -> String {
        if self.summary.chars().count() <= max_len {
            self.summary.clone()
        } else {
            let cut: String = self.summary.chars().take(max_len.saturating_sub(3)).collect();
            format!("{cut}...")
        }
    }
}
