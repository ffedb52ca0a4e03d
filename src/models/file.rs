//! Course file model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file uploaded to a course by its teacher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFile {
    /// Portal-assigned file ID
    pub id: String,
    /// ID of the course this file belongs to
    pub course_id: String,
    /// Course name, denormalized for display without a join
    pub course_name: String,
    /// Course teacher name, denormalized likewise
    pub course_teacher_name: String,
    /// File title (without extension)
    pub title: String,
    /// Description entered by the uploader
    pub description: String,
    /// Lowercase file extension, e.g. "pdf"
    pub file_type: String,
    /// Size in bytes
    pub size_bytes: u64,
    /// When the file was uploaded
    pub uploaded_at: DateTime<Utc>,
    /// Direct download URL (session-authenticated)
    pub download_url: String,
    /// Whether the portal marks this file as not yet seen
    pub is_new: bool,
}

impl CourseFile {
    /// File name to store the download under, e.g. "Lecture 3.pdf"
    pub fn file_name(&self) -> String {
        if self.file_type.is_empty() {
            self.title.clone()
        } else {
            format!("{}.{}", self.title, self.file_type)
        }
    }

    /// Human-readable size (for list display)
    pub fn display_size(&self) -> String {
        const KIB: u64 = 1024;
        const MIB: u64 = 1024 * KIB;
        const GIB: u64 = 1024 * MIB;

        let bytes = self.size_bytes;
        if bytes >= GIB {
            format!("{:.1} GiB", bytes as f64 / GIB as f64)
        } else if bytes >= MIB {
            format!("{:.1} MiB", bytes as f64 / MIB as f64)
        } else if bytes >= KIB {
            format!("{:.1} KiB", bytes as f64 / KIB as f64)
        } else {
            format!("{bytes} B")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CourseFile {
        CourseFile {
            id: "f1".to_string(),
            course_id: "c1".to_string(),
            course_name: "Algorithms".to_string(),
            course_teacher_name: "Prof. Ada".to_string(),
            title: "Lecture 3".to_string(),
            description: String::new(),
            file_type: "pdf".to_string(),
            size_bytes: 2_621_440,
            uploaded_at: Utc::now(),
            download_url: "https://learn.campus.edu/f/dl/f1".to_string(),
            is_new: true,
        }
    }

    #[test]
    fn test_file_name() {
        let mut file = sample();
        assert_eq!(file.file_name(), "Lecture 3.pdf");

        file.file_type = String::new();
        assert_eq!(file.file_name(), "Lecture 3");
    }

    #[test]
    fn test_display_size() {
        let mut file = sample();
        assert_eq!(file.display_size(), "2.5 MiB");

        file.size_bytes = 512;
        assert_eq!(file.display_size(), "512 B");

        file.size_bytes = 3 * 1024;
        assert_eq!(file.display_size(), "3.0 KiB");
    }
}
