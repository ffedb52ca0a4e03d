//! Wire types for the portal's JSON endpoints
//!
//! The portal wraps every JSON payload in a `result` envelope. Raw types
//! mirror the wire shape; `into_*` methods turn them into the denormalized
//! domain models, stripping HTML down to plain-text summaries on the way.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::html::strip_tags;
use crate::models::{Assignment, Attachment, Course, CourseFile, Notice, UserInfo};

use super::error::{ApiError, ApiResult, FailReason};

/// Which content type a bulk fetch asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Notice,
    Assignment,
    File,
}

impl ContentKind {
    /// Wire name of the content type
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notice => "notice",
            Self::Assignment => "homework",
            Self::File => "file",
        }
    }
}

/// Parse a `result`-enveloped list body
pub fn parse_list<T: DeserializeOwned>(body: &str) -> ApiResult<Vec<T>> {
    let envelope: ListEnvelope<T> = serde_json::from_str(body)?;
    Ok(envelope.result)
}

/// Parse a `result`-enveloped object body
pub fn parse_object<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    let envelope: ObjectEnvelope<T> = serde_json::from_str(body)?;
    Ok(envelope.result)
}

/// Parse a bulk-fetch body: lists of raw items keyed by course ID
pub fn parse_bulk<T: DeserializeOwned>(body: &str) -> ApiResult<HashMap<String, Vec<T>>> {
    let envelope: BulkEnvelope<T> = serde_json::from_str(body)?;
    Ok(envelope.result)
}

/// Reject error envelopes the portal returns with HTTP 200
pub fn check_success(body: &str) -> ApiResult<()> {
    if let Ok(envelope) = serde_json::from_str::<StatusEnvelope>(body)
        && !envelope.success
    {
        let message = envelope.message.unwrap_or_default();
        return Err(ApiError::with_extra(FailReason::OperationFailed, message));
    }
    Ok(())
}

// ==================== Wire Envelopes ====================

#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ObjectEnvelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct BulkEnvelope<T> {
    result: HashMap<String, Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

// ==================== Wire Types ====================

/// Current-semester record as reported by the portal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterInfo {
    pub id: String,
}

/// Course record as served by the course list endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCourse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub teacher_name: String,
}

impl RawCourse {
    pub fn into_course(self) -> Course {
        Course {
            id: self.id,
            name: self.name,
            teacher_name: self.teacher_name,
        }
    }
}

/// Attachment record nested inside notices and assignments
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAttachment {
    pub name: String,
    pub download_url: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl RawAttachment {
    fn into_attachment(self) -> Attachment {
        Attachment {
            name: self.name,
            url: self.download_url,
            size_bytes: self.size_bytes,
        }
    }
}

/// Notice record as served by the bulk content endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotice {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub publisher: String,
    pub publish_time: DateTime<Utc>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub has_read: bool,
    #[serde(default)]
    pub attachment: Option<RawAttachment>,
}

impl RawNotice {
    /// Denormalize into a [`Notice`], attaching course identity
    pub fn into_notice(self, course_id: &str, course_name: &str, teacher_name: &str) -> Notice {
        let content = self.content.unwrap_or_default();
        let summary = strip_tags(&content);
        Notice {
            id: self.id,
            course_id: course_id.to_string(),
            course_name: course_name.to_string(),
            course_teacher_name: teacher_name.to_string(),
            title: self.title,
            publisher: self.publisher,
            published_at: self.publish_time,
            content,
            summary,
            has_read: self.has_read,
            attachment: self.attachment.map(RawAttachment::into_attachment),
        }
    }
}

/// Assignment record as served by the bulk content endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignment {
    pub id: String,
    #[serde(default)]
    pub student_homework_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub submitted: bool,
    #[serde(default)]
    pub submit_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_content: Option<String>,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub grade_content: Option<String>,
    #[serde(default)]
    pub attachment: Option<RawAttachment>,
}

impl RawAssignment {
    /// Denormalize into an [`Assignment`], attaching course identity
    pub fn into_assignment(
        self,
        course_id: &str,
        course_name: &str,
        teacher_name: &str,
    ) -> Assignment {
        let description = self.description.unwrap_or_default();
        let summary = strip_tags(&description);
        Assignment {
            id: self.id,
            student_homework_id: self.student_homework_id,
            course_id: course_id.to_string(),
            course_name: course_name.to_string(),
            course_teacher_name: teacher_name.to_string(),
            title: self.title,
            description,
            summary,
            deadline: self.deadline,
            attachment: self.attachment.map(RawAttachment::into_attachment),
            submitted: self.submitted,
            submitted_at: self.submit_time,
            submitted_content: self.submitted_content,
            grade: self.grade,
            grade_content: self.grade_content,
        }
    }
}

/// File record as served by the bulk content endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFile {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    pub upload_time: DateTime<Utc>,
    pub download_url: String,
    #[serde(default)]
    pub is_new: bool,
}

impl RawFile {
    /// Denormalize into a [`CourseFile`], attaching course identity
    pub fn into_file(self, course_id: &str, course_name: &str, teacher_name: &str) -> CourseFile {
        CourseFile {
            id: self.id,
            course_id: course_id.to_string(),
            course_name: course_name.to_string(),
            course_teacher_name: teacher_name.to_string(),
            title: self.title,
            description: strip_tags(&self.description.unwrap_or_default()),
            file_type: self.file_type.to_lowercase(),
            size_bytes: self.size_bytes,
            uploaded_at: self.upload_time,
            download_url: self.download_url,
            is_new: self.is_new,
        }
    }
}

/// Account holder record as served by the user info endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUserInfo {
    pub name: String,
    #[serde(default)]
    pub department: String,
}

impl RawUserInfo {
    pub fn into_user_info(self) -> UserInfo {
        UserInfo {
            name: self.name,
            department: self.department,
        }
    }
}
