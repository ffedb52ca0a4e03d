//! Portal API client
//!
//! The portal splits across two hosts: an identity provider that checks
//! credentials and issues a login ticket, and the learning site that the
//! ticket "roams" the session into. Everything after login is cookie
//! authenticated, with a CSRF token riding along on each request.

pub mod error;
pub mod portal;
pub mod types;

pub use error::{ApiError, ApiResult, FailReason};
pub use portal::PortalClient;
pub use types::{ContentKind, SemesterInfo};

/// Marker string the learning site embeds in the page it serves when the
/// session has timed out
pub const SESSION_EXPIRED_MARKER: &str = "login timeout";

use std::sync::Arc;

use crate::config::Language;
use crate::models::{CourseRole, Credential};

use types::{RawCourse, RawUserInfo};

/// Supplies stored credentials to the client when a login omits them.
///
/// Wired to the state store in practice, so re-login always sees the
/// freshest credential without the client holding its own copy.
pub type CredentialProvider = Arc<dyn Fn() -> Option<Credential> + Send + Sync>;

/// Explicit credential fields for a login attempt.
///
/// Any field left as `None` falls back to the credential provider. An
/// all-`None` value therefore means "re-login with stored credentials".
#[derive(Debug, Clone, Default)]
pub struct LoginArgs {
    pub username: Option<String>,
    pub password: Option<String>,
    pub fingerprint: Option<String>,
    pub finger_gen_print: Option<String>,
    pub finger_gen_print3: Option<String>,
}

impl From<Credential> for LoginArgs {
    fn from(cred: Credential) -> Self {
        Self {
            username: Some(cred.username),
            password: Some(cred.password),
            fingerprint: Some(cred.fingerprint),
            finger_gen_print: Some(cred.finger_gen_print),
            finger_gen_print3: Some(cred.finger_gen_print3),
        }
    }
}

/// Point-in-time view of the authenticated session.
///
/// Fetch tasks authenticate with an explicit snapshot rather than the live
/// cookie jar, so a re-login mid-flight cannot hand half a request old
/// cookies and the other half new ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Cookie header value for the learning site
    pub cookies: String,
    /// CSRF token adopted after roaming
    pub csrf: String,
}

/// A file handed in alongside an assignment submission
#[derive(Debug, Clone)]
pub struct SubmitAttachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Unified interface to the course portal
#[allow(async_fn_in_trait)]
pub trait Portal {
    /// Log in, falling back to the credential provider for missing fields
    async fn login(&self, args: LoginArgs) -> ApiResult<()>;

    /// Log out and discard the server-side session (best effort)
    async fn logout(&self) -> ApiResult<()>;

    /// Drop all session state, leaving a fresh unauthenticated client
    fn reset(&self);

    /// Capture the current cookies and CSRF token
    fn session_snapshot(&self) -> SessionSnapshot;

    /// List all semester IDs the account has ever been enrolled in
    async fn semester_id_list(&self) -> ApiResult<Vec<String>>;

    /// Fetch the semester the portal considers current
    async fn current_semester(&self) -> ApiResult<SemesterInfo>;

    /// List courses for one semester
    async fn course_list(
        &self,
        semester_id: &str,
        role: CourseRole,
        language: Language,
    ) -> ApiResult<Vec<RawCourse>>;

    /// Bulk-fetch one content type across many courses, returning the raw
    /// body so callers can probe it for session expiry before parsing
    async fn course_contents(
        &self,
        session: &SessionSnapshot,
        course_ids: &[String],
        kind: ContentKind,
    ) -> ApiResult<String>;

    /// Fetch info about the account holder
    async fn user_info(&self, role: CourseRole) -> ApiResult<RawUserInfo>;

    /// Download a session-authenticated URL (course files, attachments)
    async fn download(&self, session: &SessionSnapshot, url: &str) -> ApiResult<Vec<u8>>;

    /// Submit homework text and an optional file, returning the raw body
    async fn submit_homework(
        &self,
        session: &SessionSnapshot,
        student_homework_id: &str,
        content: &str,
        attachment: Option<SubmitAttachment>,
    ) -> ApiResult<String>;
}
