//! Transparent re-authentication for snapshot-based fetches
//!
//! The portal answers an expired session with an HTML login page and HTTP
//! 200 rather than an error status, so fetch tasks probe the payload
//! itself. On expiry the wrapper logs in again and reruns the task exactly
//! once with a fresh snapshot; whatever the second run yields is final.

use std::future::Future;

use tracing::debug;

use crate::api::{ApiResult, LoginArgs, Portal, SESSION_EXPIRED_MARKER, SessionSnapshot};

/// How much of a binary payload to inspect for the expiry marker
const PROBE_WINDOW: usize = 4096;

/// Payloads that can tell an expired-session response apart from real data
pub trait ExpiryProbe {
    fn session_expired(&self) -> bool;
}

impl ExpiryProbe for String {
    /// JSON endpoints never open with a tag, so any markup means the portal
    /// served its login page instead
    fn session_expired(&self) -> bool {
        self.contains(SESSION_EXPIRED_MARKER) || self.trim_start().starts_with('<')
    }
}

impl ExpiryProbe for Vec<u8> {
    /// Downloads may legitimately be HTML, so only the marker counts here
    fn session_expired(&self) -> bool {
        let head = &self[..self.len().min(PROBE_WINDOW)];
        String::from_utf8_lossy(head).contains(SESSION_EXPIRED_MARKER)
    }
}

/// Run `task` against the current session, re-authenticating at most once.
///
/// The task receives an owned snapshot each run. Task errors propagate
/// untouched; only a payload that probes as expired triggers the re-login,
/// and the rerun's result is returned as-is, expired or not.
pub async fn with_reauth<P, T, F, Fut>(portal: &P, task: F) -> ApiResult<T>
where
    P: Portal,
    T: ExpiryProbe,
    F: Fn(SessionSnapshot) -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let payload = task(portal.session_snapshot()).await?;
    if !payload.session_expired() {
        return Ok(payload);
    }

    debug!("session expired mid-fetch, logging in again");
    portal.login(LoginArgs::default()).await?;
    task(portal.session_snapshot()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{RawCourse, RawUserInfo, SemesterInfo};
    use crate::api::{ApiError, ContentKind, FailReason, SubmitAttachment};
    use crate::config::Language;
    use crate::models::CourseRole;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakePortal {
        logins: AtomicUsize,
        generation: AtomicUsize,
        fail_login: bool,
    }

    impl Portal for FakePortal {
        async fn login(&self, _args: LoginArgs) -> ApiResult<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if self.fail_login {
                return Err(ApiError::new(FailReason::BadCredential));
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn logout(&self) -> ApiResult<()> {
            Ok(())
        }

        fn reset(&self) {}

        fn session_snapshot(&self) -> SessionSnapshot {
            SessionSnapshot {
                cookies: format!("JSESSIONID=gen-{}", self.generation.load(Ordering::SeqCst)),
                csrf: "token".to_string(),
            }
        }

        async fn semester_id_list(&self) -> ApiResult<Vec<String>> {
            unreachable!()
        }

        async fn current_semester(&self) -> ApiResult<SemesterInfo> {
            unreachable!()
        }

        async fn course_list(
            &self,
            _semester_id: &str,
            _role: CourseRole,
            _language: Language,
        ) -> ApiResult<Vec<RawCourse>> {
            unreachable!()
        }

        async fn course_contents(
            &self,
            _session: &SessionSnapshot,
            _course_ids: &[String],
            _kind: ContentKind,
        ) -> ApiResult<String> {
            unreachable!()
        }

        async fn user_info(&self, _role: CourseRole) -> ApiResult<RawUserInfo> {
            unreachable!()
        }

        async fn download(&self, _session: &SessionSnapshot, _url: &str) -> ApiResult<Vec<u8>> {
            unreachable!()
        }

        async fn submit_homework(
            &self,
            _session: &SessionSnapshot,
            _student_homework_id: &str,
            _content: &str,
            _attachment: Option<SubmitAttachment>,
        ) -> ApiResult<String> {
            unreachable!()
        }
    }

    #[test]
    fn test_string_probe() {
        assert!(format!("<html>{SESSION_EXPIRED_MARKER}</html>").session_expired());
        assert!("  <!DOCTYPE html>".to_string().session_expired());
        assert!(!r#"{"result":[]}"#.to_string().session_expired());
    }

    #[test]
    fn test_byte_probe_only_matches_marker() {
        let expired = format!("<html>{SESSION_EXPIRED_MARKER}</html>").into_bytes();
        assert!(expired.session_expired());
        // An HTML file handed out by a course is real data
        assert!(!b"<html>lecture notes</html>".to_vec().session_expired());
        assert!(!vec![0x89u8, 0x50, 0x4e, 0x47].session_expired());
    }

    #[tokio::test]
    async fn test_fresh_payload_passes_through() {
        let portal = FakePortal::default();
        let result = with_reauth(&portal, |_snapshot| async move {
            Ok(r#"{"result":[]}"#.to_string())
        })
        .await
        .unwrap();

        assert_eq!(result, r#"{"result":[]}"#);
        assert_eq!(portal.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_payload_triggers_one_relogin() {
        let portal = FakePortal::default();
        let runs = AtomicUsize::new(0);
        let seen = Mutex::new(Vec::new());

        let result = with_reauth(&portal, |snapshot| {
            let run = runs.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().push(snapshot.cookies);
            async move {
                if run == 0 {
                    Ok(format!("<html>{SESSION_EXPIRED_MARKER}</html>"))
                } else {
                    Ok(r#"{"result":[]}"#.to_string())
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, r#"{"result":[]}"#);
        assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
        // The rerun saw the post-login snapshot, not the stale one
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["JSESSIONID=gen-0", "JSESSIONID=gen-1"]);
    }

    #[tokio::test]
    async fn test_second_expiry_is_returned_as_is() {
        let portal = FakePortal::default();
        let runs = AtomicUsize::new(0);

        let result = with_reauth(&portal, |_snapshot| {
            runs.fetch_add(1, Ordering::SeqCst);
            async move { Ok(format!("<html>{SESSION_EXPIRED_MARKER}</html>")) }
        })
        .await
        .unwrap();

        assert!(result.session_expired());
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relogin_failure_propagates() {
        let portal = FakePortal {
            fail_login: true,
            ..FakePortal::default()
        };

        let err = with_reauth(&portal, |_snapshot| async move {
            Ok(format!("<html>{SESSION_EXPIRED_MARKER}</html>"))
        })
        .await
        .unwrap_err();

        assert_eq!(err.reason, FailReason::BadCredential);
        assert_eq!(portal.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_task_error_propagates_without_relogin() {
        let portal = FakePortal::default();
        let err = with_reauth(&portal, |_snapshot| async move {
            Err::<String, _>(ApiError::new(FailReason::OperationFailed))
        })
        .await
        .unwrap_err();

        assert_eq!(err.reason, FailReason::OperationFailed);
        assert_eq!(portal.logins.load(Ordering::SeqCst), 0);
    }
}
