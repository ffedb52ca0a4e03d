//! Portal content synchronization
//!
//! Every refresh follows the same arc: dispatch a request action so
//! callers can show progress, fetch with retry (re-logging in mid-flight
//! where the endpoint answers with the login page), normalize the wire
//! records, sort, then dispatch a full replacement list. Reducers never
//! sort or merge content; all of that happens here.

pub mod reauth;

pub use reauth::{ExpiryProbe, with_reauth};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::api::types::{self, RawAssignment, RawCourse, RawFile, RawNotice};
use crate::api::{
    ApiError, ApiResult, ContentKind, FailReason, LoginArgs, Portal, SubmitAttachment,
};
use crate::auth::sso::{InteractiveAuth, SsoPrefill};
use crate::config::Language;
use crate::models::{Assignment, CourseFile, Credential, Notice};
use crate::retry::retry_default;
use crate::store::Store;
use crate::store::state::Action;

/// Drives all portal fetches and feeds their results into the store
pub struct SyncManager<P> {
    portal: P,
    store: Arc<Store>,
    language: Language,
}

impl<P: Portal> SyncManager<P> {
    pub fn new(portal: P, store: Arc<Store>, language: Language) -> Self {
        Self {
            portal,
            store,
            language,
        }
    }

    // ==================== Session ====================

    /// Log in and record the outcome.
    ///
    /// Explicit credentials in `args` are persisted on success; an empty
    /// `args` re-logs in with whatever the credential provider holds. A
    /// login already underway wins, and this call becomes a no-op.
    pub async fn login(&self, args: LoginArgs) -> ApiResult<()> {
        if !self.store.begin_login() {
            debug!("a login is already running, leaving it to finish");
            return Ok(());
        }

        let fresh = credential_from_args(&args);
        match self.portal.login(args).await {
            Ok(()) => {
                info!(explicit_credential = fresh.is_some(), "logged in");
                self.store.dispatch(Action::LoginSuccess(fresh));
                Ok(())
            }
            Err(err) => {
                warn!(reason = %err, "login failed");
                self.store.dispatch(Action::LoginFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Run the identity provider's form on an interactive surface to
    /// capture its generated fingerprints, then log in with them.
    ///
    /// `credential` supplies the username, password and device
    /// fingerprint for the form; a missing fingerprint is generated
    /// fresh. SSO-in-progress is flagged for the duration of the
    /// handshake so nothing else starts a login underneath it.
    pub async fn login_via_sso<A: InteractiveAuth>(
        &self,
        surface: &mut A,
        credential: Credential,
    ) -> ApiResult<()> {
        let fingerprint = if credential.fingerprint.is_empty() {
            Credential::generate_fingerprint()
        } else {
            credential.fingerprint.clone()
        };

        self.store.dispatch(Action::SetSsoInProgress(true));
        let outcome = surface
            .acquire(SsoPrefill {
                username: credential.username.clone(),
                password: credential.password.clone(),
                fingerprint,
            })
            .await;
        self.store.dispatch(Action::SetSsoInProgress(false));
        let fields = outcome?;

        self.login(LoginArgs {
            username: Some(credential.username),
            password: Some(credential.password),
            fingerprint: Some(fields.fingerprint),
            finger_gen_print: Some(fields.finger_gen_print),
            finger_gen_print3: Some(fields.finger_gen_print3),
        })
        .await
    }

    /// End the server-side session (best effort) and wipe local state
    pub async fn logout(&self) {
        if let Err(err) = self.portal.logout().await {
            debug!(reason = %err, "portal logout failed, clearing local state anyway");
        }
        self.store.dispatch(Action::ClearAll);
    }

    // ==================== Refresh ====================

    /// Fetch the semester list, newest first.
    ///
    /// The portal's idea of the current semester is adopted only while
    /// nothing is selected locally; a user's pick always survives.
    pub async fn refresh_semesters(&self) -> ApiResult<()> {
        self.store.dispatch(Action::SemestersRequest);

        let mut items = match retry_default(|| self.portal.semester_id_list()).await {
            Ok(items) => items,
            Err(err) => {
                self.store.dispatch(Action::SemestersFailure(err.clone()));
                return Err(err);
            }
        };
        if items.is_empty() {
            let err = ApiError::new(FailReason::NoSemesters);
            self.store.dispatch(Action::SemestersFailure(err.clone()));
            return Err(err);
        }

        // Lexicographic order matches chronological order for semester IDs
        items.sort_by(|a, b| b.cmp(a));
        let newest = items[0].clone();
        self.store.dispatch(Action::SemestersSuccess(items));

        if self.store.state().semesters.current.is_none() {
            let current = match self.portal.current_semester().await {
                Ok(info) => info.id,
                Err(err) => {
                    debug!(reason = %err, "current semester unavailable, falling back to newest");
                    newest
                }
            };
            self.store.dispatch(Action::SetCurrentSemester(current));
        }
        Ok(())
    }

    /// Fetch the course list for the selected semester
    pub async fn refresh_courses(&self) -> ApiResult<()> {
        let state = self.store.state();
        let Some(semester_id) = state.semesters.current else {
            let err = ApiError::with_extra(FailReason::NoSemesters, "no semester selected");
            self.store.dispatch(Action::CoursesFailure(err.clone()));
            return Err(err);
        };
        let role = state.settings.course_role();

        self.store.dispatch(Action::CoursesRequest);
        match retry_default(|| self.portal.course_list(&semester_id, role, self.language)).await {
            Ok(raw) => {
                let courses = raw.into_iter().map(RawCourse::into_course).collect();
                self.store.dispatch(Action::CoursesSuccess(courses));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::CoursesFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Fetch notices across all courses of the selected semester
    pub async fn refresh_notices(&self) -> ApiResult<()> {
        let course_ids = self.course_ids();
        // No courses means nothing to ask the portal for
        if course_ids.is_empty() {
            return Ok(());
        }
        self.store.dispatch(Action::NoticesRequest);
        match self.fetch_notices(&course_ids).await {
            Ok(mut notices) => {
                sort_notices(&mut notices);
                self.store.dispatch(Action::NoticesSuccess(notices));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::NoticesFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Re-fetch one course's notices, leaving the others untouched
    pub async fn refresh_course_notices(&self, course_id: &str) -> ApiResult<()> {
        self.store.dispatch(Action::NoticesRequest);
        let ids = vec![course_id.to_string()];
        match self.fetch_notices(&ids).await {
            Ok(fresh) => {
                let mut merged: Vec<Notice> = self
                    .store
                    .state()
                    .notices
                    .items
                    .into_iter()
                    .filter(|n| n.course_id != course_id)
                    .collect();
                merged.extend(fresh);
                sort_notices(&mut merged);
                self.store.dispatch(Action::NoticesSuccess(merged));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::NoticesFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Fetch assignments across all courses of the selected semester
    pub async fn refresh_assignments(&self) -> ApiResult<()> {
        let course_ids = self.course_ids();
        if course_ids.is_empty() {
            return Ok(());
        }
        self.store.dispatch(Action::AssignmentsRequest);
        match self.fetch_assignments(&course_ids).await {
            Ok(mut assignments) => {
                sort_assignments(&mut assignments, Utc::now());
                self.store.dispatch(Action::AssignmentsSuccess(assignments));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::AssignmentsFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Re-fetch one course's assignments, leaving the others untouched
    pub async fn refresh_course_assignments(&self, course_id: &str) -> ApiResult<()> {
        self.store.dispatch(Action::AssignmentsRequest);
        let ids = vec![course_id.to_string()];
        match self.fetch_assignments(&ids).await {
            Ok(fresh) => {
                let mut merged: Vec<Assignment> = self
                    .store
                    .state()
                    .assignments
                    .items
                    .into_iter()
                    .filter(|a| a.course_id != course_id)
                    .collect();
                merged.extend(fresh);
                sort_assignments(&mut merged, Utc::now());
                self.store.dispatch(Action::AssignmentsSuccess(merged));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::AssignmentsFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Fetch files across all courses of the selected semester
    pub async fn refresh_files(&self) -> ApiResult<()> {
        let course_ids = self.course_ids();
        if course_ids.is_empty() {
            return Ok(());
        }
        self.store.dispatch(Action::FilesRequest);
        match self.fetch_files(&course_ids).await {
            Ok(mut files) => {
                sort_files(&mut files);
                self.store.dispatch(Action::FilesSuccess(files));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::FilesFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Re-fetch one course's files, leaving the others untouched
    pub async fn refresh_course_files(&self, course_id: &str) -> ApiResult<()> {
        self.store.dispatch(Action::FilesRequest);
        let ids = vec![course_id.to_string()];
        match self.fetch_files(&ids).await {
            Ok(fresh) => {
                let mut merged: Vec<CourseFile> = self
                    .store
                    .state()
                    .files
                    .items
                    .into_iter()
                    .filter(|f| f.course_id != course_id)
                    .collect();
                merged.extend(fresh);
                sort_files(&mut merged);
                self.store.dispatch(Action::FilesSuccess(merged));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::FilesFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Fetch info about the account holder
    pub async fn refresh_user(&self) -> ApiResult<()> {
        let role = self.store.state().settings.course_role();
        self.store.dispatch(Action::UserRequest);
        match retry_default(|| self.portal.user_info(role)).await {
            Ok(raw) => {
                self.store.dispatch(Action::UserSuccess(raw.into_user_info()));
                Ok(())
            }
            Err(err) => {
                self.store.dispatch(Action::UserFailure(err.clone()));
                Err(err)
            }
        }
    }

    /// Refresh everything: semesters, then courses, then all content
    /// types concurrently. Returns the first error, after every fetch
    /// has recorded its own outcome in the store.
    pub async fn refresh_all(&self) -> ApiResult<()> {
        self.refresh_semesters().await?;
        self.refresh_courses().await?;

        let (notices, assignments, files) = tokio::join!(
            self.refresh_notices(),
            self.refresh_assignments(),
            self.refresh_files(),
        );
        notices.and(assignments).and(files)
    }

    // ==================== Files and submissions ====================

    /// Download a session-authenticated URL, re-logging in if it answers
    /// with the login page instead of the payload
    pub async fn download(&self, url: &str) -> ApiResult<Vec<u8>> {
        retry_default(|| {
            with_reauth(&self.portal, |session| async move {
                self.portal.download(&session, url).await
            })
        })
        .await
    }

    /// Hand in an assignment. Not retried: a timed-out submission may
    /// already have landed.
    pub async fn submit_assignment(
        &self,
        student_homework_id: &str,
        content: &str,
        attachment: Option<SubmitAttachment>,
    ) -> ApiResult<()> {
        let body = with_reauth(&self.portal, |session| {
            let attachment = attachment.clone();
            async move {
                self.portal
                    .submit_homework(&session, student_homework_id, content, attachment)
                    .await
            }
        })
        .await?;
        types::check_success(&body)?;
        Ok(())
    }

    // ==================== Fetch plumbing ====================

    fn course_ids(&self) -> Vec<String> {
        self.store
            .state()
            .courses
            .items
            .into_iter()
            .map(|c| c.id)
            .collect()
    }

    /// Bulk-fetch one content type, with retry and one mid-flight
    /// re-login, and reject error envelopes before handing the body on
    async fn fetch_bulk(&self, course_ids: &[String], kind: ContentKind) -> ApiResult<String> {
        let body = retry_default(|| {
            with_reauth(&self.portal, |session| async move {
                self.portal.course_contents(&session, course_ids, kind).await
            })
        })
        .await?;
        types::check_success(&body)?;
        Ok(body)
    }

    async fn fetch_notices(&self, course_ids: &[String]) -> ApiResult<Vec<Notice>> {
        let body = self.fetch_bulk(course_ids, ContentKind::Notice).await?;
        let bulk: HashMap<String, Vec<RawNotice>> = types::parse_bulk(&body)?;
        Ok(self.labeled(bulk, RawNotice::into_notice))
    }

    async fn fetch_assignments(&self, course_ids: &[String]) -> ApiResult<Vec<Assignment>> {
        let body = self.fetch_bulk(course_ids, ContentKind::Assignment).await?;
        let bulk: HashMap<String, Vec<RawAssignment>> = types::parse_bulk(&body)?;
        Ok(self.labeled(bulk, RawAssignment::into_assignment))
    }

    async fn fetch_files(&self, course_ids: &[String]) -> ApiResult<Vec<CourseFile>> {
        let body = self.fetch_bulk(course_ids, ContentKind::File).await?;
        let bulk: HashMap<String, Vec<RawFile>> = types::parse_bulk(&body)?;
        Ok(self.labeled(bulk, RawFile::into_file))
    }

    /// Attach course name and teacher from the names map, which keeps
    /// entries for courses that have since dropped out of the semester
    fn labeled<R, T>(
        &self,
        bulk: HashMap<String, Vec<R>>,
        convert: impl Fn(R, &str, &str, &str) -> T,
    ) -> Vec<T> {
        let names = self.store.state().courses.names;
        let mut out = Vec::new();
        for (course_id, raw_items) in bulk {
            let brief = names.get(&course_id).cloned().unwrap_or_default();
            for raw in raw_items {
                out.push(convert(raw, &course_id, &brief.name, &brief.teacher_name));
            }
        }
        out
    }
}

// ==================== Ordering ====================

/// Newest first; tied timestamps fall back to descending ID so repeated
/// fetches produce the same order
pub fn sort_notices(items: &mut [Notice]) {
    items.sort_by(|a, b| (b.published_at, &b.id).cmp(&(a.published_at, &a.id)));
}

/// Newest first, same tie-breaking as notices
pub fn sort_files(items: &mut [CourseFile]) {
    items.sort_by(|a, b| (b.uploaded_at, &b.id).cmp(&(a.uploaded_at, &a.id)));
}

/// Upcoming deadlines first, soonest on top; then everything already
/// due, most recent deadline first
pub fn sort_assignments(items: &mut [Assignment], now: DateTime<Utc>) {
    items.sort_by(|a, b| (b.deadline, &b.id).cmp(&(a.deadline, &a.id)));
    let upcoming = items.partition_point(|a| a.deadline >= now);
    items[..upcoming].reverse();
}

/// An explicit username and password become the credential to persist;
/// provider-backed re-logins have nothing new to save
fn credential_from_args(args: &LoginArgs) -> Option<Credential> {
    let username = args.username.clone()?;
    let password = args.password.clone()?;
    let mut credential = Credential::new(username, password);
    if let Some(fingerprint) = &args.fingerprint {
        credential.fingerprint = fingerprint.clone();
    }
    if let Some(print) = &args.finger_gen_print {
        credential.finger_gen_print = print.clone();
    }
    if let Some(print) = &args.finger_gen_print3 {
        credential.finger_gen_print3 = print.clone();
    }
    Some(credential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{RawUserInfo, SemesterInfo};
    use crate::api::SessionSnapshot;
    use crate::auth::sso::SsoFields;
    use crate::models::CourseRole;
    use crate::store::state::LoginPhase;
    use chrono::Duration;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPortal {
        semesters: ApiResult<Vec<String>>,
        current: ApiResult<SemesterInfo>,
        courses: Vec<RawCourse>,
        bodies: Mutex<VecDeque<String>>,
        submit_body: String,
        logins: AtomicUsize,
        fail_login: Option<FailReason>,
        requests: Mutex<Vec<(Vec<String>, ContentKind)>>,
    }

    impl Default for StubPortal {
        fn default() -> Self {
            Self {
                semesters: Ok(vec!["2024-2025-1".to_string()]),
                current: Ok(SemesterInfo {
                    id: "2024-2025-1".to_string(),
                }),
                courses: Vec::new(),
                bodies: Mutex::new(VecDeque::new()),
                submit_body: r#"{"success":true}"#.to_string(),
                logins: AtomicUsize::new(0),
                fail_login: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl StubPortal {
        fn push_body(&self, body: impl Into<String>) {
            self.bodies.lock().unwrap().push_back(body.into());
        }
    }

    impl Portal for StubPortal {
        async fn login(&self, _args: LoginArgs) -> ApiResult<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            match self.fail_login {
                Some(reason) => Err(ApiError::new(reason)),
                None => Ok(()),
            }
        }

        async fn logout(&self) -> ApiResult<()> {
            Ok(())
        }

        fn reset(&self) {}

        fn session_snapshot(&self) -> SessionSnapshot {
            SessionSnapshot::default()
        }

        async fn semester_id_list(&self) -> ApiResult<Vec<String>> {
            self.semesters.clone()
        }

        async fn current_semester(&self) -> ApiResult<SemesterInfo> {
            self.current.clone()
        }

        async fn course_list(
            &self,
            _semester_id: &str,
            _role: CourseRole,
            _language: Language,
        ) -> ApiResult<Vec<RawCourse>> {
            Ok(self.courses.clone())
        }

        async fn course_contents(
            &self,
            _session: &SessionSnapshot,
            course_ids: &[String],
            kind: ContentKind,
        ) -> ApiResult<String> {
            self.requests
                .lock()
                .unwrap()
                .push((course_ids.to_vec(), kind));
            Ok(self
                .bodies
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted body left"))
        }

        async fn user_info(&self, _role: CourseRole) -> ApiResult<RawUserInfo> {
            Ok(RawUserInfo {
                name: "Alice".to_string(),
                department: "Mathematics".to_string(),
            })
        }

        async fn download(&self, _session: &SessionSnapshot, _url: &str) -> ApiResult<Vec<u8>> {
            Ok(b"bytes".to_vec())
        }

        async fn submit_homework(
            &self,
            _session: &SessionSnapshot,
            _student_homework_id: &str,
            _content: &str,
            _attachment: Option<SubmitAttachment>,
        ) -> ApiResult<String> {
            Ok(self.submit_body.clone())
        }
    }

    fn manager(portal: StubPortal) -> SyncManager<StubPortal> {
        SyncManager::new(portal, Arc::new(Store::new()), Language::En)
    }

    fn assignment(id: &str, hours_from_now: i64, now: DateTime<Utc>) -> Assignment {
        Assignment {
            id: id.to_string(),
            student_homework_id: format!("shw-{id}"),
            course_id: "c1".to_string(),
            course_name: "Course".to_string(),
            course_teacher_name: "Prof. Ada".to_string(),
            title: format!("Assignment {id}"),
            description: String::new(),
            summary: String::new(),
            deadline: now + Duration::hours(hours_from_now),
            attachment: None,
            submitted: false,
            submitted_at: None,
            submitted_content: None,
            grade: None,
            grade_content: None,
        }
    }

    #[test]
    fn test_sort_assignments_upcoming_first_then_overdue() {
        let now = Utc::now();
        let mut items = vec![
            assignment("a", -1, now),
            assignment("b", 1, now),
            assignment("c", 2, now),
            assignment("d", -48, now),
        ];
        sort_assignments(&mut items, now);

        let order: Vec<&str> = items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, ["b", "c", "a", "d"]);
    }

    #[test]
    fn test_sort_notices_newest_first() {
        let at = |h: i64| Utc::now() + Duration::hours(h);
        let notice = |id: &str, published_at| Notice {
            id: id.to_string(),
            course_id: "c1".to_string(),
            course_name: String::new(),
            course_teacher_name: String::new(),
            title: String::new(),
            publisher: String::new(),
            published_at,
            content: String::new(),
            summary: String::new(),
            has_read: false,
            attachment: None,
        };

        let mut items = vec![notice("n1", at(-3)), notice("n2", at(-1)), notice("n3", at(-2))];
        sort_notices(&mut items);
        let order: Vec<&str> = items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, ["n2", "n3", "n1"]);
    }

    #[tokio::test]
    async fn test_login_records_explicit_credential() {
        let sync = manager(StubPortal::default());
        sync.login(Credential::new("alice", "hunter2").into())
            .await
            .unwrap();

        let state = sync.store.state();
        assert!(state.auth.logged_in());
        assert_eq!(state.auth.credential.username, "alice");
        assert_eq!(sync.portal.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_guard_skips_concurrent_attempt() {
        let sync = manager(StubPortal::default());
        assert!(sync.store.begin_login());

        sync.login(LoginArgs::default()).await.unwrap();
        assert_eq!(sync.portal.logins.load(Ordering::SeqCst), 0);
        assert_eq!(sync.store.state().auth.phase, LoginPhase::LoggingIn);
    }

    #[tokio::test]
    async fn test_login_failure_sets_error_phase() {
        let sync = manager(StubPortal {
            fail_login: Some(FailReason::BadCredential),
            ..StubPortal::default()
        });

        let err = sync.login(LoginArgs::default()).await.unwrap_err();
        assert_eq!(err.reason, FailReason::BadCredential);

        let state = sync.store.state();
        assert_eq!(state.auth.phase, LoginPhase::Error);
        assert_eq!(state.auth.error.unwrap().reason, FailReason::BadCredential);
    }

    struct ScriptedAuth {
        seen: Option<SsoPrefill>,
    }

    impl InteractiveAuth for ScriptedAuth {
        async fn acquire(&mut self, prefill: SsoPrefill) -> ApiResult<SsoFields> {
            let fingerprint = prefill.fingerprint.clone();
            self.seen = Some(prefill);
            Ok(SsoFields {
                fingerprint,
                finger_gen_print: "gen-a".to_string(),
                finger_gen_print3: "gen-b".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_login_via_sso_threads_captured_fields() {
        let sync = manager(StubPortal::default());
        let mut surface = ScriptedAuth { seen: None };

        sync.login_via_sso(&mut surface, Credential::new("alice", "hunter2"))
            .await
            .unwrap();

        let prefill = surface.seen.unwrap();
        assert_eq!(prefill.username, "alice");
        assert!(!prefill.fingerprint.is_empty());

        let state = sync.store.state();
        assert!(state.auth.logged_in());
        assert!(!state.auth.sso_in_progress);
        assert_eq!(state.auth.credential.finger_gen_print, "gen-a");
        assert_eq!(state.auth.credential.finger_gen_print3, "gen-b");
    }

    #[tokio::test]
    async fn test_refresh_semesters_sorts_and_adopts_current() {
        let sync = manager(StubPortal {
            semesters: Ok(vec![
                "2023-2024-1".to_string(),
                "2024-2025-1".to_string(),
                "2023-2024-3".to_string(),
            ]),
            current: Ok(SemesterInfo {
                id: "2023-2024-3".to_string(),
            }),
            ..StubPortal::default()
        });

        sync.refresh_semesters().await.unwrap();
        let state = sync.store.state();
        assert_eq!(
            state.semesters.items,
            vec!["2024-2025-1", "2023-2024-3", "2023-2024-1"]
        );
        assert_eq!(state.semesters.current.as_deref(), Some("2023-2024-3"));
    }

    #[tokio::test]
    async fn test_refresh_semesters_keeps_local_selection() {
        let sync = manager(StubPortal::default());
        sync.store
            .dispatch(Action::SetCurrentSemester("2022-2023-1".to_string()));

        sync.refresh_semesters().await.unwrap();
        assert_eq!(
            sync.store.state().semesters.current.as_deref(),
            Some("2022-2023-1")
        );
    }

    #[tokio::test]
    async fn test_refresh_semesters_empty_fails() {
        let sync = manager(StubPortal {
            semesters: Ok(Vec::new()),
            ..StubPortal::default()
        });

        let err = sync.refresh_semesters().await.unwrap_err();
        assert_eq!(err.reason, FailReason::NoSemesters);

        let state = sync.store.state();
        assert!(!state.semesters.fetching);
        assert_eq!(state.semesters.error.unwrap().reason, FailReason::NoSemesters);
    }

    #[tokio::test]
    async fn test_refresh_courses_requires_semester() {
        let sync = manager(StubPortal::default());
        let err = sync.refresh_courses().await.unwrap_err();
        assert_eq!(err.reason, FailReason::NoSemesters);
        assert!(sync.store.state().courses.error.is_some());
    }

    #[tokio::test]
    async fn test_refresh_notices_labels_from_names_map() {
        let sync = manager(StubPortal::default());
        sync.store.dispatch(Action::CoursesSuccess(vec![crate::models::Course {
            id: "c1".to_string(),
            name: "Algebra".to_string(),
            teacher_name: "Prof. Ada".to_string(),
        }]));
        sync.portal.push_body(
            r#"{"result":{"c1":[
                {"id":"n1","title":"Midterm room","publisher":"Prof. Ada",
                 "publishTime":"2024-05-02T08:00:00Z","content":"<p>Room 204</p>"}
            ]}}"#,
        );

        sync.refresh_notices().await.unwrap();

        let state = sync.store.state();
        assert_eq!(state.notices.items.len(), 1);
        let notice = &state.notices.items[0];
        assert_eq!(notice.course_name, "Algebra");
        assert_eq!(notice.course_teacher_name, "Prof. Ada");
        assert_eq!(notice.summary, "Room 204");

        let requests = sync.portal.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, vec!["c1"]);
        assert_eq!(requests[0].1, ContentKind::Notice);
    }

    #[tokio::test]
    async fn test_refresh_with_no_courses_skips_the_portal() {
        let sync = manager(StubPortal::default());

        sync.refresh_notices().await.unwrap();
        sync.refresh_assignments().await.unwrap();
        sync.refresh_files().await.unwrap();

        assert!(sync.portal.requests.lock().unwrap().is_empty());
        assert!(!sync.store.state().notices.fetching);
    }

    #[tokio::test]
    async fn test_refresh_course_notices_merges_other_courses() {
        let sync = manager(StubPortal::default());
        sync.store.dispatch(Action::NoticesSuccess(vec![
            Notice {
                id: "n1".to_string(),
                course_id: "c1".to_string(),
                course_name: String::new(),
                course_teacher_name: String::new(),
                title: String::new(),
                publisher: String::new(),
                published_at: "2024-05-01T08:00:00Z".parse().unwrap(),
                content: String::new(),
                summary: String::new(),
                has_read: false,
                attachment: None,
            },
            Notice {
                id: "n2".to_string(),
                course_id: "c2".to_string(),
                course_name: String::new(),
                course_teacher_name: String::new(),
                title: String::new(),
                publisher: String::new(),
                published_at: "2024-05-03T08:00:00Z".parse().unwrap(),
                content: String::new(),
                summary: String::new(),
                has_read: false,
                attachment: None,
            },
        ]));
        sync.portal.push_body(
            r#"{"result":{"c1":[
                {"id":"n3","title":"Fresh","publishTime":"2024-05-02T08:00:00Z"}
            ]}}"#,
        );

        sync.refresh_course_notices("c1").await.unwrap();

        let ids: Vec<String> = sync
            .store
            .state()
            .notices
            .items
            .iter()
            .map(|n| n.id.clone())
            .collect();
        // n1 was replaced by the fresh fetch, n2 belongs to another course
        assert_eq!(ids, vec!["n2", "n3"]);
    }

    #[tokio::test]
    async fn test_submit_rejects_error_envelope() {
        let sync = manager(StubPortal {
            submit_body: r#"{"success":false,"message":"past the deadline"}"#.to_string(),
            ..StubPortal::default()
        });

        let err = sync
            .submit_assignment("shw-1", "my answer", None)
            .await
            .unwrap_err();
        assert_eq!(err.reason, FailReason::OperationFailed);
        assert_eq!(err.extra.as_deref(), Some("past the deadline"));
    }

    #[tokio::test]
    async fn test_refresh_user() {
        let sync = manager(StubPortal::default());
        sync.refresh_user().await.unwrap();
        let info = sync.store.state().user.info.unwrap();
        assert_eq!(info.name, "Alice");
        assert_eq!(info.department, "Mathematics");
    }
}
