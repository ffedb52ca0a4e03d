//! Foreground/background transitions and automatic re-login
//!
//! The portal kills sessions after a few minutes of silence, so coming
//! back to the foreground after an idle stretch means the next fetch
//! would bounce. The controller stamps the clock when the app leaves the
//! foreground and re-logs in on return when the session is stale or was
//! never established, using the stored credential. At most one login
//! attempt fires per transition; the store's login guard absorbs races.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::{LoginArgs, Portal};
use crate::store::Store;
use crate::store::state::Action;
use crate::sync::SyncManager;

/// Idle time after which the session is assumed dead
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// Pause between process start and the cold-start login attempt
pub const STARTUP_GRACE: Duration = Duration::from_millis(800);

/// App lifecycle transitions, as reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Foreground,
    Background,
    /// Transient not-quite-background state; stamps the idle clock like
    /// a real background transition
    Inactive,
}

/// Watches lifecycle transitions and keeps the session alive
pub struct ReloginController<P> {
    sync: Arc<SyncManager<P>>,
    store: Arc<Store>,
    idle_threshold: Duration,
    startup_grace: Duration,
    last_background: Mutex<Option<Instant>>,
}

impl<P: Portal> ReloginController<P> {
    pub fn new(sync: Arc<SyncManager<P>>, store: Arc<Store>) -> Self {
        Self {
            sync,
            store,
            idle_threshold: IDLE_THRESHOLD,
            startup_grace: STARTUP_GRACE,
            last_background: Mutex::new(None),
        }
    }

    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// React to a lifecycle transition
    pub async fn handle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Background | LifecycleEvent::Inactive => {
                *self.last_background.lock().unwrap() = Some(Instant::now());
            }
            LifecycleEvent::Foreground => {
                // Requests left in-flight by a suspend would otherwise
                // keep their slices stuck in the fetching state
                self.store.dispatch(Action::ResetLoading);
                let idle = self
                    .last_background
                    .lock()
                    .unwrap()
                    .take()
                    .map(|at| at.elapsed());
                self.maybe_relogin(idle).await;
            }
        }
    }

    /// Wait out the startup grace, then make the cold-start attempt
    pub async fn run_startup(&self) {
        tokio::time::sleep(self.startup_grace).await;
        self.maybe_relogin(None).await;
    }

    async fn maybe_relogin(&self, idle: Option<Duration>) {
        let state = self.store.state();
        if !state.auth.credential.is_complete() {
            debug!("no stored credential, skipping automatic re-login");
            return;
        }
        if state.auth.sso_in_progress || state.auth.logging_in() {
            debug!("authentication already underway, skipping automatic re-login");
            return;
        }

        let stale = idle.is_some_and(|d| d >= self.idle_threshold);
        if state.auth.logged_in() && !stale {
            return;
        }

        info!(
            idle_secs = idle.map(|d| d.as_secs()),
            "session stale or missing, re-logging in"
        );
        if let Err(err) = self.sync.login(LoginArgs::default()).await {
            warn!(reason = %err, "automatic re-login failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{RawCourse, RawUserInfo, SemesterInfo};
    use crate::api::{ApiResult, ContentKind, SessionSnapshot, SubmitAttachment};
    use crate::auth::CredentialStore;
    use crate::config::Language;
    use crate::db::Database;
    use crate::models::{CourseRole, Credential};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPortal {
        logins: Arc<AtomicUsize>,
    }

    impl Portal for CountingPortal {
        async fn login(&self, _args: LoginArgs) -> ApiResult<()> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn logout(&self) -> ApiResult<()> {
            Ok(())
        }

        fn reset(&self) {}

        fn session_snapshot(&self) -> SessionSnapshot {
            SessionSnapshot::default()
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

    struct Fixture {
        controller: ReloginController<CountingPortal>,
        logins: Arc<AtomicUsize>,
        store: Arc<Store>,
    }

    /// Store without persistence; credential arrives via a first login
    fn in_memory() -> Fixture {
        let logins = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(Store::new());
        let sync = Arc::new(SyncManager::new(
            CountingPortal {
                logins: Arc::clone(&logins),
            },
            Arc::clone(&store),
            Language::En,
        ));
        Fixture {
            controller: ReloginController::new(sync, Arc::clone(&store)),
            logins,
            store,
        }
    }

    /// Store hydrated from disk: credential present, session not yet
    /// established, like a real cold start
    fn cold_start(dir: &std::path::Path) -> Fixture {
        let credentials = CredentialStore::at(dir.join("credentials.enc"));
        credentials
            .save(&Credential::new("alice", "hunter2"))
            .unwrap();
        let db = Database::open_path(&dir.join("state.sqlite")).unwrap();
        let store = Arc::new(Store::with_persistence(db, credentials));
        store.hydrate();

        let logins = Arc::new(AtomicUsize::new(0));
        let sync = Arc::new(SyncManager::new(
            CountingPortal {
                logins: Arc::clone(&logins),
            },
            Arc::clone(&store),
            Language::En,
        ));
        Fixture {
            controller: ReloginController::new(sync, Arc::clone(&store)),
            logins,
            store,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_waits_grace_then_logs_in() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = cold_start(dir.path());

        let before = Instant::now();
        fixture.controller.run_startup().await;

        assert!(before.elapsed() >= STARTUP_GRACE);
        assert_eq!(fixture.logins.load(Ordering::SeqCst), 1);
        assert!(fixture.store.state().auth.logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_start_without_credential_stays_idle() {
        let fixture = in_memory();
        fixture.controller.run_startup().await;
        assert_eq!(fixture.logins.load(Ordering::SeqCst), 0);
        assert!(!fixture.store.state().auth.logged_in());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_idle_triggers_relogin_on_foreground() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = cold_start(dir.path());
        fixture.controller.run_startup().await;
        assert_eq!(fixture.logins.load(Ordering::SeqCst), 1);

        fixture.controller.handle(LifecycleEvent::Background).await;
        tokio::time::advance(IDLE_THRESHOLD + Duration::from_secs(1)).await;
        fixture.controller.handle(LifecycleEvent::Foreground).await;

        assert_eq!(fixture.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_idle_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = cold_start(dir.path());
        fixture.controller.run_startup().await;

        fixture.controller.handle(LifecycleEvent::Background).await;
        tokio::time::advance(Duration::from_secs(60)).await;

        // A request stuck from before the suspend clears on return
        fixture.store.dispatch(Action::NoticesRequest);
        fixture.controller.handle(LifecycleEvent::Foreground).await;

        assert_eq!(fixture.logins.load(Ordering::SeqCst), 1);
        assert!(!fixture.store.state().notices.fetching);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_foreground_logs_in_once() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = cold_start(dir.path());

        fixture.controller.handle(LifecycleEvent::Foreground).await;
        fixture.controller.handle(LifecycleEvent::Foreground).await;
        fixture.controller.handle(LifecycleEvent::Foreground).await;

        assert_eq!(fixture.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_counts_as_background() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = cold_start(dir.path());
        fixture.controller.run_startup().await;

        fixture.controller.handle(LifecycleEvent::Inactive).await;
        tokio::time::advance(IDLE_THRESHOLD + Duration::from_secs(1)).await;
        fixture.controller.handle(LifecycleEvent::Foreground).await;

        assert_eq!(fixture.logins.load(Ordering::SeqCst), 2);
    }
}
