//! Single-writer state store with selective persistence
//!
//! All mutation funnels through [`Store::dispatch`], serialized by a
//! mutex, so slices never see interleaved writers. Dispatch writes the
//! slices an action touched straight through to their backing storage:
//! the credential goes to the encrypted file, every other slice lands as
//! a JSON row in `SQLite`. Session cookies and in-flight flags are
//! transient on purpose; a fresh launch always starts logged out.

pub mod selectors;
pub mod state;

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub use selectors::Selectors;
pub use state::{Action, AppState, LoginPhase, Slice};

use crate::api::CredentialProvider;
use crate::auth::CredentialStore;
use crate::db::Database;
use crate::models::Credential;

/// The application state store
pub struct Store {
    state: Mutex<AppState>,
    persist: Option<Persist>,
}

struct Persist {
    db: Mutex<Database>,
    credentials: CredentialStore,
}

impl Store {
    /// In-memory store without persistence (tests, throwaway sessions)
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AppState::default()),
            persist: None,
        }
    }

    /// Store that writes through to the given backends
    pub fn with_persistence(db: Database, credentials: CredentialStore) -> Self {
        Self {
            state: Mutex::new(AppState::default()),
            persist: Some(Persist {
                db: Mutex::new(db),
                credentials,
            }),
        }
    }

    /// Load persisted slices into memory. Call once at startup, before
    /// anything reads or dispatches.
    pub fn hydrate(&self) {
        let Some(persist) = &self.persist else { return };
        let mut state = self.state.lock().unwrap();

        if let Some(credential) = persist.credentials.load() {
            state.auth.credential = credential;
            state.auth.version += 1;
        }

        let db = persist.db.lock().unwrap();
        if let Some(settings) = db.load_slice(Slice::Settings.key()) {
            state.settings = state::SettingsState {
                version: state.settings.version + 1,
                ..settings
            };
        }
        if let Some(semesters) = db.load_slice(Slice::Semesters.key()) {
            state.semesters = state::SemestersState {
                version: state.semesters.version + 1,
                ..semesters
            };
        }
        if let Some(courses) = db.load_slice(Slice::Courses.key()) {
            state.courses = state::CoursesState {
                version: state.courses.version + 1,
                ..courses
            };
        }
        if let Some(notices) = db.load_slice(Slice::Notices.key()) {
            state.notices = state::NoticesState {
                version: state.notices.version + 1,
                ..notices
            };
        }
        if let Some(assignments) = db.load_slice(Slice::Assignments.key()) {
            state.assignments = state::AssignmentsState {
                version: state.assignments.version + 1,
                ..assignments
            };
        }
        if let Some(files) = db.load_slice(Slice::Files.key()) {
            state.files = state::FilesState {
                version: state.files.version + 1,
                ..files
            };
        }
        if let Some(user) = db.load_slice(Slice::User.key()) {
            state.user = state::UserState {
                version: state.user.version + 1,
                ..user
            };
        }

        debug!(
            has_credential = state.auth.credential.is_complete(),
            courses = state.courses.items.len(),
            notices = state.notices.items.len(),
            assignments = state.assignments.items.len(),
            files = state.files.items.len(),
            "hydrated state"
        );
    }

    /// Apply an action and persist the slices it changed
    pub fn dispatch(&self, action: Action) {
        debug!(action = action.name(), "dispatch");

        let clear_all = matches!(action, Action::ClearAll);
        // Phase flips churn the auth slice constantly; the credential
        // file is only rewritten when the credential itself can change
        let persist_credential = matches!(action, Action::LoginSuccess(Some(_)));

        let mut state = self.state.lock().unwrap();
        let changed = state::reduce(&mut state, action);

        let Some(persist) = &self.persist else { return };

        if clear_all {
            if let Err(err) = persist.credentials.clear() {
                warn!("failed to clear credential store: {err}");
            }
            match persist.db.lock().unwrap().clear_slices() {
                Ok(count) => debug!(rows = count, "cleared persisted slices"),
                Err(err) => warn!("failed to clear persisted slices: {err}"),
            }
            return;
        }

        let db = persist.db.lock().unwrap();
        for slice in &changed {
            let result = match slice {
                Slice::Auth => {
                    if !persist_credential {
                        continue;
                    }
                    persist.credentials.save(&state.auth.credential)
                }
                Slice::Settings => db.save_slice(slice.key(), &state.settings),
                Slice::Semesters => db.save_slice(slice.key(), &state.semesters),
                Slice::Courses => db.save_slice(slice.key(), &state.courses),
                Slice::Notices => db.save_slice(slice.key(), &state.notices),
                Slice::Assignments => db.save_slice(slice.key(), &state.assignments),
                Slice::Files => db.save_slice(slice.key(), &state.files),
                Slice::User => db.save_slice(slice.key(), &state.user),
            };
            if let Err(err) = result {
                warn!(slice = slice.key(), "failed to persist slice: {err}");
            }
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> AppState {
        self.state.lock().unwrap().clone()
    }

    /// Atomically claim the right to run a login attempt.
    ///
    /// Returns `false` when a login or an interactive sign-on is already
    /// in flight; the caller must then back off. The check and the phase
    /// flip happen under one lock, so two tasks can never both claim it.
    pub fn begin_login(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.auth.logging_in() || state.auth.sso_in_progress {
            return false;
        }
        state.auth.phase = LoginPhase::LoggingIn;
        state.auth.error = None;
        state.auth.version += 1;
        true
    }

    /// Provider feeding stored credentials to the portal client, always
    /// reading the freshest state
    pub fn credential_provider(self: &Arc<Self>) -> CredentialProvider {
        let store = Arc::clone(self);
        Arc::new(move || {
            let credential = store.state().auth.credential;
            (credential != Credential::default()).then_some(credential)
        })
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
