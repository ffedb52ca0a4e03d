//! Application state: slices, actions and reducers
//!
//! State is cut into slices mirroring the portal's entities. Each slice
//! carries a version counter bumped on every mutation; selectors key
//! their memoization off those counters and the store persists exactly
//! the slices an action touched. Fields marked `serde(skip)` are
//! transient: they reset on every launch instead of being persisted.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::api::{ApiError, ContentKind};
use crate::models::{Assignment, Course, CourseFile, CourseRole, Credential, Notice, UserInfo};

// ==================== Slices ====================

/// Where the login lifecycle currently stands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginPhase {
    #[default]
    Idle,
    LoggingIn,
    LoggedIn,
    Error,
}

/// Authentication slice.
///
/// Never written to the general database; the credential goes to the
/// encrypted store and everything else is transient by design, so a
/// fresh launch always starts logged out.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub credential: Credential,
    pub phase: LoginPhase,
    /// An interactive single sign-on is running; logins wait for it
    pub sso_in_progress: bool,
    pub error: Option<ApiError>,
    pub version: u64,
}

impl AuthState {
    pub fn logged_in(&self) -> bool {
        self.phase == LoginPhase::LoggedIn
    }

    pub fn logging_in(&self) -> bool {
        self.phase == LoginPhase::LoggingIn
    }
}

/// Which derived view a list screen shows by default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabFilter {
    All,
    Unread,
    Fav,
    Archived,
    Hidden,
    Unfinished,
    Finished,
}

/// Per-entity tab filter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabFilterSelection {
    pub notices: TabFilter,
    pub assignments: TabFilter,
    pub files: TabFilter,
}

impl Default for TabFilterSelection {
    fn default() -> Self {
        Self {
            notices: TabFilter::All,
            assignments: TabFilter::Unfinished,
            files: TabFilter::All,
        }
    }
}

/// Which external event map a calendar-sync action targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Calendar,
    Reminder,
}

/// Settings slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsState {
    /// Post-graduate accounts fetch the post-graduate course catalogue
    pub graduate: bool,
    pub tab_filter: TabFilterSelection,
    pub assignment_calendar_sync: bool,
    pub assignment_reminder_sync: bool,
    /// Assignment ID to external calendar event ID
    pub synced_calendar_assignments: HashMap<String, String>,
    /// Assignment ID to external reminder ID
    pub synced_reminder_assignments: HashMap<String, String>,
    /// An update is available; rechecked on every launch
    #[serde(skip)]
    pub new_update: bool,
    #[serde(skip)]
    pub version: u64,
}

impl SettingsState {
    /// Role to fetch course content under
    pub fn course_role(&self) -> CourseRole {
        if self.graduate {
            CourseRole::PostGraduate
        } else {
            CourseRole::Student
        }
    }
}

/// Semesters slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemestersState {
    #[serde(skip)]
    pub fetching: bool,
    /// All semester IDs, newest first
    pub items: Vec<String>,
    /// Semester whose content is being browsed
    pub current: Option<String>,
    #[serde(skip)]
    pub error: Option<ApiError>,
    #[serde(skip)]
    pub version: u64,
}

/// Course name and teacher, kept around for labeling content even after
/// the course drops out of the selected semester
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseBrief {
    pub name: String,
    pub teacher_name: String,
}

/// Courses slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoursesState {
    #[serde(skip)]
    pub fetching: bool,
    pub items: Vec<Course>,
    /// Course ID to identity, grows monotonically
    pub names: HashMap<String, CourseBrief>,
    /// User-curated display order of course IDs
    pub order: Vec<String>,
    /// Courses the user has hidden from the main views
    pub hidden: HashSet<String>,
    #[serde(skip)]
    pub error: Option<ApiError>,
    #[serde(skip)]
    pub version: u64,
}

/// Notices slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoticesState {
    #[serde(skip)]
    pub fetching: bool,
    pub items: Vec<Notice>,
    pub favorites: HashSet<String>,
    pub archived: HashSet<String>,
    #[serde(skip)]
    pub error: Option<ApiError>,
    #[serde(skip)]
    pub version: u64,
}

/// Assignments slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentsState {
    #[serde(skip)]
    pub fetching: bool,
    pub items: Vec<Assignment>,
    pub favorites: HashSet<String>,
    pub archived: HashSet<String>,
    #[serde(skip)]
    pub error: Option<ApiError>,
    #[serde(skip)]
    pub version: u64,
}

/// Files slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesState {
    #[serde(skip)]
    pub fetching: bool,
    pub items: Vec<CourseFile>,
    pub favorites: HashSet<String>,
    pub archived: HashSet<String>,
    #[serde(skip)]
    pub error: Option<ApiError>,
    #[serde(skip)]
    pub version: u64,
}

/// Account holder slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserState {
    #[serde(skip)]
    pub fetching: bool,
    pub info: Option<UserInfo>,
    #[serde(skip)]
    pub error: Option<ApiError>,
    #[serde(skip)]
    pub version: u64,
}

/// The whole application state
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub auth: AuthState,
    pub settings: SettingsState,
    pub semesters: SemestersState,
    pub courses: CoursesState,
    pub notices: NoticesState,
    pub assignments: AssignmentsState,
    pub files: FilesState,
    pub user: UserState,
}

/// Names the slices, for persistence keys and change tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Auth,
    Settings,
    Semesters,
    Courses,
    Notices,
    Assignments,
    Files,
    User,
}

pub const ALL_SLICES: [Slice; 8] = [
    Slice::Auth,
    Slice::Settings,
    Slice::Semesters,
    Slice::Courses,
    Slice::Notices,
    Slice::Assignments,
    Slice::Files,
    Slice::User,
];

impl Slice {
    /// Persistence key for this slice
    pub const fn key(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Settings => "settings",
            Self::Semesters => "semesters",
            Self::Courses => "courses",
            Self::Notices => "notices",
            Self::Assignments => "assignments",
            Self::Files => "files",
            Self::User => "user",
        }
    }
}

// ==================== Actions ====================

/// Every mutation the store accepts
#[derive(Debug, Clone)]
pub enum Action {
    // Auth
    LoginSuccess(Option<Credential>),
    LoginFailure(ApiError),
    SetSsoInProgress(bool),
    /// Clear all in-flight flags and the logging-in phase, e.g. when the
    /// app returns to the foreground with requests stuck from last time
    ResetLoading,
    /// Drop all state and persisted data (logout)
    ClearAll,

    // Semesters
    SemestersRequest,
    SemestersSuccess(Vec<String>),
    SemestersFailure(ApiError),
    SetCurrentSemester(String),

    // Courses
    CoursesRequest,
    CoursesSuccess(Vec<Course>),
    CoursesFailure(ApiError),
    SetCourseOrder(Vec<String>),
    SetCourseHidden { course_id: String, hidden: bool },

    // Notices
    NoticesRequest,
    NoticesSuccess(Vec<Notice>),
    NoticesFailure(ApiError),
    SetFavNotice { id: String, fav: bool },
    SetArchivedNotices { ids: Vec<String>, archived: bool },

    // Assignments
    AssignmentsRequest,
    AssignmentsSuccess(Vec<Assignment>),
    AssignmentsFailure(ApiError),
    SetFavAssignment { id: String, fav: bool },
    SetArchivedAssignments { ids: Vec<String>, archived: bool },

    // Files
    FilesRequest,
    FilesSuccess(Vec<CourseFile>),
    FilesFailure(ApiError),
    SetFavFile { id: String, fav: bool },
    SetArchivedFiles { ids: Vec<String>, archived: bool },

    // User
    UserRequest,
    UserSuccess(UserInfo),
    UserFailure(ApiError),

    // Settings
    SetGraduate(bool),
    SetTabFilter { kind: ContentKind, filter: TabFilter },
    SetAssignmentCalendarSync(bool),
    SetAssignmentReminderSync(bool),
    SetSyncedEvent {
        target: EventTarget,
        assignment_id: String,
        event_id: String,
    },
    RemoveSyncedEvent {
        target: EventTarget,
        assignment_id: String,
    },
    ClearSyncedEvents(EventTarget),
    SetNewUpdate(bool),
}

impl Action {
    /// Short label for logging; payloads stay out of the logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoginSuccess(_) => "login_success",
            Self::LoginFailure(_) => "login_failure",
            Self::SetSsoInProgress(_) => "set_sso_in_progress",
            Self::ResetLoading => "reset_loading",
            Self::ClearAll => "clear_all",
            Self::SemestersRequest => "semesters_request",
            Self::SemestersSuccess(_) => "semesters_success",
            Self::SemestersFailure(_) => "semesters_failure",
            Self::SetCurrentSemester(_) => "set_current_semester",
            Self::CoursesRequest => "courses_request",
            Self::CoursesSuccess(_) => "courses_success",
            Self::CoursesFailure(_) => "courses_failure",
            Self::SetCourseOrder(_) => "set_course_order",
            Self::SetCourseHidden { .. } => "set_course_hidden",
            Self::NoticesRequest => "notices_request",
            Self::NoticesSuccess(_) => "notices_success",
            Self::NoticesFailure(_) => "notices_failure",
            Self::SetFavNotice { .. } => "set_fav_notice",
            Self::SetArchivedNotices { .. } => "set_archived_notices",
            Self::AssignmentsRequest => "assignments_request",
            Self::AssignmentsSuccess(_) => "assignments_success",
            Self::AssignmentsFailure(_) => "assignments_failure",
            Self::SetFavAssignment { .. } => "set_fav_assignment",
            Self::SetArchivedAssignments { .. } => "set_archived_assignments",
            Self::FilesRequest => "files_request",
            Self::FilesSuccess(_) => "files_success",
            Self::FilesFailure(_) => "files_failure",
            Self::SetFavFile { .. } => "set_fav_file",
            Self::SetArchivedFiles { .. } => "set_archived_files",
            Self::UserRequest => "user_request",
            Self::UserSuccess(_) => "user_success",
            Self::UserFailure(_) => "user_failure",
            Self::SetGraduate(_) => "set_graduate",
            Self::SetTabFilter { .. } => "set_tab_filter",
            Self::SetAssignmentCalendarSync(_) => "set_assignment_calendar_sync",
            Self::SetAssignmentReminderSync(_) => "set_assignment_reminder_sync",
            Self::SetSyncedEvent { .. } => "set_synced_event",
            Self::RemoveSyncedEvent { .. } => "remove_synced_event",
            Self::ClearSyncedEvents(_) => "clear_synced_events",
            Self::SetNewUpdate(_) => "set_new_update",
        }
    }
}

// ==================== Reducers ====================

/// Apply an action, bump the touched slices' versions and report them
pub fn reduce(state: &mut AppState, action: Action) -> Vec<Slice> {
    let mut changed = Vec::new();

    match action {
        Action::LoginSuccess(credential) => {
            if let Some(credential) = credential {
                state.auth.credential = credential;
            }
            state.auth.phase = LoginPhase::LoggedIn;
            state.auth.error = None;
            changed.push(Slice::Auth);
        }
        Action::LoginFailure(error) => {
            state.auth.phase = LoginPhase::Error;
            state.auth.error = Some(error);
            changed.push(Slice::Auth);
        }
        Action::SetSsoInProgress(in_progress) => {
            state.auth.sso_in_progress = in_progress;
            changed.push(Slice::Auth);
        }
        Action::ResetLoading => {
            if state.auth.logging_in() {
                state.auth.phase = LoginPhase::Idle;
                changed.push(Slice::Auth);
            }
            if state.semesters.fetching {
                state.semesters.fetching = false;
                changed.push(Slice::Semesters);
            }
            if state.courses.fetching {
                state.courses.fetching = false;
                changed.push(Slice::Courses);
            }
            if state.notices.fetching {
                state.notices.fetching = false;
                changed.push(Slice::Notices);
            }
            if state.assignments.fetching {
                state.assignments.fetching = false;
                changed.push(Slice::Assignments);
            }
            if state.files.fetching {
                state.files.fetching = false;
                changed.push(Slice::Files);
            }
            if state.user.fetching {
                state.user.fetching = false;
                changed.push(Slice::User);
            }
        }
        Action::ClearAll => {
            let old = state.clone();
            *state = AppState::default();
            state.auth.version = old.auth.version + 1;
            state.settings.version = old.settings.version + 1;
            state.semesters.version = old.semesters.version + 1;
            state.courses.version = old.courses.version + 1;
            state.notices.version = old.notices.version + 1;
            state.assignments.version = old.assignments.version + 1;
            state.files.version = old.files.version + 1;
            state.user.version = old.user.version + 1;
            return ALL_SLICES.to_vec();
        }

        Action::SemestersRequest => {
            state.semesters.fetching = true;
            state.semesters.error = None;
            changed.push(Slice::Semesters);
        }
        Action::SemestersSuccess(items) => {
            state.semesters.fetching = false;
            state.semesters.error = None;
            state.semesters.items = items;
            changed.push(Slice::Semesters);
        }
        Action::SemestersFailure(error) => {
            state.semesters.fetching = false;
            state.semesters.error = Some(error);
            changed.push(Slice::Semesters);
        }
        Action::SetCurrentSemester(id) => {
            state.semesters.current = Some(id);
            changed.push(Slice::Semesters);
        }

        Action::CoursesRequest => {
            state.courses.fetching = true;
            state.courses.error = None;
            changed.push(Slice::Courses);
        }
        Action::CoursesSuccess(items) => {
            let incoming: Vec<String> = items.iter().map(|c| c.id.clone()).collect();
            let courses = &mut state.courses;
            courses.fetching = false;
            courses.error = None;
            for course in &items {
                courses.names.insert(
                    course.id.clone(),
                    CourseBrief {
                        name: course.name.clone(),
                        teacher_name: course.teacher_name.clone(),
                    },
                );
            }
            courses.order = merge_order(&courses.order, &incoming);
            courses.items = items;
            changed.push(Slice::Courses);
        }
        Action::CoursesFailure(error) => {
            state.courses.fetching = false;
            state.courses.error = Some(error);
            changed.push(Slice::Courses);
        }
        Action::SetCourseOrder(order) => {
            state.courses.order = order;
            changed.push(Slice::Courses);
        }
        Action::SetCourseHidden { course_id, hidden } => {
            if hidden {
                state.courses.hidden.insert(course_id);
            } else {
                state.courses.hidden.remove(&course_id);
            }
            changed.push(Slice::Courses);
        }

        Action::NoticesRequest => {
            state.notices.fetching = true;
            state.notices.error = None;
            changed.push(Slice::Notices);
        }
        Action::NoticesSuccess(items) => {
            state.notices.fetching = false;
            state.notices.error = None;
            state.notices.items = items;
            changed.push(Slice::Notices);
        }
        Action::NoticesFailure(error) => {
            state.notices.fetching = false;
            state.notices.error = Some(error);
            changed.push(Slice::Notices);
        }
        Action::SetFavNotice { id, fav } => {
            toggle(&mut state.notices.favorites, id, fav);
            changed.push(Slice::Notices);
        }
        Action::SetArchivedNotices { ids, archived } => {
            toggle_many(&mut state.notices.archived, ids, archived);
            changed.push(Slice::Notices);
        }

        Action::AssignmentsRequest => {
            state.assignments.fetching = true;
            state.assignments.error = None;
            changed.push(Slice::Assignments);
        }
        Action::AssignmentsSuccess(items) => {
            state.assignments.fetching = false;
            state.assignments.error = None;
            state.assignments.items = items;
            changed.push(Slice::Assignments);
        }
        Action::AssignmentsFailure(error) => {
            state.assignments.fetching = false;
            state.assignments.error = Some(error);
            changed.push(Slice::Assignments);
        }
        Action::SetFavAssignment { id, fav } => {
            toggle(&mut state.assignments.favorites, id, fav);
            changed.push(Slice::Assignments);
        }
        Action::SetArchivedAssignments { ids, archived } => {
            toggle_many(&mut state.assignments.archived, ids, archived);
            changed.push(Slice::Assignments);
        }

        Action::FilesRequest => {
            state.files.fetching = true;
            state.files.error = None;
            changed.push(Slice::Files);
        }
        Action::FilesSuccess(items) => {
            state.files.fetching = false;
            state.files.error = None;
            state.files.items = items;
            changed.push(Slice::Files);
        }
        Action::FilesFailure(error) => {
            state.files.fetching = false;
            state.files.error = Some(error);
            changed.push(Slice::Files);
        }
        Action::SetFavFile { id, fav } => {
            toggle(&mut state.files.favorites, id, fav);
            changed.push(Slice::Files);
        }
        Action::SetArchivedFiles { ids, archived } => {
            toggle_many(&mut state.files.archived, ids, archived);
            changed.push(Slice::Files);
        }

        Action::UserRequest => {
            state.user.fetching = true;
            state.user.error = None;
            changed.push(Slice::User);
        }
        Action::UserSuccess(info) => {
            state.user.fetching = false;
            state.user.error = None;
            state.user.info = Some(info);
            changed.push(Slice::User);
        }
        Action::UserFailure(error) => {
            state.user.fetching = false;
            state.user.error = Some(error);
            changed.push(Slice::User);
        }

        Action::SetGraduate(graduate) => {
            state.settings.graduate = graduate;
            changed.push(Slice::Settings);
        }
        Action::SetTabFilter { kind, filter } => {
            match kind {
                ContentKind::Notice => state.settings.tab_filter.notices = filter,
                ContentKind::Assignment => state.settings.tab_filter.assignments = filter,
                ContentKind::File => state.settings.tab_filter.files = filter,
            }
            changed.push(Slice::Settings);
        }
        Action::SetAssignmentCalendarSync(enabled) => {
            state.settings.assignment_calendar_sync = enabled;
            changed.push(Slice::Settings);
        }
        Action::SetAssignmentReminderSync(enabled) => {
            state.settings.assignment_reminder_sync = enabled;
            changed.push(Slice::Settings);
        }
        Action::SetSyncedEvent {
            target,
            assignment_id,
            event_id,
        } => {
            event_map(&mut state.settings, target).insert(assignment_id, event_id);
            changed.push(Slice::Settings);
        }
        Action::RemoveSyncedEvent {
            target,
            assignment_id,
        } => {
            event_map(&mut state.settings, target).remove(&assignment_id);
            changed.push(Slice::Settings);
        }
        Action::ClearSyncedEvents(target) => {
            event_map(&mut state.settings, target).clear();
            changed.push(Slice::Settings);
        }
        Action::SetNewUpdate(new_update) => {
            state.settings.new_update = new_update;
            changed.push(Slice::Settings);
        }
    }

    for slice in &changed {
        bump_version(state, *slice);
    }
    changed
}

/// Merge a freshly fetched course ID list into the user-curated order:
/// existing relative order survives, removed courses drop out, new
/// courses append in fetch order.
pub fn merge_order(existing: &[String], incoming: &[String]) -> Vec<String> {
    if existing.is_empty() {
        return incoming.to_vec();
    }

    let incoming_set: HashSet<&str> = incoming.iter().map(String::as_str).collect();
    let mut order: Vec<String> = existing
        .iter()
        .filter(|id| incoming_set.contains(id.as_str()))
        .cloned()
        .collect();

    let present: HashSet<&str> = order.iter().map(String::as_str).collect();
    let fresh: Vec<String> = incoming
        .iter()
        .filter(|id| !present.contains(id.as_str()))
        .cloned()
        .collect();
    order.extend(fresh);
    order
}

fn toggle(set: &mut HashSet<String>, id: String, on: bool) {
    if on {
        set.insert(id);
    } else {
        set.remove(&id);
    }
}

fn toggle_many(set: &mut HashSet<String>, ids: Vec<String>, on: bool) {
    if on {
        set.extend(ids);
    } else {
        for id in &ids {
            set.remove(id);
        }
    }
}

fn event_map(settings: &mut SettingsState, target: EventTarget) -> &mut HashMap<String, String> {
    match target {
        EventTarget::Calendar => &mut settings.synced_calendar_assignments,
        EventTarget::Reminder => &mut settings.synced_reminder_assignments,
    }
}

fn bump_version(state: &mut AppState, slice: Slice) {
    let version = match slice {
        Slice::Auth => &mut state.auth.version,
        Slice::Settings => &mut state.settings.version,
        Slice::Semesters => &mut state.semesters.version,
        Slice::Courses => &mut state.courses.version,
        Slice::Notices => &mut state.notices.version,
        Slice::Assignments => &mut state.assignments.version,
        Slice::Files => &mut state.files.version,
        Slice::User => &mut state.user.version,
    };
    *version += 1;
}
