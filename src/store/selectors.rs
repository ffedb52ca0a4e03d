//! Derived views over the state, memoized per slice version
//!
//! Views are recomputed only when a slice they read actually changed;
//! otherwise the previously built `Arc` comes back, so callers polling
//! between syncs keep hitting the same allocation. Archiving and course
//! hiding are resolved here, never in the stored lists.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Assignment, Course, CourseFile, Notice};

use super::state::AppState;

/// Derived notice lists
#[derive(Debug, Default)]
pub struct NoticeViews {
    /// Not archived, course not hidden
    pub all: Vec<Notice>,
    /// `all` the portal has not marked read
    pub unread: Vec<Notice>,
    /// `all` starred by the user
    pub fav: Vec<Notice>,
    /// Archived items, including those of hidden courses
    pub archived: Vec<Notice>,
    /// Items whose course is hidden
    pub hidden: Vec<Notice>,
}

/// Derived assignment lists
#[derive(Debug, Default)]
pub struct AssignmentViews {
    pub all: Vec<Assignment>,
    /// `all` not yet handed in; overdue items stay visible here
    pub unfinished: Vec<Assignment>,
    /// `all` already handed in
    pub finished: Vec<Assignment>,
    pub fav: Vec<Assignment>,
    pub archived: Vec<Assignment>,
    pub hidden: Vec<Assignment>,
}

/// Derived file lists
#[derive(Debug, Default)]
pub struct FileViews {
    pub all: Vec<CourseFile>,
    /// `all` the portal still marks as new
    pub unread: Vec<CourseFile>,
    pub fav: Vec<CourseFile>,
    pub archived: Vec<CourseFile>,
    pub hidden: Vec<CourseFile>,
}

/// A course plus its attention badges
#[derive(Debug, Clone)]
pub struct CourseWithCounts {
    pub course: Course,
    pub unread_notices: usize,
    /// Unsubmitted assignments whose deadline has not passed; overdue
    /// ones drop off the badge even though they stay in the lists
    pub unfinished_assignments: usize,
    pub unread_files: usize,
}

/// Derived course lists
#[derive(Debug, Default)]
pub struct CourseViews {
    /// Courses not hidden, in the user-curated display order
    pub visible: Vec<CourseWithCounts>,
    /// Hidden courses, in fetch order
    pub hidden: Vec<CourseWithCounts>,
}

type CoursesKey = (u64, u64, u64, u64);

/// Memoizing selector cache; create once and reuse across reads
#[derive(Default)]
pub struct Selectors {
    notices: Option<((u64, u64), Arc<NoticeViews>)>,
    assignments: Option<((u64, u64), Arc<AssignmentViews>)>,
    files: Option<((u64, u64), Arc<FileViews>)>,
    courses: Option<(CoursesKey, Arc<CourseViews>)>,
}

impl Selectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notice views for the given state
    pub fn notices(&mut self, state: &AppState) -> Arc<NoticeViews> {
        let key = (state.notices.version, state.courses.version);
        if let Some((cached_key, cached)) = &self.notices
            && *cached_key == key
        {
            return Arc::clone(cached);
        }
        let views = Arc::new(compute_notice_views(state));
        self.notices = Some((key, Arc::clone(&views)));
        views
    }

    /// Assignment views for the given state
    pub fn assignments(&mut self, state: &AppState) -> Arc<AssignmentViews> {
        let key = (state.assignments.version, state.courses.version);
        if let Some((cached_key, cached)) = &self.assignments
            && *cached_key == key
        {
            return Arc::clone(cached);
        }
        let views = Arc::new(compute_assignment_views(state));
        self.assignments = Some((key, Arc::clone(&views)));
        views
    }

    /// File views for the given state
    pub fn files(&mut self, state: &AppState) -> Arc<FileViews> {
        let key = (state.files.version, state.courses.version);
        if let Some((cached_key, cached)) = &self.files
            && *cached_key == key
        {
            return Arc::clone(cached);
        }
        let views = Arc::new(compute_file_views(state));
        self.files = Some((key, Arc::clone(&views)));
        views
    }

    /// Course views with badges for the given state
    pub fn courses(&mut self, state: &AppState) -> Arc<CourseViews> {
        let key = (
            state.courses.version,
            state.notices.version,
            state.assignments.version,
            state.files.version,
        );
        if let Some((cached_key, cached)) = &self.courses
            && *cached_key == key
        {
            return Arc::clone(cached);
        }
        let views = Arc::new(compute_course_views(state));
        self.courses = Some((key, Arc::clone(&views)));
        views
    }
}

fn compute_notice_views(state: &AppState) -> NoticeViews {
    let items = &state.notices.items;
    let favorites = &state.notices.favorites;
    let archived = &state.notices.archived;
    let hidden_courses = &state.courses.hidden;

    let all: Vec<Notice> = items
        .iter()
        .filter(|n| !archived.contains(&n.id) && !hidden_courses.contains(&n.course_id))
        .cloned()
        .collect();

    NoticeViews {
        unread: all.iter().filter(|n| !n.has_read).cloned().collect(),
        fav: all
            .iter()
            .filter(|n| favorites.contains(&n.id))
            .cloned()
            .collect(),
        archived: items
            .iter()
            .filter(|n| archived.contains(&n.id))
            .cloned()
            .collect(),
        hidden: items
            .iter()
            .filter(|n| hidden_courses.contains(&n.course_id))
            .cloned()
            .collect(),
        all,
    }
}

fn compute_assignment_views(state: &AppState) -> AssignmentViews {
    let items = &state.assignments.items;
    let favorites = &state.assignments.favorites;
    let archived = &state.assignments.archived;
    let hidden_courses = &state.courses.hidden;

    let all: Vec<Assignment> = items
        .iter()
        .filter(|a| !archived.contains(&a.id) && !hidden_courses.contains(&a.course_id))
        .cloned()
        .collect();

    AssignmentViews {
        unfinished: all.iter().filter(|a| !a.submitted).cloned().collect(),
        finished: all.iter().filter(|a| a.submitted).cloned().collect(),
        fav: all
            .iter()
            .filter(|a| favorites.contains(&a.id))
            .cloned()
            .collect(),
        archived: items
            .iter()
            .filter(|a| archived.contains(&a.id))
            .cloned()
            .collect(),
        hidden: items
            .iter()
            .filter(|a| hidden_courses.contains(&a.course_id))
            .cloned()
            .collect(),
        all,
    }
}

fn compute_file_views(state: &AppState) -> FileViews {
    let items = &state.files.items;
    let favorites = &state.files.favorites;
    let archived = &state.files.archived;
    let hidden_courses = &state.courses.hidden;

    let all: Vec<CourseFile> = items
        .iter()
        .filter(|f| !archived.contains(&f.id) && !hidden_courses.contains(&f.course_id))
        .cloned()
        .collect();

    FileViews {
        unread: all.iter().filter(|f| f.is_new).cloned().collect(),
        fav: all
            .iter()
            .filter(|f| favorites.contains(&f.id))
            .cloned()
            .collect(),
        archived: items
            .iter()
            .filter(|f| archived.contains(&f.id))
            .cloned()
            .collect(),
        hidden: items
            .iter()
            .filter(|f| hidden_courses.contains(&f.course_id))
            .cloned()
            .collect(),
        all,
    }
}

fn compute_course_views(state: &AppState) -> CourseViews {
    let now = Utc::now();
    let order_index: HashMap<&str, usize> = state
        .courses
        .order
        .iter()
        .enumerate()
        .map(|(index, id)| (id.as_str(), index))
        .collect();

    let mut visible = Vec::new();
    let mut hidden = Vec::new();

    for course in &state.courses.items {
        let with_counts = CourseWithCounts {
            unread_notices: state
                .notices
                .items
                .iter()
                .filter(|n| n.course_id == course.id && !n.has_read)
                .count(),
            unfinished_assignments: state
                .assignments
                .items
                .iter()
                .filter(|a| a.course_id == course.id && !a.submitted && a.deadline >= now)
                .count(),
            unread_files: state
                .files
                .items
                .iter()
                .filter(|f| f.course_id == course.id && f.is_new)
                .count(),
            course: course.clone(),
        };

        if state.courses.hidden.contains(&course.id) {
            hidden.push(with_counts);
        } else {
            visible.push(with_counts);
        }
    }

    visible.sort_by_key(|c| {
        order_index
            .get(c.course.id.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    });

    CourseViews { visible, hidden }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::state::{Action, reduce};
    use chrono::{Duration, Utc};

    fn course(id: &str) -> Course {
        Course {
            id: id.to_string(),
            name: format!("Course {id}"),
            teacher_name: "Prof. Ada".to_string(),
        }
    }

    fn notice(id: &str, course_id: &str, has_read: bool) -> Notice {
        Notice {
            id: id.to_string(),
            course_id: course_id.to_string(),
            course_name: format!("Course {course_id}"),
            course_teacher_name: "Prof. Ada".to_string(),
            title: format!("Notice {id}"),
            publisher: "Prof. Ada".to_string(),
            published_at: Utc::now(),
            content: String::new(),
            summary: String::new(),
            has_read,
            attachment: None,
        }
    }

    fn assignment(id: &str, course_id: &str, submitted: bool, hours_from_now: i64) -> Assignment {
        Assignment {
            id: id.to_string(),
            student_homework_id: format!("shw-{id}"),
            course_id: course_id.to_string(),
            course_name: format!("Course {course_id}"),
            course_teacher_name: "Prof. Ada".to_string(),
            title: format!("Assignment {id}"),
            description: String::new(),
            summary: String::new(),
            deadline: Utc::now() + Duration::hours(hours_from_now),
            attachment: None,
            submitted,
            submitted_at: None,
            submitted_content: None,
            grade: None,
            grade_content: None,
        }
    }

    #[test]
    fn test_archived_and_hidden_resolution() {
        let mut state = AppState::default();
        reduce(&mut state, Action::CoursesSuccess(vec![course("c1"), course("c2")]));
        reduce(
            &mut state,
            Action::NoticesSuccess(vec![
                notice("n1", "c1", false),
                notice("n2", "c1", true),
                notice("n3", "c2", false),
            ]),
        );
        reduce(
            &mut state,
            Action::SetArchivedNotices {
                ids: vec!["n2".to_string()],
                archived: true,
            },
        );
        reduce(
            &mut state,
            Action::SetCourseHidden {
                course_id: "c2".to_string(),
                hidden: true,
            },
        );

        let mut selectors = Selectors::new();
        let views = selectors.notices(&state);

        let ids = |list: &[Notice]| list.iter().map(|n| n.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&views.all), vec!["n1"]);
        assert_eq!(ids(&views.unread), vec!["n1"]);
        assert_eq!(ids(&views.archived), vec!["n2"]);
        assert_eq!(ids(&views.hidden), vec!["n3"]);
    }

    #[test]
    fn test_archived_view_ignores_hidden_courses() {
        let mut state = AppState::default();
        reduce(&mut state, Action::NoticesSuccess(vec![notice("n1", "c1", false)]));
        reduce(
            &mut state,
            Action::SetArchivedNotices {
                ids: vec!["n1".to_string()],
                archived: true,
            },
        );
        reduce(
            &mut state,
            Action::SetCourseHidden {
                course_id: "c1".to_string(),
                hidden: true,
            },
        );

        let mut selectors = Selectors::new();
        let views = selectors.notices(&state);
        assert_eq!(views.archived.len(), 1);
        assert!(views.all.is_empty());
    }

    #[test]
    fn test_favorite_survives_refetch_that_drops_the_item() {
        let mut state = AppState::default();
        reduce(&mut state, Action::NoticesSuccess(vec![notice("n1", "c1", false)]));
        reduce(
            &mut state,
            Action::SetFavNotice {
                id: "n1".to_string(),
                fav: true,
            },
        );

        // The portal stopped returning n1; the annotation outlives it
        reduce(&mut state, Action::NoticesSuccess(vec![notice("n2", "c1", false)]));
        assert!(state.notices.favorites.contains("n1"));

        let mut selectors = Selectors::new();
        let views = selectors.notices(&state);
        assert!(views.fav.is_empty());
        let ids: Vec<String> = views.all.iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec!["n2"]);
    }

    #[test]
    fn test_assignment_partition_keeps_overdue_in_unfinished() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            Action::AssignmentsSuccess(vec![
                assignment("a1", "c1", false, -2), // overdue, not handed in
                assignment("a2", "c1", false, 2),
                assignment("a3", "c1", true, -1),
            ]),
        );

        let mut selectors = Selectors::new();
        let views = selectors.assignments(&state);

        let ids = |list: &[Assignment]| list.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&views.unfinished), vec!["a1", "a2"]);
        assert_eq!(ids(&views.finished), vec!["a3"]);
    }

    #[test]
    fn test_course_badges_are_deadline_aware() {
        let mut state = AppState::default();
        reduce(&mut state, Action::CoursesSuccess(vec![course("c1")]));
        reduce(
            &mut state,
            Action::AssignmentsSuccess(vec![
                assignment("a1", "c1", false, -2), // overdue: no badge
                assignment("a2", "c1", false, 2),  // due soon: badge
                assignment("a3", "c1", true, 2),   // submitted: no badge
            ]),
        );
        reduce(&mut state, Action::NoticesSuccess(vec![notice("n1", "c1", false)]));

        let mut selectors = Selectors::new();
        let views = selectors.courses(&state);
        assert_eq!(views.visible.len(), 1);
        assert_eq!(views.visible[0].unfinished_assignments, 1);
        assert_eq!(views.visible[0].unread_notices, 1);
    }

    #[test]
    fn test_visible_courses_follow_display_order() {
        let mut state = AppState::default();
        reduce(
            &mut state,
            Action::CoursesSuccess(vec![course("c1"), course("c2"), course("c3")]),
        );
        reduce(
            &mut state,
            Action::SetCourseOrder(vec![
                "c3".to_string(),
                "c1".to_string(),
                "c2".to_string(),
            ]),
        );
        reduce(
            &mut state,
            Action::SetCourseHidden {
                course_id: "c2".to_string(),
                hidden: true,
            },
        );

        let mut selectors = Selectors::new();
        let views = selectors.courses(&state);
        let visible: Vec<String> = views
            .visible
            .iter()
            .map(|c| c.course.id.clone())
            .collect();
        assert_eq!(visible, vec!["c3", "c1"]);
        assert_eq!(views.hidden.len(), 1);
    }

    #[test]
    fn test_memoization_is_stable_until_a_read_slice_changes() {
        let mut state = AppState::default();
        reduce(&mut state, Action::NoticesSuccess(vec![notice("n1", "c1", false)]));

        let mut selectors = Selectors::new();
        let first = selectors.notices(&state);
        let second = selectors.notices(&state);
        assert!(Arc::ptr_eq(&first, &second));

        // A change in an unrelated slice does not invalidate
        let files_before = selectors.files(&state);
        reduce(
            &mut state,
            Action::SetFavNotice {
                id: "n1".to_string(),
                fav: true,
            },
        );
        let files_after = selectors.files(&state);
        assert!(Arc::ptr_eq(&files_before, &files_after));

        // But the notices view rebuilds
        let third = selectors.notices(&state);
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(third.fav.len(), 1);
    }
}
