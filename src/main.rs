//! Satchel - A terminal client for the university course portal
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context as _, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use satchel::api::{ContentKind, LoginArgs, PortalClient, SubmitAttachment};
use satchel::auth::CredentialStore;
use satchel::auth::sso::{SsoEvent, sso_channel};
use satchel::lifecycle::{LifecycleEvent, ReloginController};
use satchel::models::Credential;
use satchel::store::state::TabFilter;
use satchel::store::{Action, Selectors, Store};
use satchel::sync::SyncManager;
use satchel::{Config, Database};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments
    match parse_args()? {
        Command::Status => status_cli(),
        Command::Login { username } => login_cli(username).await,
        Command::Sso => sso_cli().await,
        Command::Logout => logout_cli().await,
        Command::Refresh { target, course } => refresh_cli(&target, course.as_deref()).await,
        Command::Semesters { set } => semesters_cli(set),
        Command::Courses {
            hidden,
            hide,
            show,
            order,
        } => courses_cli(hidden, hide, show, order),
        Command::Notices { view, save } => notices_cli(view.as_deref(), save),
        Command::Assignments { view, save } => assignments_cli(view.as_deref(), save),
        Command::Files { view, save } => files_cli(view.as_deref(), save),
        Command::Fav { kind, id, remove } => fav_cli(&kind, &id, remove),
        Command::Archive { kind, ids, remove } => archive_cli(&kind, ids, remove),
        Command::Fetch { file_id, out } => fetch_cli(&file_id, out).await,
        Command::Submit {
            assignment_id,
            content,
            file,
        } => submit_cli(&assignment_id, content.as_deref(), file).await,
        Command::Graduate { enabled } => graduate_cli(enabled),
        Command::Watch { interval } => watch_cli(interval).await,
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
    }
}

/// CLI commands
enum Command {
    Status,
    Login {
        username: Option<String>,
    },
    Sso,
    Logout,
    Refresh {
        target: String,
        course: Option<String>,
    },
    Semesters {
        set: Option<String>,
    },
    Courses {
        hidden: bool,
        hide: Option<String>,
        show: Option<String>,
        order: Option<Vec<String>>,
    },
    Notices {
        view: Option<String>,
        save: bool,
    },
    Assignments {
        view: Option<String>,
        save: bool,
    },
    Files {
        view: Option<String>,
        save: bool,
    },
    Fav {
        kind: String,
        id: String,
        remove: bool,
    },
    Archive {
        kind: String,
        ids: Vec<String>,
        remove: bool,
    },
    Fetch {
        file_id: String,
        out: Option<PathBuf>,
    },
    Submit {
        assignment_id: String,
        content: Option<String>,
        file: Option<PathBuf>,
    },
    Graduate {
        enabled: bool,
    },
    Watch {
        interval: Option<u64>,
    },
    Help,
    Version,
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Status);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),
        "status" => Ok(Command::Status),

        "login" => Ok(Command::Login {
            username: args.get(2).filter(|a| !a.starts_with('-')).cloned(),
        }),
        "sso" => Ok(Command::Sso),
        "logout" => Ok(Command::Logout),

        "refresh" => {
            let target = args
                .get(2)
                .filter(|a| !a.starts_with('-'))
                .cloned()
                .unwrap_or_else(|| "all".to_string());
            Ok(Command::Refresh {
                target,
                course: flag_value(&args, "--course"),
            })
        }

        "semesters" => Ok(Command::Semesters {
            set: flag_value(&args, "--set"),
        }),

        "courses" => Ok(Command::Courses {
            hidden: args.iter().any(|a| a == "--hidden"),
            hide: flag_value(&args, "--hide"),
            show: flag_value(&args, "--show"),
            order: flag_value(&args, "--order")
                .map(|ids| ids.split(',').map(String::from).collect()),
        }),

        "notices" => Ok(Command::Notices {
            view: flag_value(&args, "--view"),
            save: args.iter().any(|a| a == "--save"),
        }),
        "assignments" | "hw" => Ok(Command::Assignments {
            view: flag_value(&args, "--view"),
            save: args.iter().any(|a| a == "--save"),
        }),
        "files" => Ok(Command::Files {
            view: flag_value(&args, "--view"),
            save: args.iter().any(|a| a == "--save"),
        }),

        "fav" | "star" => {
            let kind = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing kind (notice, assignment or file)"))?
                .clone();
            let id = args
                .get(3)
                .ok_or_else(|| anyhow::anyhow!("Missing item ID"))?
                .clone();
            Ok(Command::Fav {
                kind,
                id,
                remove: args.iter().any(|a| a == "--remove"),
            })
        }

        "archive" => {
            let kind = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Missing kind (notice, assignment or file)"))?
                .clone();
            let ids = args[3..]
                .iter()
                .filter(|a| !a.starts_with('-'))
                .cloned()
                .collect();
            Ok(Command::Archive {
                kind,
                ids,
                remove: args.iter().any(|a| a == "--remove"),
            })
        }

        "fetch" | "download" | "dl" => {
            let file_id = args
                .get(2)
                .filter(|a| !a.starts_with('-'))
                .cloned()
                .ok_or_else(|| {
                    anyhow::anyhow!("Missing file ID\nRun 'satchel files' to list IDs")
                })?;
            let out = flag_value(&args, "-o")
                .or_else(|| flag_value(&args, "--out"))
                .map(PathBuf::from);
            Ok(Command::Fetch { file_id, out })
        }

        "submit" => {
            let assignment_id = args
                .get(2)
                .filter(|a| !a.starts_with('-'))
                .cloned()
                .ok_or_else(|| {
                    anyhow::anyhow!("Missing assignment ID\nRun 'satchel assignments' to list IDs")
                })?;
            let content = flag_value(&args, "-c").or_else(|| flag_value(&args, "--content"));
            let file = flag_value(&args, "-f")
                .or_else(|| flag_value(&args, "--file"))
                .map(PathBuf::from);
            Ok(Command::Submit {
                assignment_id,
                content,
                file,
            })
        }

        "graduate" => {
            let enabled = match args.get(2).map(String::as_str) {
                Some("on") => true,
                Some("off") => false,
                _ => return Err(anyhow::anyhow!("Expected: satchel graduate <on|off>")),
            };
            Ok(Command::Graduate { enabled })
        }

        "watch" => Ok(Command::Watch {
            interval: flag_value(&args, "--interval")
                .or_else(|| flag_value(&args, "-i"))
                .and_then(|s| s.parse().ok()),
        }),

        other => Err(anyhow::anyhow!(
            "Unknown command: {other}\nRun 'satchel --help' for usage"
        )),
    }
}

/// Value following a `--flag`, if present
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Everything a portal-backed command needs
struct Context {
    config: Config,
    store: Arc<Store>,
    sync: Arc<SyncManager<PortalClient>>,
}

fn build_context() -> Result<Context> {
    let config = Config::load()?;
    let db = Database::open()?;
    let credentials = CredentialStore::open_default()?;

    let store = Arc::new(Store::with_persistence(db, credentials));
    store.hydrate();

    let portal = PortalClient::new(
        &config.portal,
        Duration::from_secs(config.request_timeout_secs),
        Some(store.credential_provider()),
    )?;
    let sync = Arc::new(SyncManager::new(portal, Arc::clone(&store), config.language));

    Ok(Context {
        config,
        store,
        sync,
    })
}

/// Make sure a session exists, re-logging in with stored credentials
async fn ensure_session(ctx: &Context) -> Result<()> {
    let state = ctx.store.state();
    if state.auth.logged_in() {
        return Ok(());
    }
    if !state.auth.credential.is_complete() {
        return Err(anyhow::anyhow!("Not logged in. Run: satchel login"));
    }
    ctx.sync.login(LoginArgs::default()).await?;
    Ok(())
}

async fn login_cli(username: Option<String>) -> Result<()> {
    let ctx = build_context()?;

    let username = match username {
        Some(name) => name,
        None => {
            println!("Enter your student ID:");
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line.trim().to_string()
        }
    };

    println!("Enter your portal password:");
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim().to_string();

    if username.is_empty() || password.is_empty() {
        return Err(anyhow::anyhow!("Username and password are both required"));
    }

    println!("\n🎒 Logging in as {}...", username);
    if let Err(err) = ctx
        .sync
        .login(Credential::new(username, password).into())
        .await
    {
        return Err(anyhow::anyhow!(
            "Login failed: {err}\nAccounts enrolled in the provider's sign-on flow need: satchel sso"
        ));
    }

    // Best effort; the session is already established either way
    let _ = ctx.sync.refresh_user().await;
    match ctx.store.state().user.info {
        Some(user) => println!("\n✓ Logged in as {} ({})", user.name, user.department),
        None => println!("\n✓ Logged in"),
    }
    Ok(())
}

async fn sso_cli() -> Result<()> {
    let ctx = build_context()?;

    let stored = ctx.store.state().auth.credential;
    let credential = if stored.is_complete() {
        println!("Using stored credentials for {}", stored.username);
        stored
    } else {
        println!("Enter your student ID:");
        let mut username = String::new();
        std::io::stdin().read_line(&mut username)?;

        println!("Enter your portal password:");
        let mut password = String::new();
        std::io::stdin().read_line(&mut password)?;

        let username = username.trim();
        let password = password.trim();
        if username.is_empty() || password.is_empty() {
            return Err(anyhow::anyhow!("Username and password are both required"));
        }
        Credential::new(username, password)
    };

    let (mut handshake, mut host) = sso_channel();
    let login_url = format!("{}/login", ctx.config.portal.id_base.trim_end_matches('/'));

    // Drive the host side of the handshake over stdin
    let driver = tokio::spawn(async move {
        let Some(prefill) = host.next_prefill().await else {
            return;
        };

        println!("\n📋 Open the sign-on form in your browser:\n\n  {login_url}\n");
        println!(
            "Log in as {} there, with device fingerprint:\n\n  {}\n",
            prefill.username, prefill.fingerprint
        );
        println!("When the form submits it computes two hidden fields; copy them");
        println!("from the page source.");

        println!("\nPaste the fingerGenPrint value:");
        let mut one = String::new();
        if std::io::stdin().read_line(&mut one).is_err() {
            host.abort(SsoEvent::Cancelled).await;
            return;
        }

        println!("Paste the fingerGenPrint3 value:");
        let mut three = String::new();
        if std::io::stdin().read_line(&mut three).is_err() {
            host.abort(SsoEvent::Cancelled).await;
            return;
        }

        let one = one.trim().to_string();
        let three = three.trim().to_string();
        if one.is_empty() || three.is_empty() {
            host.abort(SsoEvent::Cancelled).await;
        } else {
            host.capture(one, three).await;
        }
    });

    ctx.sync.login_via_sso(&mut handshake, credential).await?;
    driver.await?;

    println!("\n✓ Logged in via single sign-on");
    Ok(())
}

async fn logout_cli() -> Result<()> {
    let ctx = build_context()?;
    ctx.sync.logout().await;
    println!("✓ Logged out; local data cleared");
    Ok(())
}

fn status_cli() -> Result<()> {
    let ctx = build_context()?;
    let state = ctx.store.state();

    println!("{}", satchel::LOGO);

    if !state.auth.credential.is_complete() {
        println!("Not logged in. Run: satchel login");
        return Ok(());
    }

    match &state.user.info {
        Some(user) => println!("Account:   {} · {}", user.name, user.department),
        None => println!("Account:   {}", state.auth.credential.username),
    }
    match &state.semesters.current {
        Some(id) => println!("Semester:  {id}"),
        None => println!("Semester:  none selected"),
    }

    let mut selectors = Selectors::new();
    let courses = selectors.courses(&state);
    let notices = selectors.notices(&state);
    let assignments = selectors.assignments(&state);
    let files = selectors.files(&state);

    println!();
    println!(
        "  {} courses ({} hidden)",
        courses.visible.len(),
        courses.hidden.len()
    );
    println!("  {} unread notices", notices.unread.len());
    println!("  {} unfinished assignments", assignments.unfinished.len());
    println!("  {} new files", files.unread.len());

    if courses.visible.is_empty() {
        println!("\nNothing synced yet. Run: satchel refresh");
    }
    Ok(())
}

async fn refresh_cli(target: &str, course: Option<&str>) -> Result<()> {
    let ctx = build_context()?;
    ensure_session(&ctx).await?;

    println!("🎒 Refreshing {target}...");
    match (target, course) {
        ("all", None) => ctx.sync.refresh_all().await?,
        ("semesters", None) => ctx.sync.refresh_semesters().await?,
        ("courses", None) => ctx.sync.refresh_courses().await?,
        ("user", None) => ctx.sync.refresh_user().await?,
        ("notices", None) => ctx.sync.refresh_notices().await?,
        ("notices", Some(id)) => ctx.sync.refresh_course_notices(id).await?,
        ("assignments", None) => ctx.sync.refresh_assignments().await?,
        ("assignments", Some(id)) => ctx.sync.refresh_course_assignments(id).await?,
        ("files", None) => ctx.sync.refresh_files().await?,
        ("files", Some(id)) => ctx.sync.refresh_course_files(id).await?,
        (other, Some(_)) => {
            return Err(anyhow::anyhow!(
                "--course only applies to notices, assignments and files (got: {other})"
            ));
        }
        (other, None) => {
            return Err(anyhow::anyhow!(
                "Unknown refresh target: {other}\nTargets: all, semesters, courses, notices, assignments, files, user"
            ));
        }
    }

    let state = ctx.store.state();
    let mut selectors = Selectors::new();
    let notices = selectors.notices(&state);
    let assignments = selectors.assignments(&state);
    let files = selectors.files(&state);
    println!(
        "✓ {} unread notices · {} unfinished assignments · {} new files",
        notices.unread.len(),
        assignments.unfinished.len(),
        files.unread.len()
    );
    Ok(())
}

fn semesters_cli(set: Option<String>) -> Result<()> {
    let ctx = build_context()?;
    let state = ctx.store.state();

    if let Some(id) = set {
        if !state.semesters.items.contains(&id) {
            return Err(anyhow::anyhow!(
                "Unknown semester: {id}\nRun 'satchel semesters' to list them"
            ));
        }
        ctx.store.dispatch(Action::SetCurrentSemester(id.clone()));
        println!("✓ Semester set to {id}");
        println!("Run 'satchel refresh' to load its courses");
        return Ok(());
    }

    if state.semesters.items.is_empty() {
        println!("No semesters. Run: satchel refresh");
        return Ok(());
    }

    for id in &state.semesters.items {
        let marker = if state.semesters.current.as_deref() == Some(id.as_str()) {
            "●"
        } else {
            " "
        };
        println!("  {marker} {id}");
    }
    Ok(())
}

fn courses_cli(
    hidden: bool,
    hide: Option<String>,
    show: Option<String>,
    order: Option<Vec<String>>,
) -> Result<()> {
    let ctx = build_context()?;

    // Curation flags mutate local state and exit without listing
    if hide.is_some() || show.is_some() || order.is_some() {
        if let Some(id) = hide {
            ctx.store.dispatch(Action::SetCourseHidden {
                course_id: id.clone(),
                hidden: true,
            });
            println!("✓ Course {id} hidden");
        }
        if let Some(id) = show {
            ctx.store.dispatch(Action::SetCourseHidden {
                course_id: id.clone(),
                hidden: false,
            });
            println!("✓ Course {id} visible");
        }
        if let Some(ids) = order {
            ctx.store.dispatch(Action::SetCourseOrder(ids));
            println!("✓ Course order saved");
        }
        return Ok(());
    }

    let state = ctx.store.state();
    let mut selectors = Selectors::new();
    let views = selectors.courses(&state);

    let list = if hidden { &views.hidden } else { &views.visible };
    if list.is_empty() {
        println!("No courses. Run: satchel refresh");
        return Ok(());
    }

    for entry in list {
        println!(
            "\n  [{}] {} ({})",
            entry.course.id, entry.course.name, entry.course.teacher_name
        );
        println!(
            "      {} unread · {} open · {} new files",
            entry.unread_notices, entry.unfinished_assignments, entry.unread_files
        );
    }
    Ok(())
}

/// Map a view name to its tab filter
fn parse_view(name: &str) -> Result<TabFilter> {
    match name {
        "all" => Ok(TabFilter::All),
        "unread" | "new" => Ok(TabFilter::Unread),
        "fav" | "favorites" => Ok(TabFilter::Fav),
        "archived" => Ok(TabFilter::Archived),
        "hidden" => Ok(TabFilter::Hidden),
        "unfinished" | "open" => Ok(TabFilter::Unfinished),
        "finished" | "done" => Ok(TabFilter::Finished),
        other => Err(anyhow::anyhow!(
            "Unknown view: {other}\nViews: all, unread, fav, archived, hidden, unfinished, finished"
        )),
    }
}

fn notices_cli(view: Option<&str>, save: bool) -> Result<()> {
    let ctx = build_context()?;
    let state = ctx.store.state();

    let filter = match view {
        Some(name) => parse_view(name)?,
        None => state.settings.tab_filter.notices,
    };
    if matches!(filter, TabFilter::Unfinished | TabFilter::Finished) {
        return Err(anyhow::anyhow!("That view only applies to assignments"));
    }
    if save {
        ctx.store.dispatch(Action::SetTabFilter {
            kind: ContentKind::Notice,
            filter,
        });
    }

    let mut selectors = Selectors::new();
    let views = selectors.notices(&state);
    let list = match filter {
        TabFilter::Unread => &views.unread,
        TabFilter::Fav => &views.fav,
        TabFilter::Archived => &views.archived,
        TabFilter::Hidden => &views.hidden,
        _ => &views.all,
    };

    if list.is_empty() {
        println!("Nothing here. Run: satchel refresh");
        return Ok(());
    }

    for notice in list {
        let marker = if notice.has_read { " " } else { "●" };
        let star = if state.notices.favorites.contains(&notice.id) {
            " ★"
        } else {
            ""
        };
        println!("\n{marker} [{}] {}{star}", notice.id, notice.title);
        println!(
            "  {} · {} · {}",
            notice.course_name,
            notice.publisher,
            notice.published_at.format("%Y-%m-%d %H:%M")
        );
        let preview = notice.preview(120);
        if !preview.is_empty() {
            println!("  {preview}");
        }
    }
    Ok(())
}

fn assignments_cli(view: Option<&str>, save: bool) -> Result<()> {
    let ctx = build_context()?;
    let state = ctx.store.state();

    let filter = match view {
        Some(name) => parse_view(name)?,
        None => state.settings.tab_filter.assignments,
    };
    if filter == TabFilter::Unread {
        return Err(anyhow::anyhow!("Assignments have no unread view"));
    }
    if save {
        ctx.store.dispatch(Action::SetTabFilter {
            kind: ContentKind::Assignment,
            filter,
        });
    }

    let mut selectors = Selectors::new();
    let views = selectors.assignments(&state);
    let list = match filter {
        TabFilter::Unfinished => &views.unfinished,
        TabFilter::Finished => &views.finished,
        TabFilter::Fav => &views.fav,
        TabFilter::Archived => &views.archived,
        TabFilter::Hidden => &views.hidden,
        _ => &views.all,
    };

    if list.is_empty() {
        println!("Nothing here. Run: satchel refresh");
        return Ok(());
    }

    let now = Utc::now();
    for assignment in list {
        let status = if assignment.submitted {
            "✓"
        } else if assignment.deadline_passed(now) {
            "✗"
        } else {
            "•"
        };
        let star = if state.assignments.favorites.contains(&assignment.id) {
            " ★"
        } else {
            ""
        };
        println!("\n{status} [{}] {}{star}", assignment.id, assignment.title);
        println!(
            "  {} · due {}",
            assignment.course_name,
            assignment.deadline.format("%Y-%m-%d %H:%M")
        );
        if let Some(grade) = assignment.grade {
            println!("  Grade: {grade}");
        }
    }
    Ok(())
}

fn files_cli(view: Option<&str>, save: bool) -> Result<()> {
    let ctx = build_context()?;
    let state = ctx.store.state();

    let filter = match view {
        Some(name) => parse_view(name)?,
        None => state.settings.tab_filter.files,
    };
    if matches!(filter, TabFilter::Unfinished | TabFilter::Finished) {
        return Err(anyhow::anyhow!("That view only applies to assignments"));
    }
    if save {
        ctx.store.dispatch(Action::SetTabFilter {
            kind: ContentKind::File,
            filter,
        });
    }

    let mut selectors = Selectors::new();
    let views = selectors.files(&state);
    let list = match filter {
        TabFilter::Unread => &views.unread,
        TabFilter::Fav => &views.fav,
        TabFilter::Archived => &views.archived,
        TabFilter::Hidden => &views.hidden,
        _ => &views.all,
    };

    if list.is_empty() {
        println!("Nothing here. Run: satchel refresh");
        return Ok(());
    }

    for file in list {
        let marker = if file.is_new { "●" } else { " " };
        let star = if state.files.favorites.contains(&file.id) {
            " ★"
        } else {
            ""
        };
        println!("\n{marker} [{}] {}{star}", file.id, file.file_name());
        println!(
            "  {} · {} · {}",
            file.course_name,
            file.display_size(),
            file.uploaded_at.format("%Y-%m-%d")
        );
        if !file.description.is_empty() {
            println!("  {}", file.description);
        }
    }
    Ok(())
}

fn fav_cli(kind: &str, id: &str, remove: bool) -> Result<()> {
    let ctx = build_context()?;
    let fav = !remove;
    let action = match kind {
        "notice" => Action::SetFavNotice {
            id: id.to_string(),
            fav,
        },
        "assignment" => Action::SetFavAssignment {
            id: id.to_string(),
            fav,
        },
        "file" => Action::SetFavFile {
            id: id.to_string(),
            fav,
        },
        other => {
            return Err(anyhow::anyhow!(
                "Unknown kind: {other}\nKinds: notice, assignment, file"
            ));
        }
    };
    ctx.store.dispatch(action);
    if fav {
        println!("★ Starred {kind} {id}");
    } else {
        println!("✓ Unstarred {kind} {id}");
    }
    Ok(())
}

fn archive_cli(kind: &str, ids: Vec<String>, remove: bool) -> Result<()> {
    let ctx = build_context()?;
    if ids.is_empty() {
        return Err(anyhow::anyhow!("Missing item IDs"));
    }

    let archived = !remove;
    let count = ids.len();
    let action = match kind {
        "notice" => Action::SetArchivedNotices { ids, archived },
        "assignment" => Action::SetArchivedAssignments { ids, archived },
        "file" => Action::SetArchivedFiles { ids, archived },
        other => {
            return Err(anyhow::anyhow!(
                "Unknown kind: {other}\nKinds: notice, assignment, file"
            ));
        }
    };
    ctx.store.dispatch(action);
    if archived {
        println!("✓ Archived {count} {kind}(s)");
    } else {
        println!("✓ Unarchived {count} {kind}(s)");
    }
    Ok(())
}

async fn fetch_cli(file_id: &str, out: Option<PathBuf>) -> Result<()> {
    let ctx = build_context()?;

    let state = ctx.store.state();
    let file = state
        .files
        .items
        .iter()
        .find(|f| f.id == file_id)
        .ok_or_else(|| anyhow::anyhow!("Unknown file: {file_id}\nRun 'satchel files' to list IDs"))?
        .clone();

    ensure_session(&ctx).await?;

    println!("🎒 Downloading {} ({})...", file.file_name(), file.display_size());
    let bytes = ctx.sync.download(&file.download_url).await?;

    let path = match out {
        Some(path) => path,
        None => satchel::paths::downloads_dir()?.join(file.file_name()),
    };
    std::fs::write(&path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("✓ Saved to {}", path.display());
    Ok(())
}

async fn submit_cli(
    assignment_id: &str,
    content: Option<&str>,
    file: Option<PathBuf>,
) -> Result<()> {
    let ctx = build_context()?;

    let state = ctx.store.state();
    let assignment = state
        .assignments
        .items
        .iter()
        .find(|a| a.id == assignment_id || a.student_homework_id == assignment_id)
        .ok_or_else(|| {
            anyhow::anyhow!("Unknown assignment: {assignment_id}\nRun 'satchel assignments' to list IDs")
        })?
        .clone();

    if content.is_none() && file.is_none() {
        return Err(anyhow::anyhow!(
            "Nothing to submit\nPass text with --content and/or a file with --file"
        ));
    }

    let attachment = match file {
        Some(path) => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path.file_name().map_or_else(
                || "attachment".to_string(),
                |n| n.to_string_lossy().into_owned(),
            );
            Some(SubmitAttachment { file_name, bytes })
        }
        None => None,
    };

    ensure_session(&ctx).await?;

    println!("🎒 Submitting \"{}\"...", assignment.title);
    ctx.sync
        .submit_assignment(
            &assignment.student_homework_id,
            content.unwrap_or(""),
            attachment,
        )
        .await?;

    // Pull the course's assignments again so submission state is fresh
    let _ = ctx
        .sync
        .refresh_course_assignments(&assignment.course_id)
        .await;

    println!("✓ Submitted");
    Ok(())
}

fn graduate_cli(enabled: bool) -> Result<()> {
    let ctx = build_context()?;
    ctx.store.dispatch(Action::SetGraduate(enabled));
    if enabled {
        println!("✓ Post-graduate catalogue enabled");
    } else {
        println!("✓ Student catalogue restored");
    }
    println!("Run 'satchel refresh' to reload courses");
    Ok(())
}

async fn watch_cli(interval: Option<u64>) -> Result<()> {
    let ctx = build_context()?;

    let interval_secs = interval.unwrap_or(ctx.config.refresh_interval_secs);
    if interval_secs == 0 {
        return Err(anyhow::anyhow!(
            "No interval configured\nPass --interval <secs> or set refresh_interval_secs in config"
        ));
    }
    if !ctx.store.state().auth.credential.is_complete() {
        return Err(anyhow::anyhow!("Not logged in. Run: satchel login"));
    }
    let interval = Duration::from_secs(interval_secs);

    let controller = ReloginController::new(Arc::clone(&ctx.sync), Arc::clone(&ctx.store))
        .with_idle_threshold(Duration::from_secs(ctx.config.relogin_threshold_secs));
    controller.run_startup().await;

    println!("🎒 Watching for changes every {interval_secs}s (Ctrl-C to stop)\n");

    let mut selectors = Selectors::new();
    loop {
        controller.handle(LifecycleEvent::Foreground).await;

        match ctx.sync.refresh_all().await {
            Ok(()) => {
                let state = ctx.store.state();
                let notices = selectors.notices(&state);
                let assignments = selectors.assignments(&state);
                let files = selectors.files(&state);
                println!(
                    "[{}] {} unread notices · {} unfinished assignments · {} new files",
                    chrono::Local::now().format("%H:%M:%S"),
                    notices.unread.len(),
                    assignments.unfinished.len(),
                    files.unread.len()
                );
            }
            Err(err) => {
                println!(
                    "[{}] refresh failed: {err}",
                    chrono::Local::now().format("%H:%M:%S")
                );
            }
        }

        controller.handle(LifecycleEvent::Background).await;

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\n✓ Stopped");
                return Ok(());
            }
            () = tokio::time::sleep(interval) => {}
        }
    }
}

fn print_help() {
    let config_path = satchel::Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"{}
🎒 Satchel - A terminal client for the university course portal

USAGE:
    satchel                            Show session and unread summary
    satchel [COMMAND]

COMMANDS:
    login [username]                   Log in with portal credentials
    sso                                Log in through the provider's sign-on form
    logout                             Log out and clear local data

    refresh [target] [OPTIONS]         Fetch fresh content from the portal
      Targets: all (default), semesters, courses, notices, assignments, files, user
      Options:
        --course <id>                  Refresh a single course's content
      Examples:
        satchel refresh
        satchel refresh assignments --course 2024-MATH101

    semesters [--set <id>]             List semesters / choose the current one
    courses [OPTIONS]                  List courses with unread badges
      Options:
        --hidden                       List hidden courses instead
        --hide <id>, --show <id>       Hide or unhide a course
        --order <id,id,...>            Save a display order

    notices [OPTIONS]                  List notices
    assignments [OPTIONS]              List assignments
    files [OPTIONS]                    List course files
      Options:
        --view <name>                  all, unread, fav, archived, hidden,
                                       unfinished, finished (assignments only)
        --save                         Remember the view as this list's default

    fav <kind> <id> [--remove]         Star or unstar an item
    archive <kind> <id>... [--remove]  Archive or unarchive items
      Kinds: notice, assignment, file

    fetch <file-id> [-o <path>]        Download a course file
    submit <assignment-id> [OPTIONS]   Hand in an assignment
      Options:
        -c, --content <text>           Submission text
        -f, --file <path>              File to attach

    graduate <on|off>                  Switch the post-graduate catalogue
    watch [--interval <secs>]          Refresh on a timer and report changes

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}

HOMEPAGE:
    {}
"#,
        satchel::LOGO,
        config_path,
        satchel::REPO_URL
    );
}

fn print_version() {
    println!("satchel {}", satchel::VERSION);
}
