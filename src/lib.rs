//! # Satchel 🎒
//!
//! A headless sync client for university course portals.
//!
//! ## Overview
//!
//! Satchel logs into a two-host course portal (an identity provider that
//! issues tickets and a learning site that honors them), keeps the
//! session alive across idle stretches, and syncs notices, assignments
//! and files into a local store you can read offline and script against.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          CLI                                │
//! │   Parses commands, wires the pieces, prints store views     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Config      │ │      Sync       │ │    Lifecycle    │
//! │                 │ │                 │ │                 │
//! │ • Portal hosts  │ │ • Fetch + retry │ │ • Idle tracking │
//! │ • Timeouts      │ │ • Normalize     │ │ • Auto re-login │
//! │ • Language      │ │ • Sort + merge  │ │ • Startup grace │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                   │
//!          └───────────────────┴───────────────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │      Store      │ │       API       │ │      Auth       │
//! │                 │ │                 │ │                 │
//! │ • Slices        │ │ • Ticket login  │ │ • Encrypted     │
//! │ • Reducers      │ │ • CSRF tokens   │ │   credentials   │
//! │ • Selectors     │ │ • Bulk content  │ │ • SSO handshake │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`api`] — Portal client: ticket login, session snapshots, content endpoints
//! - [`auth`] — Encrypted credential store and the interactive SSO handshake
//! - [`config`] — Configuration management
//! - [`db`] — `SQLite` persistence for state slices
//! - [`html`] — Tag stripping for portal HTML payloads
//! - [`lifecycle`] — Foreground/background transitions and automatic re-login
//! - [`models`] — Data models (Course, Notice, Assignment, `CourseFile`)
//! - [`retry`] — Exponential backoff for flaky portal endpoints
//! - [`store`] — Single-writer state store with selective persistence
//! - [`sync`] — Fetch, normalize, sort, dispatch
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use satchel::api::PortalClient;
//! use satchel::config::Config;
//! use satchel::store::Store;
//! use satchel::sync::SyncManager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let store = Arc::new(Store::new());
//!     let portal = PortalClient::new(
//!         &config.portal,
//!         Duration::from_secs(config.request_timeout_secs),
//!         Some(store.credential_provider()),
//!     )?;
//!     let sync = SyncManager::new(portal, Arc::clone(&store), config.language);
//!     sync.refresh_all().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Offline-First** — Everything synced is readable without a network
//! - **Resilient** — Exponential backoff plus transparent mid-fetch re-login
//! - **Secure** — Credentials live in an encrypted file, never in the database
//! - **Fast** — Content types sync concurrently on Tokio
//! - **Scriptable** — Headless by design; pipe the CLI anywhere

#![doc(html_root_url = "https://docs.rs/satchel/0.2.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::similar_names)]
#![allow(clippy::if_same_then_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::branches_sharing_code)]
#![allow(clippy::wrong_self_convention)]
#![allow(clippy::return_self_not_must_use)]

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod html;
pub mod lifecycle;
pub mod models;
pub mod paths;
pub mod retry;
pub mod store;
pub mod sync;

// Re-export main types for convenience
pub use api::{ApiError, FailReason, Portal, PortalClient};
pub use config::Config;
pub use db::Database;
pub use lifecycle::{LifecycleEvent, ReloginController};
pub use models::{Assignment, Course, CourseFile, Credential, Notice, UserInfo};
pub use store::{Action, AppState, Selectors, Store};
pub use sync::SyncManager;

/// ASCII logo for the application
pub const LOGO: &str = r"
   _____       __       __         __
  / ___/____ _/ /______/ /_  ___  / /
  \__ \/ __ `/ __/ ___/ __ \/ _ \/ /
 ___/ / /_/ / /_/ /__/ / / /  __/ /
/____/\__,_/\__/\___/_/ /_/\___/_/
";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Repository URL
pub const REPO_URL: &str = "https://github.com/satchel-app/satchel";
