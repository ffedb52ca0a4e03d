//! Data models for Satchel

mod assignment;
mod attachment;
mod course;
mod credential;
mod file;
mod notice;
mod user;

pub use assignment::Assignment;
pub use attachment::Attachment;
pub use course::{Course, CourseRole};
pub use credential::Credential;
pub use file::CourseFile;
pub use notice::Notice;
pub use user::UserInfo;
