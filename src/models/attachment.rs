//! Attachment model shared by notices and assignments

use serde::{Deserialize, Serialize};

/// A file attached to a notice or an assignment description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File name as shown on the portal
    pub name: String,
    /// Direct download URL (session-authenticated)
    pub url: String,
    /// Size in bytes, when the portal reports it
    pub size_bytes: Option<u64>,
}
