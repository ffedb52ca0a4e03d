//! Account holder info model

use serde::{Deserialize, Serialize};

/// Basic information about the logged-in account holder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Real name as registered with the university
    pub name: String,
    /// Department or school the account belongs to
    pub department: String,
}
