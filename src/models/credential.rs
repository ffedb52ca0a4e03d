//! Portal credential model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Credentials needed to authenticate against the identity provider.
///
/// Besides username and password, the identity provider expects a stable
/// device fingerprint plus two form-generated fingerprint values captured
/// during the interactive single sign-on handshake. Empty strings mean
/// "not set"; the two generated values may legitimately stay empty.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Portal account name
    pub username: String,
    /// Portal account password
    pub password: String,
    /// Stable per-device fingerprint (generated once, then reused)
    pub fingerprint: String,
    /// Form-generated fingerprint captured during SSO
    pub finger_gen_print: String,
    /// Second form-generated fingerprint captured during SSO
    pub finger_gen_print3: String,
}

impl Credential {
    /// Create a credential with a freshly generated device fingerprint
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            fingerprint: Self::generate_fingerprint(),
            finger_gen_print: String::new(),
            finger_gen_print3: String::new(),
        }
    }

    /// Generate a new random device fingerprint
    pub fn generate_fingerprint() -> String {
        Uuid::new_v4().to_string()
    }

    /// Whether enough is present to attempt a login.
    ///
    /// The generated form fingerprints are optional; username, password
    /// and the device fingerprint are not.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.fingerprint.is_empty()
    }
}

// Credentials end up in debug logs via state dumps, so the password is
// never rendered. Log presence, not values.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("fingerprint", &self.fingerprint)
            .field("finger_gen_print", &!self.finger_gen_print.is_empty())
            .field("finger_gen_print3", &!self.finger_gen_print3.is_empty())
            .finish()
    }
}
