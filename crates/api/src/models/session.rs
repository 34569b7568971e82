//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use festiv_core::{Phone, Role};

/// Identity stored in the session cookie after a successful login.
///
/// `subject_id` is an account id for [`Role::User`] sessions and an admin id
/// for [`Role::Admin`] sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSession {
    pub subject_id: i32,
    pub phone: Phone,
    pub role: Role,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the logged-in [`super::CurrentSession`].
    pub const CURRENT_SESSION: &str = "current_session";
}
