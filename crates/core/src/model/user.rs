use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Country stamped on users created at sign-in.
pub const DEFAULT_COUNTRY: &str = "Argentina";

/// Display name used when the identity provider supplies none.
pub const DEFAULT_USER_NAME: &str = "Usuario";

/// A registered account. Keyed by email; never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub is_premium: bool,
    pub country: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A user together with the 1-based sheet row it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub row: u32,
    pub user: User,
}

/// Fields for a new user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub is_premium: bool,
}

/// Partial profile change; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub is_premium: Option<bool>,
    pub country: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.image.is_none()
            && self.is_premium.is_none()
            && self.country.is_none()
    }
}

/// Email equality as used by every lookup: surrounding whitespace and ASCII case are ignored.
pub fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Canonical form used when writing emails.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
