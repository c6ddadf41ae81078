//! User model for FeedFlow.
//!
//! This module defines the User struct, the Role enum, and the per-user
//! preferences (digest language and article retention).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User role for permission management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Ordinary user.
    #[default]
    User = 0,
    /// Administrator (system configuration, user listing).
    Admin = 1,
    /// Super administrator (role management).
    SuperAdmin = 2,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    /// Check if this role has at least the required permission level.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedflow::db::Role;
    ///
    /// assert!(Role::SuperAdmin.can_access(Role::Admin));
    /// assert!(Role::User.can_access(Role::User));
    /// assert!(!Role::User.can_access(Role::Admin));
    /// ```
    pub fn can_access(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// Language used for generated digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLanguage {
    #[default]
    Zh,
    En,
}

impl SummaryLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLanguage::Zh => "zh",
            SummaryLanguage::En => "en",
        }
    }
}

impl fmt::Display for SummaryLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" => Ok(SummaryLanguage::Zh),
            "en" => Ok(SummaryLanguage::En),
            _ => Err(format!("unknown summary language: {s}")),
        }
    }
}

/// Retention value meaning "never delete".
pub const RETENTION_DISABLED: i64 = -1;

/// Default number of days articles are kept.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// User entity representing a registered user.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login email (unique, case-insensitive).
    pub email: String,
    /// Argon2 password hash.
    pub password: String,
    /// Display name.
    pub name: Option<String>,
    /// Permission level.
    pub role: Role,
    /// Preferred digest language.
    pub summary_language: SummaryLanguage,
    /// Days to keep articles, or [`RETENTION_DISABLED`].
    pub item_retention_days: i64,
    /// Retention applies only to articles already read.
    pub item_retention_only_read: bool,
    /// Last time the retention cleanup ran for this user.
    pub last_item_cleanup: Option<DateTime<Utc>>,
    /// Account creation time.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Check if the user has at least the specified role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.can_access(required)
    }

    /// Check if retention cleanup is enabled for this user.
    pub fn retention_enabled(&self) -> bool {
        self.item_retention_days != RETENTION_DISABLED
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    /// Already hashed password.
    pub password: String,
    pub name: Option<String>,
    pub role: Role,
}

impl NewUser {
    /// Create a new user with the default role.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password_hash.into(),
            name: None,
            role: Role::default(),
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}
