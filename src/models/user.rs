//! User, profile and role models.

use serde::{Deserialize, Serialize};

use super::common::{null_as_default, Id};
use crate::auth::permissions::{self, Capabilities, PermissionOverrides};

/// Newsroom roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read published articles
    Reader,
    /// Draft articles and submit them for review
    Writer,
    /// Review, publish and reject submitted articles
    Manager,
    /// Everything a manager can do, plus user administration
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Writer => "writer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "writer" => Ok(Role::Writer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Profile embedded in a user.
///
/// `role` is kept as the raw server string so unknown roles degrade to no
/// capabilities instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub can_write: Option<bool>,
    #[serde(default)]
    pub can_manage: Option<bool>,
    #[serde(default)]
    pub can_admin: Option<bool>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl Profile {
    pub fn overrides(&self) -> PermissionOverrides {
        PermissionOverrides {
            can_write: self.can_write,
            can_manage: self.can_manage,
            can_admin: self.can_admin,
        }
    }

    pub fn role_enum(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl User {
    /// Capabilities from the server flags, falling back to the role
    pub fn capabilities(&self) -> Capabilities {
        match &self.profile {
            Some(profile) => permissions::resolve(profile.role.as_deref(), &profile.overrides()),
            None => Capabilities::default(),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().and_then(Profile::role_enum)
    }

    /// Full name, or the username when no name parts are set
    pub fn display_name(&self) -> String {
        let full = join_name(&self.first_name, &self.last_name);
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Join first and last name, skipping empty components
pub fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
