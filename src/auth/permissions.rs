//! Role to capability resolution.

use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Write,
    Manage,
    Admin,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Write => write!(f, "write"),
            Capability::Manage => write!(f, "manage"),
            Capability::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_write: bool,
    pub can_manage: bool,
    pub can_admin: bool,
}

impl Capabilities {
    /// Capabilities implied by a role alone
    pub fn for_role(role: Role) -> Self {
        Self {
            can_write: matches!(role, Role::Writer | Role::Manager | Role::Admin),
            can_manage: matches!(role, Role::Manager | Role::Admin),
            can_admin: matches!(role, Role::Admin),
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Write => self.can_write,
            Capability::Manage => self.can_manage,
            Capability::Admin => self.can_admin,
        }
    }
}

/// Server-declared flags. A present flag replaces the role-derived value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverrides {
    pub can_write: Option<bool>,
    pub can_manage: Option<bool>,
    pub can_admin: Option<bool>,
}

/// Resolve capabilities for a raw role string.
///
/// Roles compare case-insensitively; an unknown or missing role grants
/// nothing. Each override flag is merged independently.
pub fn resolve(role: Option<&str>, overrides: &PermissionOverrides) -> Capabilities {
    let derived = role
        .and_then(|r| r.parse::<Role>().ok())
        .map(Capabilities::for_role)
        .unwrap_or_default();

    Capabilities {
        can_write: overrides.can_write.unwrap_or(derived.can_write),
        can_manage: overrides.can_manage.unwrap_or(derived.can_manage),
        can_admin: overrides.can_admin.unwrap_or(derived.can_admin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(w: bool, m: bool, a: bool) -> Capabilities {
        Capabilities {
            can_write: w,
            can_manage: m,
            can_admin: a,
        }
    }

    #[test]
    fn test_role_membership_sets() {
        let none = PermissionOverrides::default();
        assert_eq!(resolve(Some("reader"), &none), caps(false, false, false));
        assert_eq!(resolve(Some("writer"), &none), caps(true, false, false));
        assert_eq!(resolve(Some("manager"), &none), caps(true, true, false));
        assert_eq!(resolve(Some("admin"), &none), caps(true, true, true));
    }

    #[test]
    fn test_role_comparison_ignores_case() {
        let none = PermissionOverrides::default();
        assert_eq!(resolve(Some("MANAGER"), &none), caps(true, true, false));
        assert_eq!(resolve(Some("Admin"), &none), caps(true, true, true));
    }

    #[test]
    fn test_unknown_or_missing_role_grants_nothing() {
        let none = PermissionOverrides::default();
        assert_eq!(resolve(Some("editor"), &none), Capabilities::default());
        assert_eq!(resolve(Some(""), &none), Capabilities::default());
        assert_eq!(resolve(None, &none), Capabilities::default());
    }

    #[test]
    fn test_overrides_apply_per_flag() {
        let overrides = PermissionOverrides {
            can_write: Some(true),
            ..Default::default()
        };
        assert_eq!(resolve(Some("reader"), &overrides), caps(true, false, false));

        let overrides = PermissionOverrides {
            can_manage: Some(false),
            ..Default::default()
        };
        assert_eq!(resolve(Some("admin"), &overrides), caps(true, false, true));
    }

    #[test]
    fn test_overrides_apply_without_role() {
        let overrides = PermissionOverrides {
            can_write: Some(true),
            can_manage: Some(true),
            can_admin: Some(false),
        };
        assert_eq!(resolve(None, &overrides), caps(true, true, false));
    }

    #[test]
    fn test_allows() {
        let c = Capabilities::for_role(Role::Manager);
        assert!(c.allows(Capability::Write));
        assert!(c.allows(Capability::Manage));
        assert!(!c.allows(Capability::Admin));
    }
}
