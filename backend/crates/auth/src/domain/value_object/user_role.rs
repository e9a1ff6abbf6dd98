use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered permission sets per role. Derived, never stored.
const ADMIN_PERMISSIONS: &[&str] = &[
    "products:read",
    "products:write",
    "inventory:read",
    "inventory:write",
    "orders:read",
    "orders:write",
    "payments:read",
    "payments:write",
    "subscriptions:read",
    "subscriptions:write",
    "affiliates:read",
    "affiliates:write",
    "reports:read",
    "users:read",
    "users:write",
];

const MANAGER_PERMISSIONS: &[&str] = &[
    "products:read",
    "products:write",
    "inventory:read",
    "inventory:write",
    "orders:read",
    "orders:write",
    "subscriptions:read",
    "affiliates:read",
    "reports:read",
    "users:read",
];

const CASHIER_PERMISSIONS: &[&str] = &[
    "products:read",
    "inventory:read",
    "orders:read",
    "orders:write",
    "payments:read",
];

const VIEWER_PERMISSIONS: &[&str] = &[
    "products:read",
    "inventory:read",
    "orders:read",
    "reports:read",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(i16)]
pub enum UserRole {
    Admin = 0,
    Manager = 1,
    Cashier = 2,
    #[default]
    Viewer = 3,
}

impl UserRole {
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            Admin => "admin",
            Manager => "manager",
            Cashier => "cashier",
            Viewer => "viewer",
        }
    }

    /// Derived permission set for this role
    #[inline]
    pub const fn permissions(&self) -> &'static [&'static str] {
        use UserRole::*;
        match self {
            Admin => ADMIN_PERMISSIONS,
            Manager => MANAGER_PERMISSIONS,
            Cashier => CASHIER_PERMISSIONS,
            Viewer => VIEWER_PERMISSIONS,
        }
    }

    /// Check whether this role grants a permission
    ///
    /// Admin satisfies every check regardless of the derived set.
    #[inline]
    pub fn grants(&self, permission: &str) -> bool {
        if matches!(self, UserRole::Admin) {
            return true;
        }
        self.permissions().contains(&permission)
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        use UserRole::*;
        match id {
            0 => Some(Admin),
            1 => Some(Manager),
            2 => Some(Cashier),
            3 => Some(Viewer),
            _ => None,
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        use UserRole::*;
        match code {
            "admin" => Some(Admin),
            "manager" => Some(Manager),
            "cashier" => Some(Cashier),
            "viewer" => Some(Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_from_id() {
        assert_eq!(UserRole::from_id(0), Some(UserRole::Admin));
        assert_eq!(UserRole::from_id(1), Some(UserRole::Manager));
        assert_eq!(UserRole::from_id(2), Some(UserRole::Cashier));
        assert_eq!(UserRole::from_id(3), Some(UserRole::Viewer));
        assert_eq!(UserRole::from_id(99), None);
    }

    #[test]
    fn test_user_role_from_code() {
        assert_eq!(UserRole::from_code("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_code("manager"), Some(UserRole::Manager));
        assert_eq!(UserRole::from_code("cashier"), Some(UserRole::Cashier));
        assert_eq!(UserRole::from_code("viewer"), Some(UserRole::Viewer));
        assert_eq!(UserRole::from_code("root"), None);
    }

    #[test]
    fn test_user_role_display() {
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert_eq!(UserRole::Manager.to_string(), "manager");
        assert_eq!(UserRole::Cashier.to_string(), "cashier");
        assert_eq!(UserRole::Viewer.to_string(), "viewer");
    }

    #[test]
    fn test_admin_grants_everything() {
        assert!(UserRole::Admin.grants("payments:write"));
        // Even permissions outside the derived set
        assert!(UserRole::Admin.grants("warehouse:transfer"));
    }

    #[test]
    fn test_non_admin_grants_only_derived() {
        assert!(UserRole::Manager.grants("inventory:write"));
        assert!(!UserRole::Manager.grants("payments:write"));
        assert!(UserRole::Cashier.grants("orders:write"));
        assert!(!UserRole::Cashier.grants("inventory:write"));
        assert!(UserRole::Viewer.grants("reports:read"));
        assert!(!UserRole::Viewer.grants("orders:write"));
    }

    #[test]
    fn test_permission_sets_are_ordered() {
        for role in [
            UserRole::Admin,
            UserRole::Manager,
            UserRole::Cashier,
            UserRole::Viewer,
        ] {
            let perms = role.permissions();
            assert!(!perms.is_empty());
            let mut deduped: Vec<&str> = perms.to_vec();
            deduped.dedup();
            assert_eq!(deduped.len(), perms.len());
        }
    }
}
