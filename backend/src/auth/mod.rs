//! Dashboard authentication
//!
//! Users log in through an [`AuthProvider`] and receive an opaque bearer
//! token backed by the [`SessionStore`]. Handlers take an [`AuthUser`] and
//! check the [`Permission`] they need.

mod extractor;
mod provider;
mod session;

pub use extractor::AuthUser;
pub use provider::{AuthProvider, StaticAuthProvider};
#[cfg(test)]
pub use provider::MockAuthProvider;
pub use session::{Session, SessionStore};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Permission {
    View,
    Edit,
    Delete,
    Admin,
}

impl Role {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Viewer => &[Permission::View],
            Role::Editor => &[Permission::View, Permission::Edit],
            Role::Admin => &[
                Permission::View,
                Permission::Edit,
                Permission::Delete,
                Permission::Admin,
            ],
        }
    }

    pub fn allows(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub username: String,
    pub role: Role,
}

impl User {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }

    /// Forbidden unless the user's role grants `permission`
    pub fn require(&self, permission: Permission) -> AppResult<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AppError::forbidden(&format!(
                "Role {} lacks {} permission",
                self.role, permission
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(Role::Viewer.allows(Permission::View));
        assert!(!Role::Viewer.allows(Permission::Edit));
        assert!(Role::Editor.allows(Permission::Edit));
        assert!(!Role::Editor.allows(Permission::Delete));
        assert!(Role::Admin.allows(Permission::Admin));
    }

    #[test]
    fn test_require_forbids() {
        let user = User::new("ro", Role::Viewer);
        assert!(user.require(Permission::View).is_ok());
        assert_eq!(user.require(Permission::Delete).unwrap_err().code(), "FORBIDDEN");
    }
}
