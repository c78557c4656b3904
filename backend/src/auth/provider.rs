use super::{Role, User};

/// Source of truth for credentials
#[cfg_attr(test, mockall::automock)]
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Option<User>;
}

/// Fixed set of users, configured at startup
#[derive(Debug, Clone, Default)]
pub struct StaticAuthProvider {
    users: Vec<(User, String)>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, username: &str, password: &str, role: Role) -> Self {
        self.users
            .push((User::new(username, role), password.to_string()));
        self
    }
}

impl AuthProvider for StaticAuthProvider {
    fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        self.users
            .iter()
            .find(|(user, secret)| user.username == username && secret == password)
            .map(|(user, _)| user.clone())
    }
}
