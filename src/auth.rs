//! mock user directory standing in for the authentication service.
//!
//! login is by email only; there is no credential backend behind it.

use crate::domain::User;
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    /// look up a user by email, ignoring case and surrounding whitespace
    pub fn authenticate(&self, email: &str) -> Result<User, StoreError> {
        let wanted = email.trim();
        self.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| StoreError::UnknownUser(wanted.to_string()))
    }
}
