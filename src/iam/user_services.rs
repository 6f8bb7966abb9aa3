// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::store::{FileUserStore, UserStore};
use super::types::{IamError, User, UsersData};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

/// Cached view over a [`UserStore`]; every mutation is persisted before the cache changes.
pub struct UserServices {
    store: Arc<dyn UserStore>,
    users: RwLock<UsersData>,
    write_lock: Mutex<()>,
}

pub type UserServiceResult<T> = Result<T, UserServiceError>;

#[derive(Debug)]
pub enum UserServiceError {
    Validation(String),
    NotFound(String),
    Iam(String),
}

impl fmt::Display for UserServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserServiceError::Validation(message) => write!(f, "{}", message),
            UserServiceError::NotFound(email) => write!(f, "User not found: {}", email),
            UserServiceError::Iam(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for UserServiceError {}

impl From<IamError> for UserServiceError {
    fn from(err: IamError) -> Self {
        match err {
            IamError::UserNotFound(email) => UserServiceError::NotFound(email),
            other => UserServiceError::Iam(other.to_string()),
        }
    }
}

impl UserServices {
    pub fn new(users_file: PathBuf) -> UserServiceResult<Self> {
        let store = Arc::new(FileUserStore::new(users_file)?);
        Self::new_with_store(store)
    }

    pub fn new_with_store(store: Arc<dyn UserStore>) -> UserServiceResult<Self> {
        let users = store.load()?;
        log::debug!("Loaded {} user(s)", users.len());
        Ok(Self {
            store,
            users: RwLock::new(users),
            write_lock: Mutex::new(()),
        })
    }

    pub fn get_user(&self, email: &str) -> UserServiceResult<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| UserServiceError::Iam("User cache lock poisoned".to_string()))?;
        Ok(users.get(email).cloned())
    }

    /// All users, ordered by email.
    pub fn list_users(&self) -> UserServiceResult<Vec<User>> {
        let users = self
            .users
            .read()
            .map_err(|_| UserServiceError::Iam("User cache lock poisoned".to_string()))?;
        let mut listed: Vec<User> = users.values().cloned().collect();
        listed.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(listed)
    }

    pub fn members_of(&self, role: &str) -> UserServiceResult<Vec<User>> {
        Ok(self
            .list_users()?
            .into_iter()
            .filter(|user| user.roles.iter().any(|item| item == role))
            .collect())
    }

    /// Replaces the role list of one user. Blocking: persists through the store.
    pub fn update_user_roles(&self, email: &str, roles: Vec<String>) -> UserServiceResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| UserServiceError::Iam("User write lock poisoned".to_string()))?;
        let mut updated = {
            let users = self
                .users
                .read()
                .map_err(|_| UserServiceError::Iam("User cache lock poisoned".to_string()))?;
            users.clone()
        };
        let user = updated
            .get_mut(email)
            .ok_or_else(|| UserServiceError::NotFound(email.to_string()))?;
        if user.roles == roles {
            return Ok(());
        }
        user.roles = roles;
        self.store.save(&updated)?;

        let mut users = self
            .users
            .write()
            .map_err(|_| UserServiceError::Iam("User cache lock poisoned".to_string()))?;
        *users = updated;
        Ok(())
    }
}
