// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{IamError, User, UsersData, YamlUser, YamlUsersData};
use crate::management::yaml_store;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

pub trait UserStore: Send + Sync {
    fn load(&self) -> Result<UsersData, IamError>;
    fn save(&self, users: &UsersData) -> Result<(), IamError>;
}

pub struct FileUserStore {
    users_file: PathBuf,
}

impl FileUserStore {
    pub fn new(users_file: PathBuf) -> Result<Self, IamError> {
        if users_file.as_os_str().is_empty() {
            return Err(IamError::ConfigurationError(
                "Users file path is empty".to_string(),
            ));
        }

        Ok(Self { users_file })
    }
}

impl UserStore for FileUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        let yaml_users: Option<YamlUsersData> =
            yaml_store::read_yaml_file(&self.users_file, "users")
                .map_err(|err| IamError::ParseError(err.to_string()))?;
        Ok(yaml_users
            .unwrap_or_default()
            .into_iter()
            .map(|(email, yaml_user)| (email.clone(), yaml_user.into_user(email)))
            .collect())
    }

    fn save(&self, users: &UsersData) -> Result<(), IamError> {
        let yaml_users: YamlUsersData = users
            .iter()
            .map(|(email, user)| (email.clone(), YamlUser::from_user(user)))
            .collect();
        yaml_store::write_yaml_file(&self.users_file, "users", &yaml_users)
            .map_err(|err| IamError::FileError(err.to_string()))
    }
}

/// Store backed by process memory, for embedding and tests.
pub struct MemoryUserStore {
    users: Arc<RwLock<UsersData>>,
}

impl MemoryUserStore {
    pub fn new(initial: UsersData) -> Self {
        Self {
            users: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn from_users(users: Vec<User>) -> Self {
        let data = users
            .into_iter()
            .map(|user| (user.email.clone(), user))
            .collect();
        Self::new(data)
    }
}

impl UserStore for MemoryUserStore {
    fn load(&self) -> Result<UsersData, IamError> {
        match self.users.read() {
            Ok(guard) => Ok(guard.clone()),
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on read; recovering");
                Ok(poisoned.into_inner().clone())
            }
        }
    }

    fn save(&self, users: &UsersData) -> Result<(), IamError> {
        match self.users.write() {
            Ok(mut guard) => {
                *guard = users.clone();
                Ok(())
            }
            Err(poisoned) => {
                log::error!("MemoryUserStore lock poisoned on write; recovering");
                let mut guard = poisoned.into_inner();
                *guard = users.clone();
                Ok(())
            }
        }
    }
}
