// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    /// Fields owned by other tools (password blocks and the like), carried
    /// through untouched so a save never drops them.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            roles,
            extra: BTreeMap::new(),
        }
    }
}

// Structure matching the YAML file format
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct YamlUser {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl YamlUser {
    pub fn into_user(self, email: String) -> User {
        User {
            email,
            name: self.name,
            roles: self.roles,
            extra: self.extra,
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            roles: user.roles.clone(),
            extra: user.extra.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum IamError {
    UserNotFound(String),
    ConfigurationError(String),
    FileError(String),
    ParseError(String),
}

impl std::fmt::Display for IamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IamError::UserNotFound(email) => write!(f, "User not found: {}", email),
            IamError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            IamError::FileError(msg) => write!(f, "File error: {}", msg),
            IamError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for IamError {}

// The users.yaml file structure: email -> yaml user data
pub type YamlUsersData = BTreeMap<String, YamlUser>;
pub type UsersData = HashMap<String, User>;
