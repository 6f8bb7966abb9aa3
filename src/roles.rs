// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

pub const ADMIN_ROLE: &str = "admin";
pub const MAX_ROLE_COUNT: usize = 64;
pub const MAX_ROLE_CHARS: usize = 64;
pub const MAX_PERMISSION_COUNT: usize = 128;

#[derive(Debug)]
pub struct RoleValidationError {
    message: String,
}

impl RoleValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RoleValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for RoleValidationError {}

/// Access level a role holds on a named permission.
///
/// `Revoked` only appears in pending changes; stored permission sets never
/// contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionLevel {
    #[serde(rename = "read")]
    ReadOnly,
    #[serde(rename = "write")]
    ReadWrite,
    #[serde(rename = "revoked")]
    Revoked,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::ReadOnly => "read",
            PermissionLevel::ReadWrite => "write",
            PermissionLevel::Revoked => "revoked",
        }
    }

    pub fn is_grant(&self) -> bool {
        !matches!(self, PermissionLevel::Revoked)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = RoleValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" | "read-only" | "ro" => Ok(PermissionLevel::ReadOnly),
            "write" | "read-write" | "rw" => Ok(PermissionLevel::ReadWrite),
            "revoked" | "revoke" | "none" => Ok(PermissionLevel::Revoked),
            other => Err(RoleValidationError::new(format!(
                "Unknown permission level '{}' (expected read, write or revoked)",
                other
            ))),
        }
    }
}

/// A named role and the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    #[serde(default)]
    pub permissions: BTreeMap<String, PermissionLevel>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: BTreeMap::new(),
        }
    }

    pub fn with_permission(mut self, permission: &str, level: PermissionLevel) -> Self {
        self.permissions.insert(permission.to_string(), level);
        self
    }

    /// Returns a copy with `changes` applied; `Revoked` drops the permission.
    pub fn apply_permission_changes(&self, changes: &BTreeMap<String, PermissionLevel>) -> Role {
        let mut permissions = self.permissions.clone();
        for (permission, level) in changes {
            if level.is_grant() {
                permissions.insert(permission.clone(), *level);
            } else {
                permissions.remove(permission);
            }
        }
        Role {
            name: self.name.clone(),
            permissions,
        }
    }
}

pub fn validate_permission_set(
    permissions: &BTreeMap<String, PermissionLevel>,
) -> Result<(), RoleValidationError> {
    if permissions.len() > MAX_PERMISSION_COUNT {
        return Err(RoleValidationError::new(format!(
            "Permissions must be at most {} entries",
            MAX_PERMISSION_COUNT
        )));
    }
    for (permission, level) in permissions {
        normalize_permission(permission)?;
        if !level.is_grant() {
            return Err(RoleValidationError::new(format!(
                "Permission '{}' cannot be stored as revoked",
                permission
            )));
        }
    }
    Ok(())
}

pub fn normalize_role(role: &str) -> Result<String, RoleValidationError> {
    normalize_name(role, "Role")
}

pub fn normalize_permission(permission: &str) -> Result<String, RoleValidationError> {
    normalize_name(permission, "Permission")
}

fn normalize_name(value: &str, label: &str) -> Result<String, RoleValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RoleValidationError::new(format!("{} is required", label)));
    }
    if trimmed.chars().count() > MAX_ROLE_CHARS {
        return Err(RoleValidationError::new(format!(
            "{} must be at most {} characters",
            label, MAX_ROLE_CHARS
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RoleValidationError::new(format!(
            "{} '{}' contains invalid characters",
            label, trimmed
        )));
    }
    Ok(trimmed.to_string())
}

pub fn normalize_roles(roles: &[String]) -> Result<Vec<String>, RoleValidationError> {
    if roles.len() > MAX_ROLE_COUNT {
        return Err(RoleValidationError::new(format!(
            "Roles must be at most {} entries",
            MAX_ROLE_COUNT
        )));
    }
    let mut normalized = Vec::with_capacity(roles.len());
    for role in roles {
        normalized.push(normalize_role(role)?);
    }
    Ok(dedup_roles(normalized))
}

/// Drops repeated entries, keeping the first occurrence of each role.
pub fn dedup_roles<I>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    roles
        .into_iter()
        .filter(|role| seen.insert(role.clone()))
        .collect()
}

pub fn with_role(roles: &[String], role: &str) -> Vec<String> {
    dedup_roles(
        roles
            .iter()
            .cloned()
            .chain(std::iter::once(role.to_string())),
    )
}

pub fn without_role(roles: &[String], role: &str) -> Vec<String> {
    dedup_roles(roles.iter().filter(|item| item.as_str() != role).cloned())
}

/// Role lists travel as a single space-separated string.
pub fn format_role_list(roles: &[String]) -> String {
    roles.join(" ")
}

pub fn parse_role_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
