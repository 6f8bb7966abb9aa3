// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use crate::runtime_paths::RuntimePaths;
use std::error::Error;
use std::fmt;
use std::path::Path;

pub mod config;
pub mod users;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub runtime_paths: RuntimePaths,
    pub created_config: bool,
    pub created_users: bool,
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::Io(err) => write!(f, "Bootstrap I/O error: {}", err),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

/// Prepares a runtime root: default `config.yaml`, empty `users.yaml`, state dirs.
pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let runtime_paths = RuntimePaths::from_root(root)?;
    let created_config = config::ensure_config(&runtime_paths.config_file)?;
    let validated_config = Config::load_and_validate(&runtime_paths.root)?;
    let created_users = users::ensure_users(&runtime_paths.users_file)?;

    Ok(BootstrapResult {
        validated_config,
        runtime_paths,
        created_config,
        created_users,
    })
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        assert!(result.created_users);
        assert_eq!(result.validated_config.logging.level, "info");
        assert!(result.runtime_paths.config_file.exists());
        assert!(result.runtime_paths.users_file.exists());
    }

    #[test]
    fn bootstrap_keeps_existing_files() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-existing").unwrap();
        fs::write(fixture.path().join("config.yaml"), "logging:\n  level: warn\n")
            .expect("write config");
        fs::write(
            fixture.path().join("users.yaml"),
            "a@example.com:\n  name: A\n  roles: []\n",
        )
        .expect("write users");

        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!result.created_config);
        assert!(!result.created_users);
        assert_eq!(result.validated_config.log_level, log::LevelFilter::Warn);
    }

    #[test]
    fn bootstrap_reports_invalid_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-invalid").unwrap();
        fs::write(fixture.path().join("config.yaml"), "logging:\n  level: shout\n")
            .expect("write config");
        let err = bootstrap_runtime(fixture.path()).unwrap_err();
        assert!(matches!(err, BootstrapError::Config(_)));
    }
}
