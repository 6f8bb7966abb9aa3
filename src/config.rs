// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

const MAX_BUS_CHANNEL_DEPTH: usize = 4096;
const MAX_BLOCKING_WORKERS: usize = 64;

#[derive(Debug)]
pub enum ConfigError {
    LoadError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::LoadError(msg) => write!(f, "Configuration load error: {}", msg),
            ConfigError::ValidationError(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    #[serde(default)]
    pub management: ManagementConfig,
}

#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub logging: LoggingConfig,
    pub management: ManagementConfig,
    pub log_level: LevelFilter,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_bus_channel_depth() -> usize {
    64
}

fn default_blocking_workers() -> usize {
    2
}

fn default_overflow_workers() -> usize {
    1
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ManagementConfig {
    #[serde(default = "default_bus_channel_depth")]
    pub bus_channel_depth: usize,
    #[serde(default = "default_blocking_workers")]
    pub blocking_workers: usize,
    #[serde(default = "default_overflow_workers")]
    pub overflow_workers: usize,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            bus_channel_depth: default_bus_channel_depth(),
            blocking_workers: default_blocking_workers(),
            overflow_workers: default_overflow_workers(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config_path = root.join(CONFIG_FILE_NAME);
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config: Config = serde_yaml::from_str(&config_content).map_err(|e| {
            ConfigError::LoadError(format!(
                "Failed to parse config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        Ok(config)
    }

    /// Loads and validates configuration. Callers must not start a bus on failure.
    pub fn load_and_validate(root: &Path) -> Result<ValidatedConfig, ConfigError> {
        Self::load(root)?.validate()
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level = Self::validate_logging(&self.logging)?;
        Self::validate_management(&self.management)?;
        Ok(ValidatedConfig {
            logging: self.logging,
            management: self.management,
            log_level,
        })
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(logging.level.trim()).map_err(|_| {
            ConfigError::ValidationError(format!(
                "logging.level must be one of off, error, warn, info, debug, trace (got '{}')",
                logging.level
            ))
        })
    }

    fn validate_management(management: &ManagementConfig) -> Result<(), ConfigError> {
        if management.bus_channel_depth == 0 || management.bus_channel_depth > MAX_BUS_CHANNEL_DEPTH
        {
            return Err(ConfigError::ValidationError(format!(
                "management.bus_channel_depth must be between 1 and {}, got: {}",
                MAX_BUS_CHANNEL_DEPTH, management.bus_channel_depth
            )));
        }
        if management.blocking_workers == 0 || management.blocking_workers > MAX_BLOCKING_WORKERS {
            return Err(ConfigError::ValidationError(format!(
                "management.blocking_workers must be between 1 and {}, got: {}",
                MAX_BLOCKING_WORKERS, management.blocking_workers
            )));
        }
        if management.overflow_workers > MAX_BLOCKING_WORKERS {
            return Err(ConfigError::ValidationError(format!(
                "management.overflow_workers must be at most {}, got: {}",
                MAX_BLOCKING_WORKERS, management.overflow_workers
            )));
        }
        Ok(())
    }
}

impl ValidatedConfig {
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config::default()
            .validate()
            .expect("default config is valid")
    }
}
