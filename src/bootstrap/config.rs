// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use crate::config::Config;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

pub fn ensure_config(config_path: &Path) -> Result<bool, BootstrapError> {
    if config_path.exists() {
        return Ok(false);
    }

    let contents = serde_yaml::to_string(&Config::default())
        .map_err(|err| BootstrapError::Io(io::Error::other(err)))?;

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(config_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    log_action(format!("created {}", config_path.display()));
    Ok(true)
}
