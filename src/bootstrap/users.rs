// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::{BootstrapError, log_action};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

// Accounts are provisioned outside this tool.
const EMPTY_USERS_YAML: &str = "{}\n";

pub fn ensure_users(users_path: &Path) -> Result<bool, BootstrapError> {
    if users_path.exists() {
        return Ok(false);
    }

    let mut file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(users_path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(BootstrapError::Io(err)),
    };

    file.write_all(EMPTY_USERS_YAML.as_bytes())?;
    file.sync_all()?;

    log_action(format!("created empty {}", users_path.display()));
    Ok(true)
}
