// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::CliError;
use crate::roles::PermissionLevel;

pub(crate) fn parse_required_arg<'a>(
    args: &'a [String],
    label: &str,
) -> Result<(String, &'a [String]), CliError> {
    match args.split_first() {
        Some((first, rest)) if !first.starts_with("--") => Ok((first.clone(), rest)),
        _ => Err(CliError::usage(format!("Missing {}", label))),
    }
}

pub(crate) fn next_value(args: &[String], idx: &mut usize, flag: &str) -> Result<String, CliError> {
    let Some(value) = args.get(*idx) else {
        return Err(CliError::usage(format!("{} requires a value", flag)));
    };
    *idx += 1;
    Ok(value.clone())
}

pub(crate) fn ensure_no_args(args: &[String], command: &str) -> Result<(), CliError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CliError::usage(format!(
            "{} does not take any arguments",
            command
        )))
    }
}

/// Parses `name=level`, where level is read, write or revoked.
pub(crate) fn parse_permission_assignment(
    raw: &str,
) -> Result<(String, PermissionLevel), CliError> {
    let Some((name, level)) = raw.split_once('=') else {
        return Err(CliError::usage(format!(
            "--permission expects <name>=<level>, got '{}'",
            raw
        )));
    };
    let level = level
        .trim()
        .parse::<PermissionLevel>()
        .map_err(|err| CliError::usage(err.to_string()))?;
    Ok((name.trim().to_string(), level))
}
