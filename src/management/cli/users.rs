// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::cli::parse_utils::{ensure_no_args, parse_required_arg};
use crate::management::cli::{CliError, CommandSpec};
use crate::management::cli_helper::CliCommand;
use crate::management::core::ManagementCommand;
use crate::management::registry::DomainActionKey;
use crate::management::users::{
    USER_ACTION_LIST_OK, USER_ACTION_ROLES_UPDATE_OK, USER_ACTION_SHOW_OK, USERS_DOMAIN_ID,
    UserCommand, UserListRequest, UserRolesUpdateRequest, UserShowRequest,
};
use crate::roles::format_role_list;

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        domain: "user",
        name: "list",
        usage: &["user list"],
        parser: parse_list,
    },
    CommandSpec {
        domain: "user",
        name: "roles",
        usage: &["user roles <email> <role>...", "user roles <email> --clear"],
        parser: parse_roles,
    },
    CommandSpec {
        domain: "user",
        name: "show",
        usage: &["user show <email>"],
        parser: parse_show,
    },
];

fn parse_list(args: &[String]) -> Result<CliCommand, CliError> {
    ensure_no_args(args, "user list")?;

    Ok(CliCommand::request(
        ManagementCommand::Users(UserCommand::List(UserListRequest {})),
        DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_LIST_OK),
    ))
}

fn parse_show(args: &[String]) -> Result<CliCommand, CliError> {
    let (email, rest) = parse_required_arg(args, "email")?;
    if !rest.is_empty() {
        return Err(CliError::usage("user show takes only <email>"));
    }

    Ok(CliCommand::request(
        ManagementCommand::Users(UserCommand::Show(UserShowRequest { email })),
        DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_SHOW_OK),
    ))
}

fn parse_roles(args: &[String]) -> Result<CliCommand, CliError> {
    let (email, rest) = parse_required_arg(args, "email")?;
    let roles = match rest {
        [] => {
            return Err(CliError::usage(
                "user roles requires at least one role or --clear",
            ));
        }
        [flag] if flag == "--clear" => String::new(),
        _ => {
            if let Some(flag) = rest.iter().find(|arg| arg.starts_with("--")) {
                return Err(CliError::usage(format!(
                    "Unknown flag for user roles: {}",
                    flag
                )));
            }
            format_role_list(rest)
        }
    };

    Ok(CliCommand::request(
        ManagementCommand::Users(UserCommand::RolesUpdate(UserRolesUpdateRequest {
            email,
            roles,
        })),
        DomainActionKey::new(USERS_DOMAIN_ID, USER_ACTION_ROLES_UPDATE_OK),
    ))
}
