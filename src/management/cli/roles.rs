// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::management::cli::parse_utils::{
    ensure_no_args, next_value, parse_permission_assignment, parse_required_arg,
};
use crate::management::cli::{CliError, CommandSpec};
use crate::management::cli_helper::{CliCommand, MembersEdit};
use crate::management::core::ManagementCommand;
use crate::management::registry::DomainActionKey;
use crate::management::roles::{
    ROLE_ACTION_ADD_OK, ROLE_ACTION_LIST_OK, ROLE_ACTION_SHOW_OK, ROLES_DOMAIN_ID,
    RoleAddRequest, RoleCommand, RoleListRequest, RoleShowRequest,
};

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        domain: "role",
        name: "add",
        usage: &["role add <role>"],
        parser: parse_add,
    },
    CommandSpec {
        domain: "role",
        name: "list",
        usage: &["role list"],
        parser: parse_list,
    },
    CommandSpec {
        domain: "role",
        name: "members",
        usage: &[
            "role members <role> [--add <email>]... [--remove <email>]...",
            "    [--permission <name>=<level>]...",
        ],
        parser: parse_members,
    },
    CommandSpec {
        domain: "role",
        name: "show",
        usage: &["role show <role>"],
        parser: parse_show,
    },
];

fn parse_add(args: &[String]) -> Result<CliCommand, CliError> {
    let (role, rest) = parse_required_arg(args, "role")?;
    if !rest.is_empty() {
        return Err(CliError::usage("role add takes only <role>"));
    }

    Ok(CliCommand::request(
        ManagementCommand::Roles(RoleCommand::Add(RoleAddRequest { role })),
        DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_ADD_OK),
    ))
}

fn parse_list(args: &[String]) -> Result<CliCommand, CliError> {
    ensure_no_args(args, "role list")?;

    Ok(CliCommand::request(
        ManagementCommand::Roles(RoleCommand::List(RoleListRequest {})),
        DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_LIST_OK),
    ))
}

fn parse_show(args: &[String]) -> Result<CliCommand, CliError> {
    let (role, rest) = parse_required_arg(args, "role")?;
    if !rest.is_empty() {
        return Err(CliError::usage("role show takes only <role>"));
    }

    Ok(CliCommand::request(
        ManagementCommand::Roles(RoleCommand::Show(RoleShowRequest { role })),
        DomainActionKey::new(ROLES_DOMAIN_ID, ROLE_ACTION_SHOW_OK),
    ))
}

fn parse_members(args: &[String]) -> Result<CliCommand, CliError> {
    let (role, rest) = parse_required_arg(args, "role")?;
    let mut edit = MembersEdit {
        role,
        ..MembersEdit::default()
    };

    let mut idx = 0;
    while idx < rest.len() {
        match rest[idx].as_str() {
            "--add" => {
                idx += 1;
                edit.add.push(next_value(rest, &mut idx, "--add")?);
            }
            "--remove" => {
                idx += 1;
                edit.remove.push(next_value(rest, &mut idx, "--remove")?);
            }
            "--permission" => {
                idx += 1;
                let raw = next_value(rest, &mut idx, "--permission")?;
                edit.permissions.push(parse_permission_assignment(&raw)?);
            }
            flag => {
                return Err(CliError::usage(format!(
                    "Unknown flag for role members: {}",
                    flag
                )));
            }
        }
    }

    Ok(CliCommand::EditMembers(edit))
}
