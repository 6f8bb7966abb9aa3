// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub(crate) mod parse_utils;
pub mod roles;
pub mod users;

use crate::management::cli_helper::CliCommand;
use std::fmt;
use std::path::Path;

/// Usage errors exit with 2; failures past parsing exit with 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    Usage(String),
    Connector(String),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        CliError::Usage(message.into())
    }

    pub fn connector(message: impl Into<String>) -> Self {
        CliError::Connector(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Connector(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(message) | CliError::Connector(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for CliError {}

/// One `<domain> <command>` entry of the command table.
pub struct CommandSpec {
    pub domain: &'static str,
    pub name: &'static str,
    pub usage: &'static [&'static str],
    pub parser: fn(&[String]) -> Result<CliCommand, CliError>,
}

pub fn command_table() -> Vec<&'static CommandSpec> {
    users::COMMANDS.iter().chain(roles::COMMANDS).collect()
}

/// Matches the first two tokens against the table (ASCII case-insensitive)
/// and hands the rest to the command's parser.
pub fn resolve_command(
    table: &[&CommandSpec],
    tokens: &[String],
) -> Result<CliCommand, CliError> {
    let Some((domain, rest)) = tokens.split_first() else {
        return Err(CliError::usage("Missing command domain"));
    };
    let domain = domain.to_ascii_lowercase();
    if !table.iter().any(|spec| spec.domain == domain) {
        return Err(CliError::usage(format!("Unknown domain '{}'", domain)));
    }
    let Some((name, args)) = rest.split_first() else {
        return Err(CliError::usage(format!(
            "Missing command for domain '{}'",
            domain
        )));
    };
    let name = name.to_ascii_lowercase();
    let spec = table
        .iter()
        .find(|spec| spec.domain == domain && spec.name == name)
        .ok_or_else(|| {
            CliError::usage(format!("Unknown command '{}' for domain '{}'", name, domain))
        })?;
    (spec.parser)(args)
}

pub fn help_text() -> String {
    let mut out = String::from(
        "Usage:\n  roledesk [options] <domain> <command> [args]\n  roledesk help\n\n\
         Options:\n  -C <root>   Set the runtime root (default: .).\n  \
         -h, --help  Show this help.\n\nCommands:\n",
    );
    for spec in command_table() {
        for usage in spec.usage {
            out.push_str(&format!("  {}\n", usage));
        }
    }
    out.push_str("\nPermission levels are read, write or revoked.\n");
    out
}

pub async fn run_cli(runtime_root: &Path, tokens: Vec<String>) -> i32 {
    let outcome = match resolve_command(&command_table(), &tokens) {
        Ok(command) => crate::management::cli_helper::execute(runtime_root, command).await,
        Err(err) => Err(err),
    };
    outcome.unwrap_or_else(|err| {
        eprintln!("{}", err);
        err.exit_code()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    const TABLE: &[CommandSpec] = &[
        CommandSpec {
            domain: "alpha",
            name: "list",
            usage: &["alpha list"],
            parser: |_args| Err(CliError::usage("list parser ran")),
        },
        CommandSpec {
            domain: "alpha",
            name: "link",
            usage: &["alpha link"],
            parser: |args| Err(CliError::usage(format!("link got {}", args.len()))),
        },
    ];

    fn table() -> Vec<&'static CommandSpec> {
        TABLE.iter().collect()
    }

    #[test]
    fn resolves_case_insensitive_names_and_passes_remaining_args() {
        let err = resolve_command(&table(), &tokens(&["ALPHA", "List"])).unwrap_err();
        assert_eq!(err.to_string(), "list parser ran");
        let err = resolve_command(&table(), &tokens(&["alpha", "link", "x", "y"])).unwrap_err();
        assert_eq!(err.to_string(), "link got 2");
    }

    #[test]
    fn prefixes_are_not_commands() {
        let err = resolve_command(&table(), &tokens(&["alpha", "li"])).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command 'li' for domain 'alpha'");
        assert_eq!(err.exit_code(), 2);
        let err = resolve_command(&table(), &tokens(&["al", "list"])).unwrap_err();
        assert_eq!(err.to_string(), "Unknown domain 'al'");
    }

    #[test]
    fn detects_missing_domain_and_command() {
        let err = resolve_command(&table(), &[]).unwrap_err();
        assert_eq!(err.to_string(), "Missing command domain");
        let err = resolve_command(&table(), &tokens(&["alpha"])).unwrap_err();
        assert_eq!(err.to_string(), "Missing command for domain 'alpha'");
    }

    #[test]
    fn command_table_names_are_unique() {
        let table = command_table();
        for (idx, spec) in table.iter().enumerate() {
            assert!(
                table[idx + 1..]
                    .iter()
                    .all(|other| (other.domain, other.name) != (spec.domain, spec.name)),
                "duplicate command {} {}",
                spec.domain,
                spec.name
            );
        }
    }

    #[test]
    fn help_lists_every_usage_line() {
        let help = help_text();
        assert!(help.contains("role members <role>"));
        assert!(help.contains("user roles <email> <role>..."));
        assert!(help.contains("user roles <email> --clear"));
    }
}
