// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use roledesk::{bootstrap, management, util};
use std::path::PathBuf;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the runtime directory.");
            return 2;
        }
    };

    let tokens = match parsed_args.mode {
        RunMode::Help => {
            print!("{}", management::cli::help_text());
            return 0;
        }
        RunMode::Cli(tokens) => tokens,
    };

    let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("❌ Bootstrap error: {}", error);
            return 1;
        }
    };
    if let Err(error) = util::init_logging(bootstrap.validated_config.log_level) {
        eprintln!("❌ Failed to initialize logging: {}", error);
        return 1;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("❌ Failed to start async runtime: {}", error);
            return 1;
        }
    };
    runtime.block_on(management::cli::run_cli(&parsed_args.runtime_root, tokens))
}

#[derive(Debug)]
enum RunMode {
    Cli(Vec<String>),
    Help,
}

struct ParsedArgs {
    runtime_root: PathBuf,
    mode: RunMode,
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = PathBuf::from(".");
    let mut cli_tokens = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = PathBuf::from(value);
        } else {
            cli_tokens.push(arg);
        }
    }

    if cli_tokens.is_empty()
        || (cli_tokens.len() == 1 && cli_tokens[0].eq_ignore_ascii_case("help"))
    {
        return Ok(ParsedArgs {
            runtime_root,
            mode: RunMode::Help,
        });
    }

    let runtime_root = make_runtime_root_absolute(runtime_root)?;
    Ok(ParsedArgs {
        runtime_root,
        mode: RunMode::Cli(cli_tokens),
    })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(runtime_root: PathBuf) -> Result<PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}

#[cfg(test)]
mod tests {
    use super::{RunMode, parse_args_from};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parse_args_without_command_shows_help() {
        let parsed = parse_args_from(Vec::new()).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
    }

    #[test]
    fn parse_args_accepts_runtime_root() {
        let parsed = parse_args_from(args(&["-C", "runtime", "role", "list"])).expect("parse args");
        assert!(parsed.runtime_root.is_absolute());
        assert!(parsed.runtime_root.ends_with("runtime"));
        match parsed.mode {
            RunMode::Cli(tokens) => assert_eq!(tokens, args(&["role", "list"])),
            other => panic!("expected cli mode, got {:?}", other),
        }
    }

    #[test]
    fn parse_args_ignores_double_dash() {
        let parsed = parse_args_from(args(&["--", "user", "list"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Cli(_)));
    }

    #[test]
    fn parse_args_rejects_missing_root_value() {
        match parse_args_from(args(&["role", "list", "-C"])) {
            Err(error) => assert!(error.contains("-C")),
            Ok(_) => panic!("expected -C rejection"),
        }
    }

    #[test]
    fn parse_args_accepts_help_forms() {
        let parsed = parse_args_from(args(&["help"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
        let parsed = parse_args_from(args(&["--help", "role", "list"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
        let parsed = parse_args_from(args(&["-C", "runtime", "help"])).expect("parse args");
        assert!(matches!(parsed.mode, RunMode::Help));
    }
}
