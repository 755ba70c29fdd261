use std::ffi::OsString;

use clap::{ArgAction, Parser, Subcommand};

/// A virtual node environment: run commands with the Node.js version a
/// project asks for.
#[derive(Parser, Debug)]
#[command(
    name = "nodapt",
    version,
    disable_version_flag = true,
    subcommand_required = true,
    arg_required_else_help = true,
    after_help = "\
ENVIRONMENT VARIABLES:
  NODE_MIRROR    Mirror for Node.js downloads [default: https://nodejs.org/dist/]
  NODE_ENV_DIR   Directory holding installed versions [default: $HOME/.nodapt]
  DEBUG          Print debug information when set to 1

EXAMPLES:
  nodapt node -v
  nodapt run node -v
  nodapt use v14.17.0 node -v"
)]
pub struct Cli {
    /// Print version information
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run a command with the version from the nearest package.json
    Run {
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            value_name = "ARGS"
        )]
        command: Vec<OsString>,
    },
    /// Run a command with an explicit version constraint, or install and
    /// print the runtime directory when no command is given
    Use {
        constraint: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
        command: Vec<OsString>,
    },
    /// Remove an installed version
    #[command(visible_alias = "remove")]
    Rm { constraint: String },
    /// Remove every installed version
    Clean,
    /// List installed versions
    #[command(visible_alias = "list")]
    Ls,
    /// List versions available for this platform
    #[command(name = "ls-remote", visible_alias = "list-remote")]
    LsRemote,
    /// Shorthand for `run <ARGS...>`
    #[command(external_subcommand)]
    External(Vec<OsString>),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("nodapt").chain(args.iter().copied()))
            .expect("arguments should parse")
            .command
    }

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn unknown_command_is_passthrough() {
        assert_eq!(
            parse(&["node", "-v"]),
            Command::External(os(&["node", "-v"]))
        );
    }

    #[test]
    fn run_keeps_hyphenated_arguments() {
        assert_eq!(
            parse(&["run", "npm", "--version"]),
            Command::Run {
                command: os(&["npm", "--version"])
            }
        );
    }

    #[test]
    fn use_with_and_without_command() {
        assert_eq!(
            parse(&["use", "^14.0.0", "node", "-e", "1"]),
            Command::Use {
                constraint: "^14.0.0".to_string(),
                command: os(&["node", "-e", "1"]),
            }
        );
        assert_eq!(
            parse(&["use", "v14.17.0"]),
            Command::Use {
                constraint: "v14.17.0".to_string(),
                command: Vec::new(),
            }
        );
    }

    #[test]
    fn aliases_resolve_to_same_command() {
        assert_eq!(
            parse(&["remove", "14.17.0"]),
            Command::Rm {
                constraint: "14.17.0".to_string()
            }
        );
        assert_eq!(parse(&["list"]), Command::Ls);
        assert_eq!(parse(&["list-remote"]), Command::LsRemote);
        assert_eq!(parse(&["ls-remote"]), Command::LsRemote);
    }

    #[test]
    fn short_version_flag_is_accepted() {
        let error = Cli::try_parse_from(["nodapt", "-v"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
