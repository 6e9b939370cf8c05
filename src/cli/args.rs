//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Typed-schema engine for note vaults
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = "typing.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print debug output (import progress, raw watch events)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the schema and report diagnostics
    #[command(visible_alias = "c")]
    Check {
        /// Schema file to check instead of the configured entry schema
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: Option<PathBuf>,
    },

    /// Print the type graph
    #[command(visible_alias = "d")]
    Dump {
        #[command(flatten)]
        args: DumpArgs,
    },

    /// Rebuild the schema whenever vault files change
    #[command(visible_alias = "w")]
    Watch,
}

/// Dump command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct DumpArgs {
    /// Output JSON instead of text
    #[arg(short, long)]
    pub json: bool,

    /// Pretty print JSON output
    #[arg(short, long, requires = "json")]
    pub pretty: bool,

    /// Only print these types (and nothing else)
    #[arg(short, long, value_delimiter = ',')]
    pub types: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_and_verbose_flags() {
        let err = Cli::try_parse_from(["typing", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);

        let cli = Cli::parse_from(["typing", "--verbose", "check"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_parse_check_with_path() {
        let cli = Cli::parse_from(["typing", "-C", "vault/typing.toml", "check", "meta/types.otl"]);
        assert_eq!(cli.config, PathBuf::from("vault/typing.toml"));
        let Commands::Check { path } = cli.command else {
            panic!("expected check");
        };
        assert_eq!(path, Some(PathBuf::from("meta/types.otl")));
    }

    #[test]
    fn test_parse_dump_flags() {
        let cli = Cli::parse_from(["typing", "dump", "--json", "--pretty", "-t", "Task,Bug", "-v"]);
        assert!(cli.verbose);
        let Commands::Dump { args } = cli.command else {
            panic!("expected dump");
        };
        assert!(args.json && args.pretty);
        assert_eq!(args.types, Some(vec!["Task".to_string(), "Bug".to_string()]));
    }

    #[test]
    fn test_pretty_requires_json() {
        assert!(Cli::try_parse_from(["typing", "dump", "--pretty"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["typing", "watch"]);
        assert_eq!(cli.config, PathBuf::from("typing.toml"));
        assert!(matches!(cli.color, ColorChoice::Auto));
        assert!(matches!(cli.command, Commands::Watch));
    }
}
