use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "steward")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge this machine toward declared users, groups, mounts and files", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/steward/config.toml)
    #[arg(short, long, global = true, env = "STEWARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge a run list
    Apply(ApplyArgs),

    /// Show which provider handles each resource type on this node
    Resolve {
        /// Resource types to resolve (default: all registered)
        types: Vec<String>,
    },

    /// Show detected node facts
    Facts,

    /// List resource types, their properties and actions
    Types,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Run list (TOML with [[resource]] tables)
    pub runlist: PathBuf,

    /// Report what would change without changing anything
    #[arg(short = 'n', long = "why-run", visible_alias = "dry-run")]
    pub why_run: bool,

    /// Only converge matching resources (type, type.name or type[name])
    #[arg(short, long)]
    pub target: Option<String>,

    /// Write a JSON run report to this path
    #[arg(short, long)]
    pub report: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dry_run_alias() {
        let cli = Cli::try_parse_from(["steward", "apply", "site.toml", "--dry-run"]).unwrap();
        match cli.command {
            Command::Apply(args) => {
                assert!(args.why_run);
                assert_eq!(args.runlist, PathBuf::from("site.toml"));
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["steward", "facts", "-vv", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_resolve_types() {
        let cli = Cli::try_parse_from(["steward", "resolve", "user", "mount"]).unwrap();
        assert!(matches!(cli.command, Command::Resolve { types } if types == ["user", "mount"]));
    }
}
