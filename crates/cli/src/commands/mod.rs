//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations, plus
//! the helpers that turn a profile name into an open bucket session.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use bm_core::{Config, ConfigManager, DownloadSettings, Profile, Session};
use bm_s3::S3Store;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod get;
mod ls;
mod profile;
mod stat;

/// bmirror - mirror S3 buckets onto the local filesystem
///
/// Lists, inspects and downloads whole buckets or prefixes from AWS S3 and
/// other S3-compatible backends, recreating the key hierarchy as folders.
#[derive(Parser, Debug)]
#[command(name = "bmirror")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage bucket profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// List every key below a prefix
    Ls(ls::LsArgs),

    /// Show metadata for a key
    Stat(stat::StatArgs),

    /// Download a file, a folder or a whole bucket
    Get(get::GetArgs),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Stat(args) => stat::execute(args, output_config).await,
        Commands::Get(args) => get::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Load the configuration file, reporting failures through `formatter`
pub(crate) fn load_config(formatter: &Formatter) -> Result<Config, ExitCode> {
    ConfigManager::new()
        .and_then(|manager| manager.load())
        .map_err(|e| formatter.fail("Failed to load configuration", &e))
}

/// Look up a profile by name
pub(crate) fn find_profile(
    config: &Config,
    name: &str,
    formatter: &Formatter,
) -> Result<Profile, ExitCode> {
    match config.profiles.iter().find(|p| p.name == name) {
        Some(profile) => Ok(profile.clone()),
        None => {
            formatter.error(&format!("Profile '{name}' not found"));
            Err(ExitCode::NotFound)
        }
    }
}

/// Build the S3 store for `profile` and open a validated session on it
pub(crate) async fn open_session(
    profile: &Profile,
    settings: &DownloadSettings,
    formatter: &Formatter,
) -> Result<Session, ExitCode> {
    let store = S3Store::new(profile)
        .await
        .map_err(|e| formatter.fail("Failed to create S3 client", &e))?;

    Session::connect(Arc::new(store), settings)
        .await
        .map_err(|e| formatter.fail("Failed to open bucket", &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_get_with_overrides() {
        let cli = Cli::try_parse_from([
            "bmirror",
            "--json",
            "get",
            "photos",
            "poze/",
            "--concurrency",
            "4",
            "--queue-limit",
            "100",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.profile, "photos");
                assert_eq!(args.key.as_deref(), Some("poze/"));
                assert_eq!(args.concurrency, Some(4));
                assert_eq!(args.queue_limit, Some(100));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_find_profile() {
        let formatter = Formatter::new(OutputConfig {
            quiet: true,
            ..Default::default()
        });
        let mut config = Config::default();
        config.profiles.push(Profile::new("photos", "qteam-task-bucket"));

        let profile = find_profile(&config, "photos", &formatter).unwrap();
        assert_eq!(profile.bucket, "qteam-task-bucket");
        assert_eq!(
            find_profile(&config, "videos", &formatter).unwrap_err(),
            ExitCode::NotFound
        );
    }
}
