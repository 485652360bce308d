//! Profile management commands
//!
//! A profile names one bucket and the connection details used to reach it.

use clap::Subcommand;
use serde::Serialize;

use bm_core::{Error, Profile, ProfileManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Profile subcommands for managing bucket connections
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List(ListArgs),

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "photos", "backups")
    pub name: String,

    /// Bucket to mirror
    pub bucket: String,

    /// AWS region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Custom S3-compatible endpoint URL (e.g., "http://localhost:9000")
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Access key ID (defaults to the SDK credential chain)
    #[arg(long, env = "BM_ACCESS_KEY", requires = "secret_key")]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(long, env = "BM_SECRET_KEY", requires = "access_key")]
    pub secret_key: Option<String>,

    /// Bucket lookup style: auto, path, or dns
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: String,
}

/// Arguments for the `profile list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details including endpoints
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for JSON output (without credentials)
#[derive(Debug, Serialize)]
struct ProfileInfo {
    name: String,
    bucket: String,
    region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    bucket_lookup: String,
    static_credentials: bool,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            bucket: profile.bucket.clone(),
            region: profile.region.clone(),
            endpoint: profile.endpoint.clone(),
            bucket_lookup: profile.bucket_lookup.clone(),
            static_credentials: profile.static_credentials().is_some(),
        }
    }
}

#[derive(Serialize)]
struct ProfileListOutput {
    profiles: Vec<ProfileInfo>,
}

/// JSON output for profile set/remove operations
#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub async fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => return formatter.fail("Failed to load configuration", &e),
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List(args) => execute_list(args, &manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn profile_from_args(args: SetArgs) -> Profile {
    let mut profile = Profile::new(args.name, args.bucket);
    profile.region = args.region;
    profile.endpoint = args.endpoint;
    profile.access_key = args.access_key;
    profile.secret_key = args.secret_key;
    profile.bucket_lookup = args.bucket_lookup;
    profile
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profile = profile_from_args(args);
    let name = profile.name.clone();

    match manager.set(profile) {
        Ok(()) => {
            let message = format!("Profile '{name}' configured successfully");
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to save profile", &e),
    }
}

fn execute_list(args: ListArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profiles = match manager.list() {
        Ok(profiles) => profiles,
        Err(e) => return formatter.fail("Failed to list profiles", &e),
    };

    if formatter.is_json() {
        formatter.json(&ProfileListOutput {
            profiles: profiles.iter().map(ProfileInfo::from).collect(),
        });
    } else if profiles.is_empty() {
        formatter.println("No profiles configured.");
    } else {
        for profile in &profiles {
            if args.long {
                formatter.println(&format!(
                    "{:<12} {} (region: {}, endpoint: {}, lookup: {})",
                    profile.name,
                    profile.bucket,
                    profile.region,
                    profile.endpoint.as_deref().unwrap_or("default"),
                    profile.bucket_lookup
                ));
            } else {
                formatter.println(&format!("{:<12} {}", profile.name, profile.bucket));
            }
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Profile '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(Error::NotFound(_)) => {
            formatter.error(&format!("Profile '{}' not found", args.name));
            ExitCode::NotFound
        }
        Err(e) => formatter.fail("Failed to remove profile", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_args() -> SetArgs {
        SetArgs {
            name: "minio".to_string(),
            bucket: "media".to_string(),
            region: "eu-central-1".to_string(),
            endpoint: Some("http://localhost:9000".to_string()),
            access_key: Some("accesskey".to_string()),
            secret_key: Some("secretkey".to_string()),
            bucket_lookup: "path".to_string(),
        }
    }

    #[test]
    fn test_profile_from_args() {
        let profile = profile_from_args(set_args());
        assert_eq!(profile.name, "minio");
        assert_eq!(profile.bucket, "media");
        assert_eq!(profile.region, "eu-central-1");
        assert_eq!(profile.bucket_lookup, "path");
        assert_eq!(profile.static_credentials(), Some(("accesskey", "secretkey")));
    }

    #[test]
    fn test_profile_info_hides_secrets() {
        let profile = profile_from_args(set_args());
        let info = ProfileInfo::from(&profile);
        let json = serde_json::to_string(&info).unwrap();

        assert!(info.static_credentials);
        assert!(!json.contains("secretkey"));
        assert!(!json.contains("accesskey"));
        assert!(json.contains("http://localhost:9000"));
    }
}
