//! Profile management
//!
//! A profile names one bucket together with the connection details needed
//! to reach it. Credentials are optional: without them the SDK's default
//! provider chain is used.

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// A named bucket connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name for this profile
    pub name: String,

    /// Bucket to mirror
    pub bucket: String,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Access key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Secret access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Bucket lookup style: "auto", "path", or "dns"
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl Profile {
    /// Create a new profile with required fields
    pub fn new(name: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bucket: bucket.into(),
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket_lookup: default_bucket_lookup(),
        }
    }

    /// Static credentials, if both halves are configured
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Some((access.as_str(), secret.as_str())),
            _ => None,
        }
    }

    /// Check the profile before it is stored
    pub fn validate(&self) -> Result<()> {
        if !is_valid_profile_name(&self.name) {
            return Err(Error::Config(format!(
                "Invalid profile name '{}': use letters, digits, '_' or '-'",
                self.name
            )));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::Config("Bucket name cannot be empty".into()));
        }
        if !matches!(self.bucket_lookup.as_str(), "auto" | "path" | "dns") {
            return Err(Error::Config(
                "Bucket lookup must be 'auto', 'path', or 'dns'".into(),
            ));
        }
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(Error::Config(
                "Access key and secret key must be given together".into(),
            ));
        }
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)?;
        }
        Ok(())
    }
}

fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Manager for profile operations
pub struct ProfileManager {
    config_manager: ConfigManager,
}

impl ProfileManager {
    /// Create a new ProfileManager with a specific ConfigManager
    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Create a new ProfileManager using the default config location
    pub fn new() -> Result<Self> {
        let config_manager = ConfigManager::new()?;
        Ok(Self { config_manager })
    }

    pub fn config_manager(&self) -> &ConfigManager {
        &self.config_manager
    }

    /// List all configured profiles
    pub fn list(&self) -> Result<Vec<Profile>> {
        let config = self.config_manager.load()?;
        Ok(config.profiles)
    }

    /// Get a profile by name
    pub fn get(&self, name: &str) -> Result<Profile> {
        let config = self.config_manager.load()?;
        config
            .profiles
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::NotFound(format!("profile '{name}'")))
    }

    /// Add or update a profile
    pub fn set(&self, profile: Profile) -> Result<()> {
        profile.validate()?;
        let mut config = self.config_manager.load()?;

        config.profiles.retain(|p| p.name != profile.name);
        config.profiles.push(profile);

        self.config_manager.save(&config)
    }

    /// Remove a profile
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config_manager.load()?;
        let original_len = config.profiles.len();

        config.profiles.retain(|p| p.name != name);

        if config.profiles.len() == original_len {
            return Err(Error::NotFound(format!("profile '{name}'")));
        }

        self.config_manager.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_profile_manager() -> (ProfileManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_manager = ConfigManager::with_path(config_path);
        (ProfileManager::with_config_manager(config_manager), temp_dir)
    }

    #[test]
    fn test_profile_new() {
        let profile = Profile::new("photos", "qteam-task-bucket");
        assert_eq!(profile.region, "us-east-1");
        assert_eq!(profile.bucket_lookup, "auto");
        assert!(profile.static_credentials().is_none());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_profile_validation() {
        let mut profile = Profile::new("bad name", "bucket");
        assert!(profile.validate().is_err());

        profile.name = "ok".into();
        profile.access_key = Some("key".into());
        assert!(profile.validate().is_err());

        profile.secret_key = Some("secret".into());
        assert_eq!(profile.static_credentials(), Some(("key", "secret")));
        assert!(profile.validate().is_ok());

        profile.endpoint = Some("not a url".into());
        assert!(matches!(profile.validate(), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_profile_manager_set_and_get() {
        let (manager, _temp_dir) = temp_profile_manager();

        let mut profile = Profile::new("minio", "media");
        profile.endpoint = Some("http://localhost:9000".into());
        manager.set(profile).unwrap();

        let retrieved = manager.get("minio").unwrap();
        assert_eq!(retrieved.bucket, "media");
        assert_eq!(retrieved.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_profile_manager_update_existing() {
        let (manager, _temp_dir) = temp_profile_manager();

        manager.set(Profile::new("p", "old")).unwrap();
        manager.set(Profile::new("p", "new")).unwrap();

        let profiles = manager.list().unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].bucket, "new");
    }

    #[test]
    fn test_profile_manager_remove() {
        let (manager, _temp_dir) = temp_profile_manager();

        manager.set(Profile::new("p", "b")).unwrap();
        manager.remove("p").unwrap();
        assert!(manager.list().unwrap().is_empty());

        let result = manager.remove("p");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_profile_manager_get_not_found() {
        let (manager, _temp_dir) = temp_profile_manager();
        assert!(matches!(manager.get("nope"), Err(Error::NotFound(_))));
    }
}
