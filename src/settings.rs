//! Settings persistence
//!
//! Stored as JSON in the platform-specific config folder:
//! - Linux: ~/.config/cos-access/settings.json
//! - Windows: %APPDATA%/cos-access/settings.json
//! - macOS: ~/Library/Application Support/cos-access/settings.json
//!
//! Every field has a default, so a missing or partial file is fine.

use crate::cos::client::{ClientOptions, DEFAULT_SIGNING_REGION};
use crate::cos::credentials::ServiceCredential;
use crate::cos::token::DEFAULT_IAM_TOKEN_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Endpoint used before any bucket has been located
pub const DEFAULT_ENDPOINT: &str = "https://s3.us.cloud-object-storage.appdomain.cloud";

/// Endpoint directory used when neither settings nor the credential name one
pub const DEFAULT_DIRECTORY_URL: &str =
    "https://control.cloud-object-storage.cloud.ibm.com/v2/endpoints";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Service credential JSON file
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,

    #[serde(default = "default_endpoint")]
    pub default_endpoint: String,

    /// Overrides the `endpoints` URL of the service credential
    #[serde(default)]
    pub directory_url: Option<String>,

    #[serde(default = "default_iam_token_url")]
    pub iam_token_url: String,

    #[serde(default = "default_signing_region")]
    pub signing_region: String,

    #[serde(default)]
    pub force_path_style: bool,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_directory_timeout_secs")]
    pub directory_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_iam_token_url() -> String {
    DEFAULT_IAM_TOKEN_URL.to_string()
}

fn default_signing_region() -> String {
    DEFAULT_SIGNING_REGION.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_directory_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_path: None,
            default_endpoint: default_endpoint(),
            directory_url: None,
            iam_token_url: default_iam_token_url(),
            signing_region: default_signing_region(),
            force_path_style: false,
            request_timeout_secs: default_request_timeout_secs(),
            directory_timeout_secs: default_directory_timeout_secs(),
        }
    }
}

impl Settings {
    /// Load settings from the config folder, returning defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path()?)
    }

    /// Load settings from a specific file, returning defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Settings file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;

        let settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {:?}", path))?;

        tracing::info!(
            "Loaded settings: endpoint={}, directory={:?}, credentials={:?}",
            settings.default_endpoint,
            settings.directory_url,
            settings.credentials_path
        );

        Ok(settings)
    }

    /// Save settings to the config folder
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;

        tracing::debug!("Saved settings to {:?}", path);

        Ok(())
    }

    /// Get the path to the settings file
    pub fn settings_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "github.n-orlov", "cos-access")
            .context("Failed to determine settings directory")?;

        Ok(proj_dirs.config_dir().join("settings.json"))
    }

    /// Directory URL to fetch: settings override, then the credential, then the public default
    pub fn directory_url_for(&self, credential: &ServiceCredential) -> String {
        self.directory_url
            .clone()
            .or_else(|| credential.endpoints.clone().filter(|url| !url.is_empty()))
            .unwrap_or_else(|| DEFAULT_DIRECTORY_URL.to_string())
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            signing_region: self.signing_region.clone(),
            force_path_style: self.force_path_style,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            iam_token_url: self.iam_token_url.clone(),
        }
    }
}
