use crate::cos::CosConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// COS profile with account credentials and addressing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// API secret id
    pub secret_id: String,

    /// API secret key
    pub secret_key: String,

    /// Application id appended to bucket names
    pub app_id: String,

    /// COS region (default: ap-guangzhou)
    #[serde(default = "default_region")]
    pub region: String,

    /// URL scheme (default: https)
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Domain suffix for service and bucket hosts (default: myqcloud.com)
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "ap-guangzhou".to_string()
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_domain() -> String {
    "myqcloud.com".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Profile {
    /// Convert into the settings consumed by `CosClient`
    pub fn to_client_config(&self) -> CosConfig {
        CosConfig {
            secret_id: self.secret_id.clone(),
            secret_key: self.secret_key.clone(),
            app_id: self.app_id.clone(),
            region: self.region.clone(),
            scheme: self.scheme.clone(),
            domain: self.domain.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Named profiles for different accounts or regions
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Profile used when none is requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
}

impl Config {
    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else {
            self.profiles.values().next()
        }
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Load configuration from environment variables
///
/// - COS_SECRET_ID / TENCENTCLOUD_SECRET_ID
/// - COS_SECRET_KEY / TENCENTCLOUD_SECRET_KEY
/// - COS_APP_ID
/// - COS_REGION (optional, defaults to ap-guangzhou)
/// - COS_SCHEME (optional, defaults to https)
/// - COS_DOMAIN (optional, defaults to myqcloud.com)
/// - COS_TIMEOUT (optional, seconds)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let secret_id = std::env::var("COS_SECRET_ID")
        .or_else(|_| std::env::var("TENCENTCLOUD_SECRET_ID"))
        .context("Neither COS_SECRET_ID nor TENCENTCLOUD_SECRET_ID environment variable is set")?;

    let secret_key = std::env::var("COS_SECRET_KEY")
        .or_else(|_| std::env::var("TENCENTCLOUD_SECRET_KEY"))
        .context("Neither COS_SECRET_KEY nor TENCENTCLOUD_SECRET_KEY environment variable is set")?;

    let app_id = std::env::var("COS_APP_ID").context("COS_APP_ID environment variable not set")?;
    if app_id.trim().is_empty() {
        anyhow::bail!("COS_APP_ID is empty");
    }

    let mut profile = Profile {
        secret_id,
        secret_key,
        app_id,
        region: std::env::var("COS_REGION").unwrap_or_else(|_| default_region()),
        scheme: std::env::var("COS_SCHEME").unwrap_or_else(|_| default_scheme()),
        domain: std::env::var("COS_DOMAIN").unwrap_or_else(|_| default_domain()),
        timeout_secs: default_timeout_secs(),
    };

    if let Ok(timeout) = std::env::var("COS_TIMEOUT") {
        profile.timeout_secs = timeout
            .parse()
            .with_context(|| format!("COS_TIMEOUT is not a number of seconds: {}", timeout))?;
    }

    let mut config = Config::default();
    config.profiles.insert("default".to_string(), profile);
    config.default_profile = Some("default".to_string());

    Ok(config)
}

/// Load configuration from file or environment
///
/// # Arguments
/// * `config_path` - Optional path to YAML config file
/// * `profile_name` - Optional profile name to make the default
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}
