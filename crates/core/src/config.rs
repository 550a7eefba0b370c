//! Layered configuration for the asset synchroniser.
//!
//! Values come from built-in defaults, then an optional TOML file in the
//! user's config directory, then `./sync-games.toml`, then `SYNC_GAMES_*`
//! environment variables.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bucket the CI pipeline pulls game builds from.
pub const DEFAULT_BUCKET: &str = "adapt2learn-api.firebasestorage.app";
/// Local output root the web build is packaged from.
pub const DEFAULT_BUILD_DIR: &str = "build";
/// Base URL of the Cloud Storage JSON API.
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
/// Prefix of environment variables overriding configuration keys.
pub const ENV_PREFIX: &str = "SYNC_GAMES";
/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sync-games.toml";

/// Where downloaded objects land under the build directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `games/<game>/versions/<version>/`
    #[default]
    Versioned,
    /// `games/<game>/`
    Flat,
}

/// How the active game directory is derived once the download finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Only the versioned directory is populated.
    #[default]
    None,
    /// Copy the entrypoint file into the game root; fail if it is absent.
    Entrypoint,
    /// Replace the game root with a full copy of the versioned tree.
    Mirror,
}

impl Activation {
    /// Lowercase name as accepted in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Activation::None => "none",
            Activation::Entrypoint => "entrypoint",
            Activation::Mirror => "mirror",
        }
    }
}

/// Runtime configuration of a sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Storage bucket holding `games/<game>/versions/<version>/` objects.
    pub bucket: String,
    /// Local output root.
    pub build_dir: PathBuf,
    /// Destination layout.
    pub layout: Layout,
    /// Post-download activation step.
    pub activation: Activation,
    /// Entrypoint file name, relative to the version directory.
    pub entrypoint: String,
    /// JSON API base URL; overridable for emulators.
    pub storage_endpoint: String,
    /// Explicit bearer token, skipping ambient credential discovery.
    pub access_token: Option<String>,
    /// Optional file receiving a copy of the log output.
    pub log_file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            layout: Layout::default(),
            activation: Activation::default(),
            entrypoint: "index.html".to_string(),
            storage_endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            access_token: None,
            log_file: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the standard locations and the environment.
    pub fn load() -> Result<Self> {
        Self::from_sources(&Self::search_paths(), Some(ENV_PREFIX))
    }

    /// Candidate configuration files, lowest precedence first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sync-games").join("config.toml"));
        }
        paths.push(PathBuf::from(LOCAL_CONFIG_FILE));
        paths
    }

    /// Merge the given optional files and, when a prefix is given, the
    /// matching environment variables over the defaults.
    pub fn from_sources(files: &[PathBuf], env_prefix: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        for path in files {
            builder = builder.add_source(File::from(path.as_path()).required(false));
        }
        if let Some(prefix) = env_prefix {
            builder = builder.add_source(Environment::with_prefix(prefix));
        }

        let config: Self = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot produce a usable build directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }

        let entrypoint = Path::new(&self.entrypoint);
        let plain = !self.entrypoint.is_empty()
            && entrypoint
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(ConfigError::InvalidEntrypoint(self.entrypoint.clone()));
        }

        if self.layout == Layout::Flat && self.activation != Activation::None {
            return Err(ConfigError::ActivationWithFlatLayout(
                self.activation.as_str(),
            ));
        }

        Ok(())
    }
}
