use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, Result};

/// Name of the profile every installation falls back to
pub const DEFAULT_PROFILE: &str = "default";

/// Configuration root in the user's home directory
const CLI_CONFIG_DIR: &str = ".powerloom-snapshotter-cli";
const PROFILES_DIR: &str = "profiles";
const LEGACY_ENVS_DIR: &str = "envs";
const CONFIG_FILE: &str = "config.json";

/// Filesystem layout of the profile store, rooted at one configuration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Uses the explicit root when given, otherwise the directory under home
    pub fn resolve(root_override: Option<PathBuf>) -> Result<Self> {
        match root_override {
            Some(root) => Ok(Self::new(root)),
            None => {
                let home_dir: PathBuf = dirs::home_dir().ok_or(AppError::HomeDirNotFound)?;
                Ok(Self::new(home_dir.join(CLI_CONFIG_DIR)))
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(PROFILES_DIR)
    }

    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(name)
    }

    /// Pre-profile flat credential directory
    pub fn legacy_envs_dir(&self) -> PathBuf {
        self.root.join(LEGACY_ENVS_DIR)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }
}

/// Metadata recorded for a profile in the global config
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileMetadata {
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub description: String,
}

impl ProfileMetadata {
    pub fn now(description: impl Into<String>) -> Self {
        Self {
            created: timestamp_now(),
            description: description.into(),
        }
    }
}

/// Global CLI configuration persisted as `config.json`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub default_profile: String,
    pub last_used_profile: String,
    pub profiles: BTreeMap<String, ProfileMetadata>,
    /// Keys written by other tools, carried through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_profile: DEFAULT_PROFILE.to_string(),
            last_used_profile: DEFAULT_PROFILE.to_string(),
            profiles: BTreeMap::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl GlobalConfig {
    /// Records metadata for a profile, replacing any previous entry
    pub fn register_profile(&mut self, name: &str, description: Option<&str>) {
        let description = description
            .map(str::to_string)
            .unwrap_or_else(|| format!("Profile: {name}"));
        self.profiles
            .insert(name.to_string(), ProfileMetadata::now(description));
    }

    /// Removes a profile entry. Default and last-used references to it revert to `default`.
    pub fn forget_profile(&mut self, name: &str) -> bool {
        if self.default_profile == name {
            self.default_profile = DEFAULT_PROFILE.to_string();
        }
        if self.last_used_profile == name {
            self.last_used_profile = DEFAULT_PROFILE.to_string();
        }
        self.profiles.remove(name).is_some()
    }
}

/// Handle on the `config.json` file. Every mutation is a full read-modify-write.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the config. A missing or unreadable file yields the default document.
    pub fn load(&self) -> GlobalConfig {
        if !self.path.exists() {
            return GlobalConfig::default();
        }

        let file_contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read config file");
                return GlobalConfig::default();
            }
        };

        if file_contents.trim().is_empty() {
            return GlobalConfig::default();
        }

        match serde_json::from_str(&file_contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to parse config file");
                GlobalConfig::default()
            }
        }
    }

    /// Writes the whole document through a temporary sibling file and a rename
    pub fn save(&self, config: &GlobalConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json: String = serde_json::to_string_pretty(config)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), "saved global config");
        Ok(())
    }

    /// Loads a fresh copy, applies `change` and writes the result back
    pub fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut GlobalConfig) -> T,
    {
        let mut config = self.load();
        let output = change(&mut config);
        self.save(&config)?;
        Ok(output)
    }
}

/// Local timestamp in the ISO-8601 form stored in `config.json`
pub fn timestamp_now() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
