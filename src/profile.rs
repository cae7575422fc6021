use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    credentials::{CredentialKey, scan_env_files},
    error::{AppError, Result},
    storage::{ConfigStore, DEFAULT_PROFILE, GlobalConfig, ProfileMetadata, StorePaths},
    validation::validate_profile_name,
};

/// A profile as seen by `list`: directory facts merged with config metadata
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub is_default: bool,
    pub is_last_used: bool,
    /// Number of namespaced credential files in the profile directory
    pub config_count: usize,
    /// Absent when the config file has no entry for this directory
    pub metadata: Option<ProfileMetadata>,
}

/// Owns profile directories and their entries in the global config
#[derive(Debug, Clone)]
pub struct ProfileStore {
    paths: StorePaths,
    config: ConfigStore,
}

impl ProfileStore {
    pub fn new(paths: StorePaths) -> Self {
        let config = ConfigStore::new(paths.config_file());
        Self { paths, config }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Fresh read of the global config
    pub fn global_config(&self) -> GlobalConfig {
        self.config.load()
    }

    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.paths.profile_dir(name)
    }

    /// True iff a directory for the profile exists. Names that could leave the profiles
    /// directory never exist.
    pub fn exists(&self, name: &str) -> bool {
        validate_profile_name(name).is_ok() && self.profile_dir(name).is_dir()
    }

    /// Creates the profile directory and registers its metadata
    pub fn create(&self, name: &str, description: Option<&str>) -> Result<()> {
        validate_profile_name(name)?;
        let profile_dir = self.profile_dir(name);
        if profile_dir.exists() {
            return Err(AppError::ProfileExists(name.to_string()));
        }

        fs::create_dir_all(&profile_dir)?;
        self.config
            .update(|config| config.register_profile(name, description))?;
        info!(profile = name, "created profile");
        Ok(())
    }

    /// Removes the profile directory and its config entry. `default` needs `force`.
    pub fn delete(&self, name: &str, force: bool) -> Result<()> {
        if name == DEFAULT_PROFILE && !force {
            return Err(AppError::ProtectedProfile(name.to_string()));
        }
        if !self.exists(name) {
            return Err(AppError::ProfileNotFound(name.to_string()));
        }

        fs::remove_dir_all(self.profile_dir(name))?;
        self.config.update(|config| config.forget_profile(name))?;
        info!(profile = name, "deleted profile");
        Ok(())
    }

    /// Deep-copies `source` into a new profile `destination`
    pub fn copy(&self, source: &str, destination: &str) -> Result<()> {
        validate_profile_name(destination)?;
        if !self.exists(source) {
            return Err(AppError::ProfileNotFound(source.to_string()));
        }
        let dest_dir = self.profile_dir(destination);
        if dest_dir.exists() {
            return Err(AppError::ProfileExists(destination.to_string()));
        }

        copy_dir_recursive(&self.profile_dir(source), &dest_dir)?;
        let description = format!(
            "Copied from {source} on {}",
            chrono::Local::now().format("%Y-%m-%d")
        );
        self.config
            .update(|config| config.register_profile(destination, Some(&description)))?;
        info!(source, destination, "copied profile");
        Ok(())
    }

    /// All profile directories, sorted by name, annotated with config metadata
    pub fn list(&self) -> Result<Vec<ProfileDescriptor>> {
        let profiles_dir = self.paths.profiles_dir();
        if !profiles_dir.is_dir() {
            return Ok(Vec::new());
        }

        let config = self.config.load();
        let mut profiles = Vec::new();
        for entry in fs::read_dir(&profiles_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            profiles.push(ProfileDescriptor {
                is_default: name == config.default_profile,
                is_last_used: name == config.last_used_profile,
                config_count: scan_env_files(&path)?.len(),
                metadata: config.profiles.get(&name).cloned(),
                name,
                path,
            });
        }

        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = profiles.len(), "listed profiles");
        Ok(profiles)
    }

    /// Config metadata for a profile, if recorded
    pub fn metadata(&self, name: &str) -> Option<ProfileMetadata> {
        self.config.load().profiles.get(name).cloned()
    }

    /// Namespaced credential files of a profile, sorted by key
    pub fn credential_files(&self, name: &str) -> Result<Vec<(CredentialKey, PathBuf)>> {
        if !self.exists(name) {
            return Err(AppError::ProfileNotFound(name.to_string()));
        }
        scan_env_files(&self.profile_dir(name))
    }

    pub fn set_default(&self, name: &str) -> Result<()> {
        if !self.exists(name) {
            return Err(AppError::ProfileNotFound(name.to_string()));
        }
        self.config
            .update(|config| config.default_profile = name.to_string())?;
        info!(profile = name, "set default profile");
        Ok(())
    }

    pub fn set_last_used(&self, name: &str) -> Result<()> {
        self.config
            .update(|config| config.last_used_profile = name.to_string())?;
        debug!(profile = name, "recorded last used profile");
        Ok(())
    }
}

/// Copies a directory tree, creating `destination`
fn copy_dir_recursive(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn store() -> (TempDir, ProfileStore) {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(StorePaths::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn create_then_exists_and_duplicate_fails() {
        let (_dir, store) = store();
        for name in ["alpha", "Beta_2", "ops-main"] {
            store.create(name, None).unwrap();
            assert!(store.exists(name));
            assert!(matches!(
                store.create(name, None),
                Err(AppError::ProfileExists(n)) if n == name
            ));
        }
        assert_eq!(store.metadata("alpha").unwrap().description, "Profile: alpha");
    }

    #[test]
    fn create_rejects_invalid_names() {
        let (_dir, store) = store();
        for name in ["../escape", "a\\b", "dotted.name", ""] {
            assert!(matches!(
                store.create(name, None),
                Err(AppError::InvalidName(_))
            ));
        }
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn delete_default_requires_force() {
        let (_dir, store) = store();
        store.create(DEFAULT_PROFILE, Some("Default profile")).unwrap();

        assert!(matches!(
            store.delete(DEFAULT_PROFILE, false),
            Err(AppError::ProtectedProfile(_))
        ));
        assert!(store.exists(DEFAULT_PROFILE));

        store.delete(DEFAULT_PROFILE, true).unwrap();
        assert!(!store.exists(DEFAULT_PROFILE));
    }

    #[test]
    fn delete_missing_profile_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.delete("ghost", false),
            Err(AppError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn delete_reverts_default_and_last_used() {
        let (_dir, store) = store();
        store.create("ops", None).unwrap();
        store.set_default("ops").unwrap();
        store.set_last_used("ops").unwrap();

        store.delete("ops", false).unwrap();
        let config = store.global_config();
        assert_eq!(config.default_profile, DEFAULT_PROFILE);
        assert_eq!(config.last_used_profile, DEFAULT_PROFILE);
        assert!(!config.profiles.contains_key("ops"));
    }

    #[test]
    fn copy_duplicates_tree_and_leaves_source() {
        let (_dir, store) = store();
        store.create("src", Some("source")).unwrap();
        let file = store.profile_dir("src").join(".env.mainnet.uniswapv2.eth");
        fs::write(&file, "WALLET_HOLDER_ADDRESS=0xABC").unwrap();
        fs::create_dir(store.profile_dir("src").join("nested")).unwrap();
        fs::write(store.profile_dir("src").join("nested").join("x"), "y").unwrap();

        store.copy("src", "dst").unwrap();

        let copied = store.profile_dir("dst").join(".env.mainnet.uniswapv2.eth");
        assert_eq!(fs::read_to_string(copied).unwrap(), "WALLET_HOLDER_ADDRESS=0xABC");
        assert!(store.profile_dir("dst").join("nested").join("x").is_file());
        assert!(file.is_file());
        assert!(store
            .metadata("dst")
            .unwrap()
            .description
            .starts_with("Copied from src on "));
        assert_eq!(store.metadata("src").unwrap().description, "source");
    }

    #[test]
    fn copy_failures() {
        let (_dir, store) = store();
        store.create("a", None).unwrap();
        store.create("b", None).unwrap();
        assert!(matches!(store.copy("missing", "c"), Err(AppError::ProfileNotFound(_))));
        assert!(matches!(store.copy("a", "b"), Err(AppError::ProfileExists(_))));
        assert!(matches!(store.copy("a", "c.d"), Err(AppError::InvalidName(_))));
    }

    #[test]
    fn list_merges_scan_with_metadata() {
        let (_dir, store) = store();
        store.create("zeta", Some("last")).unwrap();
        store.create(DEFAULT_PROFILE, Some("Default profile")).unwrap();
        fs::create_dir_all(store.profile_dir("manual")).unwrap();
        fs::write(store.profile_dir("zeta").join(".env.mainnet.uniswapv2.eth"), "A=1").unwrap();
        fs::write(store.profile_dir("zeta").join(".env.devnet.aavev3.eth"), "A=1").unwrap();
        fs::write(store.paths().profiles_dir().join("stray-file"), "").unwrap();
        store.set_last_used("zeta").unwrap();
        // metadata without a directory is ignored
        store
            .config()
            .update(|c| c.register_profile("orphan", None))
            .unwrap();

        let profiles = store.list().unwrap();
        let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["default", "manual", "zeta"]);

        assert!(profiles[0].is_default);
        assert!(profiles[1].metadata.is_none());
        assert_eq!(profiles[2].config_count, 2);
        assert!(profiles[2].is_last_used);
        assert_eq!(profiles[2].metadata.as_ref().unwrap().description, "last");
    }

    #[test]
    fn set_default_requires_existing_profile() {
        let (_dir, store) = store();
        assert!(matches!(store.set_default("nope"), Err(AppError::ProfileNotFound(_))));
        store.create("ops", None).unwrap();
        store.set_default("ops").unwrap();
        assert_eq!(store.global_config().default_profile, "ops");
    }
}
