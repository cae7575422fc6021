//! Move from the flat `envs/` layout to per-profile directories.
//!
//! Migration runs once, the first time the profile structure is needed, and is gated only on
//! whether `profiles/` exists. There is no completion marker: if a run is interrupted after
//! `profiles/` was created, files still left in `envs/` are never picked up again. They remain
//! readable through the legacy fallback of [`crate::credentials::EnvFileLocator`].

use std::{fs, path::Path};

use tracing::{info, warn};

use crate::{
    credentials::CredentialKey,
    error::{AppError, Result},
    profile::ProfileStore,
    storage::DEFAULT_PROFILE,
};

const DEFAULT_DESCRIPTION: &str = "Default profile";
const MIGRATED_DESCRIPTION: &str = "Migrated from legacy configuration";

/// What `ensure_profile_structure` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureChange {
    /// Nothing to do
    Unchanged,
    /// Fresh install: created `profiles/` and an empty `default` profile
    Initialized,
    /// Legacy files were moved into the `default` profile
    Migrated { files: Vec<String> },
    /// `profiles/` existed but `default` was missing and was recreated
    DefaultRecreated,
}

/// Makes sure the profile structure exists, migrating the legacy layout when needed
pub fn ensure_profile_structure(store: &ProfileStore) -> Result<StructureChange> {
    if !store.paths().profiles_dir().exists() {
        return migrate_legacy(store);
    }
    if !store.exists(DEFAULT_PROFILE) {
        store.create(DEFAULT_PROFILE, Some(DEFAULT_DESCRIPTION))?;
        return Ok(StructureChange::DefaultRecreated);
    }
    Ok(StructureChange::Unchanged)
}

/// Moves every legacy namespaced credential file into the `default` profile.
///
/// Files are renamed, not copied. On an I/O error the files already moved stay moved and
/// the error reports how many there were.
pub fn migrate_legacy(store: &ProfileStore) -> Result<StructureChange> {
    let paths = store.paths();
    if paths.profiles_dir().exists() {
        return Ok(StructureChange::Unchanged);
    }

    let legacy_dir = paths.legacy_envs_dir();
    if !legacy_dir.is_dir() {
        fs::create_dir_all(paths.profiles_dir())?;
        store.create(DEFAULT_PROFILE, Some(DEFAULT_DESCRIPTION))?;
        return Ok(StructureChange::Initialized);
    }

    info!(legacy_dir = %legacy_dir.display(), "migrating legacy configurations");
    let default_dir = paths.profile_dir(DEFAULT_PROFILE);
    fs::create_dir_all(&default_dir)?;

    let moved = move_credential_files(&legacy_dir, &default_dir)?;

    store.config().update(|config| {
        config.register_profile(DEFAULT_PROFILE, Some(MIGRATED_DESCRIPTION));
        config.default_profile = DEFAULT_PROFILE.to_string();
    })?;

    if moved.is_empty() {
        warn!("legacy directory held no configurations");
    }
    Ok(StructureChange::Migrated { files: moved })
}

/// Renames the namespaced credential files of `source_dir` into `target_dir`, in name order.
///
/// Returns the moved file names. A failed rename stops the run with
/// [`AppError::Migration`]; files moved before it are not put back.
fn move_credential_files(source_dir: &Path, target_dir: &Path) -> Result<Vec<String>> {
    let mut moved: Vec<String> = Vec::new();
    let migration_error = |moved: &Vec<String>, source: std::io::Error| AppError::Migration {
        moved: moved.len(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs::read_dir(source_dir).map_err(|e| migration_error(&moved, e))? {
        let entry = entry.map_err(|e| migration_error(&moved, e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if CredentialKey::from_file_name(&file_name).is_some() && entry.path().is_file() {
            candidates.push(file_name);
        }
    }
    candidates.sort();

    for file_name in candidates {
        fs::rename(source_dir.join(&file_name), target_dir.join(&file_name))
            .map_err(|e| migration_error(&moved, e))?;
        info!(file = %file_name, "migrated legacy configuration");
        moved.push(file_name);
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorePaths;
    use tempfile::{TempDir, tempdir};

    fn store() -> (TempDir, ProfileStore) {
        let dir = tempdir().unwrap();
        let store = ProfileStore::new(StorePaths::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn fresh_install_creates_empty_default() {
        let (_dir, store) = store();
        assert_eq!(
            ensure_profile_structure(&store).unwrap(),
            StructureChange::Initialized
        );
        assert!(store.exists(DEFAULT_PROFILE));
        assert_eq!(
            store.metadata(DEFAULT_PROFILE).unwrap().description,
            DEFAULT_DESCRIPTION
        );
        assert_eq!(
            ensure_profile_structure(&store).unwrap(),
            StructureChange::Unchanged
        );
    }

    #[test]
    fn legacy_files_are_moved_into_default_once() {
        let (_dir, store) = store();
        let legacy = store.paths().legacy_envs_dir();
        fs::create_dir_all(&legacy).unwrap();
        fs::write(
            legacy.join(".env.mainnet.uniswapv2.eth"),
            "WALLET_HOLDER_ADDRESS=0xABC",
        )
        .unwrap();
        fs::write(legacy.join("README"), "keep me").unwrap();
        fs::write(legacy.join(".env.mainnet.uniswapv2.eth.bak"), "OLD=1").unwrap();

        let change = ensure_profile_structure(&store).unwrap();
        assert_eq!(
            change,
            StructureChange::Migrated {
                files: vec![".env.mainnet.uniswapv2.eth".to_string()]
            }
        );

        let migrated = store
            .profile_dir(DEFAULT_PROFILE)
            .join(".env.mainnet.uniswapv2.eth");
        assert_eq!(
            fs::read_to_string(migrated).unwrap(),
            "WALLET_HOLDER_ADDRESS=0xABC"
        );
        assert!(!legacy.join(".env.mainnet.uniswapv2.eth").exists());
        assert!(legacy.join("README").exists());
        assert!(legacy.join(".env.mainnet.uniswapv2.eth.bak").exists());

        let config = store.global_config();
        assert_eq!(config.default_profile, DEFAULT_PROFILE);
        assert_eq!(
            config.profiles[DEFAULT_PROFILE].description,
            MIGRATED_DESCRIPTION
        );

        // gated on the profiles directory: later legacy files are left alone
        fs::write(legacy.join(".env.devnet.aavev3.eth"), "A=1").unwrap();
        assert_eq!(
            ensure_profile_structure(&store).unwrap(),
            StructureChange::Unchanged
        );
        assert!(legacy.join(".env.devnet.aavev3.eth").exists());
    }

    #[test]
    fn empty_legacy_directory_still_registers_default() {
        let (_dir, store) = store();
        fs::create_dir_all(store.paths().legacy_envs_dir()).unwrap();
        assert_eq!(
            ensure_profile_structure(&store).unwrap(),
            StructureChange::Migrated { files: vec![] }
        );
        assert!(store.exists(DEFAULT_PROFILE));
    }

    #[test]
    fn force_deleted_default_is_recreated_empty() {
        let (_dir, store) = store();
        ensure_profile_structure(&store).unwrap();
        fs::write(
            store.profile_dir(DEFAULT_PROFILE).join(".env.mainnet.uniswapv2.eth"),
            "A=1",
        )
        .unwrap();

        store.delete(DEFAULT_PROFILE, true).unwrap();
        assert_eq!(
            ensure_profile_structure(&store).unwrap(),
            StructureChange::DefaultRecreated
        );
        assert!(store.exists(DEFAULT_PROFILE));
        assert!(store.credential_files(DEFAULT_PROFILE).unwrap().is_empty());
    }

    #[test]
    fn failed_rename_reports_files_already_moved() {
        let dir = tempdir().unwrap();
        let legacy = dir.path().join("envs");
        let target = dir.path().join("default");
        fs::create_dir_all(&legacy).unwrap();
        for name in [
            ".env.devnet.aavev3.eth",
            ".env.mainnet.uniswapv2.eth",
            ".env.mainnet.uniswapv3.eth",
        ] {
            fs::write(legacy.join(name), "A=1").unwrap();
        }
        // a non-empty directory in the way of the second file
        let blocker = target.join(".env.mainnet.uniswapv2.eth");
        fs::create_dir_all(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let err = move_credential_files(&legacy, &target).unwrap_err();
        assert!(matches!(err, AppError::Migration { moved: 1, .. }));
        assert_eq!(
            err.hint(),
            Some("Please manually backup your configurations before retrying.")
        );

        assert!(target.join(".env.devnet.aavev3.eth").is_file());
        assert!(!legacy.join(".env.devnet.aavev3.eth").exists());
        assert!(legacy.join(".env.mainnet.uniswapv2.eth").is_file());
        assert!(legacy.join(".env.mainnet.uniswapv3.eth").is_file());
        assert!(!target.join(".env.mainnet.uniswapv3.eth").exists());
    }
}
