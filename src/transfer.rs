//! Profile export and import as JSON templates.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    console::{Console, Question},
    credentials::{
        CONNECTION_REFRESH_INTERVAL_SEC, CredentialKey, EnvFile, LITE_NODE_BRANCH,
        LOCAL_COLLECTOR_IMAGE_TAG, MAX_STREAM_POOL_SIZE, POWERLOOM_RPC_URL,
        SIGNER_ACCOUNT_ADDRESS, SIGNER_ACCOUNT_PRIVATE_KEY, SOURCE_RPC_URL, TELEGRAM_CHAT_ID,
        TELEGRAM_MESSAGE_THREAD_ID, TELEGRAM_NOTIFICATION_COOLDOWN, TELEGRAM_REPORTING_URL,
        WALLET_HOLDER_ADDRESS,
    },
    error::{AppError, Result},
    profile::ProfileStore,
    storage::ProfileMetadata,
    validation::validate_profile_name,
};

/// Settings that are always exported
pub const SAFE_KEYS: [&str; 8] = [
    TELEGRAM_NOTIFICATION_COOLDOWN,
    TELEGRAM_MESSAGE_THREAD_ID,
    MAX_STREAM_POOL_SIZE,
    CONNECTION_REFRESH_INTERVAL_SEC,
    LITE_NODE_BRANCH,
    LOCAL_COLLECTOR_IMAGE_TAG,
    POWERLOOM_RPC_URL,
    TELEGRAM_REPORTING_URL,
];

/// Settings exported only on request
pub const CREDENTIAL_KEYS: [&str; 5] = [
    WALLET_HOLDER_ADDRESS,
    SIGNER_ACCOUNT_ADDRESS,
    SIGNER_ACCOUNT_PRIVATE_KEY,
    SOURCE_RPC_URL,
    TELEGRAM_CHAT_ID,
];

const IMPORTED_PROFILE_NAME: &str = "imported";
const IMPORTED_DESCRIPTION: &str = "Imported profile";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileExport {
    #[serde(default)]
    pub profile_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProfileMetadata>,
    #[serde(default)]
    pub configurations: Vec<ExportedConfiguration>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExportedConfiguration {
    pub chain: String,
    pub market: String,
    pub source_chain: String,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl ExportedConfiguration {
    pub fn key(&self) -> CredentialKey {
        CredentialKey::new(&self.chain, &self.market, &self.source_chain)
    }
}

/// Builds the export document for a profile
pub fn export_profile(
    store: &ProfileStore,
    name: &str,
    include_credentials: bool,
) -> Result<ProfileExport> {
    let mut configurations = Vec::new();
    for (key, path) in store.credential_files(name)? {
        let env = EnvFile::read(&path)?;
        let exported_keys = SAFE_KEYS
            .iter()
            .chain(CREDENTIAL_KEYS.iter().filter(|_| include_credentials));
        let settings = exported_keys
            .filter_map(|k| env.get(k).map(|value| (k.to_string(), value.to_string())))
            .collect();

        configurations.push(ExportedConfiguration {
            chain: key.chain().to_uppercase(),
            market: key.market().to_uppercase(),
            source_chain: key.source_chain().to_uppercase(),
            settings,
        });
    }

    Ok(ProfileExport {
        profile_name: name.to_string(),
        metadata: store.metadata(name),
        configurations,
    })
}

/// Reads and parses an export file
pub fn read_export(path: &Path) -> Result<ProfileExport> {
    if !path.is_file() {
        return Err(AppError::Validation(format!(
            "file '{}' does not exist",
            path.display()
        )));
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Outcome of one imported configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(CredentialKey),
    /// A file for the key already exists and merging was not requested
    SkippedExisting(CredentialKey),
    /// Nothing to write
    SkippedEmpty(CredentialKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub profile: String,
    pub created_profile: bool,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ImportOutcome::Imported(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.imported()
    }
}

/// Writes the configurations of `export` into a profile.
///
/// The profile name is `name_override`, else the one in the document. Without `merge` the
/// profile must not exist yet. Missing wallet addresses are asked for; a blank answer skips.
pub fn import_profile(
    store: &ProfileStore,
    console: &mut dyn Console,
    export: &ProfileExport,
    name_override: Option<&str>,
    merge: bool,
) -> Result<ImportReport> {
    let profile = name_override
        .map(str::to_string)
        .or_else(|| Some(export.profile_name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| IMPORTED_PROFILE_NAME.to_string());
    validate_profile_name(&profile)?;

    let exists = store.exists(&profile);
    if exists && !merge {
        return Err(AppError::ProfileExists(profile));
    }
    if !exists {
        let description = export
            .metadata
            .as_ref()
            .map(|m| m.description.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(IMPORTED_DESCRIPTION);
        store.create(&profile, Some(description))?;
    }

    let profile_dir = store.profile_dir(&profile);
    let mut outcomes = Vec::new();
    for configuration in &export.configurations {
        let key = configuration.key();
        let env_path = profile_dir.join(key.file_name());
        if env_path.exists() && !merge {
            outcomes.push(ImportOutcome::SkippedExisting(key));
            continue;
        }

        let mut env: EnvFile = configuration
            .settings
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !configuration.settings.contains_key(WALLET_HOLDER_ADDRESS) {
            let question = Question::new(format!(
                "Enter wallet address for {key} (or press Enter to skip)"
            ))
            .with_default("");
            let wallet = console.ask(&question)?;
            if !wallet.trim().is_empty() {
                env.insert(WALLET_HOLDER_ADDRESS, wallet.trim());
            }
        }

        if env.is_empty() {
            outcomes.push(ImportOutcome::SkippedEmpty(key));
            continue;
        }
        env.write(&env_path)?;
        info!(profile = %profile, configuration = %key, "imported configuration");
        outcomes.push(ImportOutcome::Imported(key));
    }

    Ok(ImportReport {
        profile,
        created_profile: !exists,
        outcomes,
    })
}
