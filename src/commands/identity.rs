use std::{fs, path::PathBuf};

use tracing::info;

use crate::{
    cli::IdentityTarget,
    commands::{AppContext, advise_fallback},
    console::Console,
    credentials::{
        CredentialKey, EnvFile, EnvFileOrigin, LocatedEnvFile, POWERLOOM_RPC_URL,
        SIGNER_ACCOUNT_ADDRESS, SIGNER_ACCOUNT_PRIVATE_KEY, SOURCE_RPC_URL, TELEGRAM_CHAT_ID,
        TELEGRAM_REPORTING_URL, WALLET_HOLDER_ADDRESS, scan_env_files,
    },
    error::{AppError, Result},
};

const NOT_SET: &str = "[Not Set]";

/// One namespaced credential file and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEntry {
    /// Profile name, or `[Legacy]` / `[CWD]` for files outside the profile tree
    pub owner: String,
    pub key: CredentialKey,
    pub path: PathBuf,
}

/// Every credential file across profiles, the legacy directory and the working directory
pub fn collect_identities(ctx: &AppContext) -> Result<Vec<IdentityEntry>> {
    let mut entries = Vec::new();
    for profile in ctx.store.list()? {
        for (key, path) in scan_env_files(&profile.path)? {
            entries.push(IdentityEntry {
                owner: profile.name.clone(),
                key,
                path,
            });
        }
    }

    for (key, path) in scan_env_files(&ctx.store.paths().legacy_envs_dir())? {
        entries.push(IdentityEntry {
            owner: EnvFileOrigin::Legacy.label().to_string(),
            key,
            path,
        });
    }

    for (key, path) in scan_env_files(&ctx.working_dir)? {
        let duplicate = entries
            .iter()
            .any(|entry| entry.path.file_name() == path.file_name());
        if !duplicate {
            entries.push(IdentityEntry {
                owner: EnvFileOrigin::WorkingDir.label().to_string(),
                key,
                path,
            });
        }
    }

    entries.sort_by(|a, b| {
        (&a.owner, a.key.chain(), a.key.market()).cmp(&(&b.owner, b.key.chain(), b.key.market()))
    });
    Ok(entries)
}

/// Readiness summary: "Ready", or the first two missing essentials
pub fn readiness(env: &EnvFile) -> String {
    let missing: Vec<&str> = [
        (WALLET_HOLDER_ADDRESS, "No Wallet"),
        (SIGNER_ACCOUNT_ADDRESS, "No Signer"),
        (SIGNER_ACCOUNT_PRIVATE_KEY, "No Key"),
        (SOURCE_RPC_URL, "No RPC"),
    ]
    .into_iter()
    .filter(|(key, _)| env.non_empty(key).is_none())
    .map(|(_, label)| label)
    .take(2)
    .collect();

    if missing.is_empty() {
        "Ready".to_string()
    } else {
        missing.join(", ")
    }
}

pub fn list(ctx: &AppContext, console: &mut dyn Console, profile: Option<&str>) -> Result<()> {
    ctx.ensure_structure(console)?;

    let mut entries = collect_identities(ctx)?;
    if let Some(profile) = profile {
        entries.retain(|entry| entry.owner == profile);
    }

    if entries.is_empty() {
        match profile {
            Some(profile) => {
                console.warn(&format!("No configurations found for profile '{profile}'."));
                console.info(&format!(
                    "Use 'powerloom-snapshotter-cli configure --profile {profile}' to add configurations."
                ));
            }
            None => {
                console.warn(
                    "No configurations found. Use 'powerloom-snapshotter-cli configure' to create one.",
                );
                console.info("Or use 'powerloom-snapshotter-cli profile create' to create a new profile.");
            }
        }
        return Ok(());
    }

    match profile {
        Some(profile) => console.heading(&format!("Configured Identities for Profile: {profile}")),
        None => console.heading("Configured Identities Across All Profiles"),
    }
    console.heading(&format!(
        "{:<16} {:<16} {:<14} {:<16} {}",
        "Profile", "Powerloom Chain", "Market", "Source Chain", "Status"
    ));
    for entry in &entries {
        let env = EnvFile::read(&entry.path)?;
        console.plain(&format!(
            "{:<16} {:<16} {:<14} {:<16} {}",
            entry.owner,
            entry.key.chain().to_uppercase(),
            entry.key.market().to_uppercase(),
            entry.key.source_chain().to_uppercase(),
            readiness(&env)
        ));
    }

    let has_legacy = entries.iter().any(|entry| {
        entry.owner == EnvFileOrigin::Legacy.label() || entry.owner == EnvFileOrigin::WorkingDir.label()
    });
    if has_legacy {
        console.warn(
            "\nLegacy configurations found. Run 'powerloom-snapshotter-cli profile list' to migrate them.",
        );
    }
    console.info(
        "\nUse 'powerloom-snapshotter-cli configure --profile <PROFILE>' to add configurations.",
    );
    Ok(())
}

/// Prints one credential file; the private key is only reported as set or not
pub fn show(
    ctx: &AppContext,
    console: &mut dyn Console,
    target: &IdentityTarget,
    profile: Option<&str>,
) -> Result<()> {
    let (profile_name, key, located) = locate_target(ctx, console, target, profile)?;
    let env = EnvFile::read(&located.path)?;
    let value = |name: &str| env.get(name).unwrap_or(NOT_SET).to_string();

    console.heading(&format!("\nConfiguration for {key}"));
    console.plain(&format!("Profile: {profile_name}"));
    console.plain(&format!("File: {}\n", located.path.display()));

    console.heading("Identity");
    console.plain(&format!("  Wallet Address: {}", value(WALLET_HOLDER_ADDRESS)));
    console.plain(&format!("  Signer Address: {}", value(SIGNER_ACCOUNT_ADDRESS)));
    let key_state = if env.non_empty(SIGNER_ACCOUNT_PRIVATE_KEY).is_some() {
        "[Set]"
    } else {
        NOT_SET
    };
    console.plain(&format!("  Signer Private Key: {key_state}"));

    console.heading("\nRPC Configuration");
    console.plain(&format!("  Source RPC URL: {}", value(SOURCE_RPC_URL)));
    console.plain(&format!("  Powerloom RPC URL: {}", value(POWERLOOM_RPC_URL)));

    if env.contains(TELEGRAM_CHAT_ID) || env.contains(TELEGRAM_REPORTING_URL) {
        console.heading("\nNotifications");
        if let Some(chat) = env.get(TELEGRAM_CHAT_ID) {
            console.plain(&format!("  Telegram Chat ID: {chat}"));
        }
        if let Some(url) = env.get(TELEGRAM_REPORTING_URL) {
            console.plain(&format!("  Telegram Reporting URL: {url}"));
        }
    }
    Ok(())
}

pub fn delete(
    ctx: &AppContext,
    console: &mut dyn Console,
    target: &IdentityTarget,
    profile: Option<&str>,
    force: bool,
) -> Result<()> {
    let (profile_name, key, located) = locate_target(ctx, console, target, profile)?;

    if !force {
        let confirmed = console.confirm(
            &format!(
                "Are you sure you want to delete the configuration for {key} from profile '{profile_name}'?"
            ),
            false,
        )?;
        if !confirmed {
            console.warn("Aborted.");
            return Ok(());
        }
    }

    fs::remove_file(&located.path)?;
    info!(profile = %profile_name, file = %located.path.display(), "deleted credential file");
    console.success(&format!(
        "Deleted configuration from profile '{profile_name}': {}",
        located.path.display()
    ));
    Ok(())
}

/// Resolves one credential through option, environment, working-dir `.env` and profile file
pub fn get(
    ctx: &AppContext,
    console: &mut dyn Console,
    name: &str,
    target: &IdentityTarget,
    explicit: Option<&str>,
    profile: Option<&str>,
) -> Result<()> {
    ctx.ensure_structure(console)?;
    let active = ctx.resolver().resolve(profile);
    if let Some(warning) = active.warning() {
        console.warn(&warning);
    }

    let key = target_key(target);
    let env_map = match ctx.locator().locate(&active.name, &key) {
        Some(located) => {
            advise_fallback(console, &located);
            Some(EnvFile::read(&located.path)?)
        }
        None => None,
    };

    let resolved = ctx
        .credential_lookup()
        .get_credential(name, key.chain(), explicit, env_map.as_ref())
        .ok_or_else(|| AppError::MissingCredential {
            key: name.to_string(),
            chain: key.to_string(),
        })?;

    let shown = if name.contains("PRIVATE_KEY") {
        mask(&resolved.value)
    } else {
        resolved.value.clone()
    };
    console.plain(&format!("{name}={shown}"));
    console.dim(&format!("source: {}", resolved.source.describe()));
    Ok(())
}

fn target_key(target: &IdentityTarget) -> CredentialKey {
    CredentialKey::new(&target.chain, &target.market, &target.source_chain)
}

/// Read-only resolution of the active profile plus the file for `target`
fn locate_target(
    ctx: &AppContext,
    console: &mut dyn Console,
    target: &IdentityTarget,
    profile: Option<&str>,
) -> Result<(String, CredentialKey, LocatedEnvFile)> {
    ctx.ensure_structure(console)?;
    let active = ctx.resolver().resolve(profile);
    if let Some(warning) = active.warning() {
        console.warn(&warning);
    }

    let key = target_key(target);
    match ctx.locator().locate(&active.name, &key) {
        Some(located) => {
            advise_fallback(console, &located);
            Ok((active.name, key, located))
        }
        None => {
            console.info(&format!(
                "Use 'powerloom-snapshotter-cli configure --profile {}' to create one.",
                active.name
            ));
            Err(AppError::CredentialFileNotFound(format!(
                "{key} in profile '{}'",
                active.name
            )))
        }
    }
}

/// First and last four characters, the rest hidden
fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
