use std::{collections::BTreeMap, fs, path::Path};

use crate::{
    commands::AppContext,
    console::Console,
    error::{AppError, Result},
    storage::DEFAULT_PROFILE,
    transfer::{ImportOutcome, export_profile, import_profile, read_export},
};

const CLI_NAME: &str = "powerloom-snapshotter-cli";

/// Prints every profile with its status, configuration count and metadata
pub fn list(ctx: &AppContext, console: &mut dyn Console) -> Result<()> {
    ctx.ensure_structure(console)?;

    let profiles = ctx.store.list()?;
    if profiles.is_empty() {
        console.warn(&format!(
            "No profiles found. Use '{CLI_NAME} profile create' to create one."
        ));
        return Ok(());
    }

    console.heading("Available Profiles");
    console.heading(&format!(
        "{:<20} {:>14}  {:<22} {:<10}  {}",
        "Profile Name", "Configurations", "Status", "Created", "Description"
    ));
    for profile in &profiles {
        let mut status_parts = Vec::new();
        if profile.is_default {
            status_parts.push("Default");
        }
        if profile.is_last_used {
            status_parts.push("Last Used");
        }
        let status = if status_parts.is_empty() {
            "-".to_string()
        } else {
            status_parts.join(" | ")
        };

        let (created, description) = match &profile.metadata {
            Some(metadata) => (format_created(&metadata.created), metadata.description.clone()),
            None => ("Unknown".to_string(), String::new()),
        };
        console.plain(&format!(
            "{:<20} {:>14}  {:<22} {:<10}  {}",
            profile.name, profile.config_count, status, created, description
        ));
    }

    console.info(&format!(
        "\nUse '{CLI_NAME} configure --profile <name>' to add configurations to a profile."
    ));
    Ok(())
}

pub fn create(
    ctx: &AppContext,
    console: &mut dyn Console,
    name: &str,
    description: Option<&str>,
) -> Result<()> {
    ctx.ensure_structure(console)?;
    ctx.store.create(name, description)?;
    console.success(&format!("Created profile: {name}"));
    console.info(&format!(
        "Use '{CLI_NAME} configure --profile {name}' to add configurations."
    ));
    Ok(())
}

/// Deletes a profile after confirmation. The default profile is never deleted from here.
pub fn delete(ctx: &AppContext, console: &mut dyn Console, name: &str, force: bool) -> Result<()> {
    ctx.ensure_structure(console)?;

    if name == DEFAULT_PROFILE {
        return Err(AppError::ProtectedProfile(name.to_string()));
    }
    let config_count = ctx.store.credential_files(name)?.len();

    if !force {
        let mut warning_msg = format!("Are you sure you want to delete profile '{name}'?");
        if config_count > 0 {
            warning_msg.push_str(&format!(
                " This will delete {config_count} configuration(s)."
            ));
        }
        if !console.confirm(&warning_msg, false)? {
            console.warn("Aborted.");
            return Ok(());
        }
    }

    ctx.store.delete(name, false)?;
    if config_count > 0 {
        console.success(&format!(
            "Deleted profile '{name}' and {config_count} configuration(s)."
        ));
    } else {
        console.success(&format!("Deleted profile: {name}"));
    }
    Ok(())
}

pub fn copy(
    ctx: &AppContext,
    console: &mut dyn Console,
    source: &str,
    destination: &str,
) -> Result<()> {
    ctx.ensure_structure(console)?;
    ctx.store.copy(source, destination)?;
    console.success(&format!(
        "Copied profile from '{source}' to '{destination}'"
    ));
    Ok(())
}

pub fn set_default(ctx: &AppContext, console: &mut dyn Console, name: &str) -> Result<()> {
    ctx.ensure_structure(console)?;
    ctx.store.set_default(name)?;
    console.success(&format!("Set '{name}' as the default profile."));
    console.info("Commands without --profile will now use this profile.");
    Ok(())
}

/// Records a profile as last used
pub fn use_profile(ctx: &AppContext, console: &mut dyn Console, name: &str) -> Result<()> {
    ctx.ensure_structure(console)?;
    if !ctx.store.exists(name) {
        return Err(AppError::ProfileNotFound(name.to_string()));
    }
    ctx.store.set_last_used(name)?;
    console.success(&format!("Now using profile '{name}'."));
    Ok(())
}

/// Shows metadata and configurations grouped by chain and market
pub fn show(ctx: &AppContext, console: &mut dyn Console, name: &str) -> Result<()> {
    ctx.ensure_structure(console)?;

    let files = ctx.store.credential_files(name)?;
    let config = ctx.store.global_config();

    let mut configs: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for (key, _) in &files {
        configs
            .entry(key.chain().to_uppercase())
            .or_default()
            .entry(key.market().to_uppercase())
            .or_default()
            .push(key.source_chain().to_uppercase());
    }

    console.heading(&format!("\nProfile: {name}"));
    console.plain(&format!("Path: {}", ctx.store.profile_dir(name).display()));
    if config.default_profile == name {
        console.success("Status: Default Profile");
    }
    if config.last_used_profile == name {
        console.dim("Status: Last Used");
    }
    if let Some(metadata) = config.profiles.get(name) {
        console.plain(&format!("Created: {}", metadata.created));
        console.plain(&format!("Description: {}", metadata.description));
    }

    if configs.is_empty() {
        console.warn("\nNo configurations in this profile yet.");
        console.info(&format!(
            "Use '{CLI_NAME} configure --profile {name}' to add configurations."
        ));
        return Ok(());
    }

    console.heading("\nConfigurations:");
    for (chain, markets) in &configs {
        console.plain(&format!("  {chain}"));
        for (market, sources) in markets {
            console.plain(&format!("    {market} -> {}", sources.join(", ")));
        }
    }
    Ok(())
}

pub fn export(
    ctx: &AppContext,
    console: &mut dyn Console,
    name: &str,
    output: Option<&Path>,
    include_credentials: bool,
) -> Result<()> {
    ctx.ensure_structure(console)?;

    let export = export_profile(&ctx.store, name, include_credentials)?;
    let export_json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            fs::write(path, export_json)?;
            console.success(&format!("Exported profile '{name}' to {}", path.display()));
            if include_credentials {
                console.warn("WARNING: Exported file contains sensitive credentials!");
            }
        }
        None => console.plain(&export_json),
    }
    Ok(())
}

pub fn import(
    ctx: &AppContext,
    console: &mut dyn Console,
    input_file: &Path,
    name: Option<&str>,
    merge: bool,
) -> Result<()> {
    ctx.ensure_structure(console)?;

    let export = read_export(input_file)?;
    let report = import_profile(&ctx.store, console, &export, name, merge)?;

    if report.created_profile {
        console.success(&format!("Created profile: {}", report.profile));
    }
    for outcome in &report.outcomes {
        match outcome {
            ImportOutcome::Imported(key) => console.success(&format!("  Imported {key}")),
            ImportOutcome::SkippedExisting(key) => {
                console.warn(&format!("  Skipping {key} - already exists"))
            }
            ImportOutcome::SkippedEmpty(key) => console.dim(&format!("  Skipping {key} - no data")),
        }
    }

    let imported = report.imported();
    let skipped = report.skipped();
    if imported > 0 {
        console.success(&format!(
            "Successfully imported {imported} configuration(s) to profile '{}'",
            report.profile
        ));
    }
    if skipped > 0 {
        console.warn(&format!("Skipped {skipped} configuration(s)"));
    }
    if report.outcomes.is_empty() {
        console.warn("No configurations found in import file");
    }
    Ok(())
}

/// `YYYY-MM-DD` for ISO timestamps; anything else is shown as stored
fn format_created(created: &str) -> String {
    chrono::NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.date().to_string())
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(created).map(|dt| dt.date_naive().to_string()))
        .unwrap_or_else(|_| created.to_string())
}
