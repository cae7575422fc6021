//! Command handlers. Each handler prints through a [`Console`] and returns an error for
//! `main` to report.

pub mod configure;
pub mod identity;
pub mod profile;

use std::path::PathBuf;

use crate::{
    cli::{Commands, IdentityAction, ProfileAction},
    console::Console,
    credentials::{CredentialLookup, EnvFileLocator, EnvFileOrigin, LocatedEnvFile},
    env::EnvSource,
    error::Result,
    migration::{StructureChange, ensure_profile_structure},
    profile::ProfileStore,
    resolver::ProfileResolver,
    storage::StorePaths,
};

/// Everything a command needs besides the console
pub struct AppContext {
    pub store: ProfileStore,
    pub working_dir: PathBuf,
    pub env: Box<dyn EnvSource>,
}

impl AppContext {
    pub fn new(paths: StorePaths, working_dir: PathBuf, env: Box<dyn EnvSource>) -> Self {
        Self {
            store: ProfileStore::new(paths),
            working_dir,
            env,
        }
    }

    pub fn resolver(&self) -> ProfileResolver<'_> {
        ProfileResolver::new(&self.store, self.env.as_ref())
    }

    pub fn locator(&self) -> EnvFileLocator {
        EnvFileLocator::new(self.store.paths().clone(), &self.working_dir)
    }

    pub fn credential_lookup(&self) -> CredentialLookup<'_> {
        CredentialLookup::new(self.env.as_ref(), &self.working_dir)
    }

    /// Runs the structure check (and migration) and reports what happened
    pub fn ensure_structure(&self, console: &mut dyn Console) -> Result<()> {
        match ensure_profile_structure(&self.store)? {
            StructureChange::Unchanged => {}
            StructureChange::Initialized | StructureChange::DefaultRecreated => {
                console.dim("Created default profile.");
            }
            StructureChange::Migrated { files } => {
                console.info("Migrating existing configurations to profile structure...");
                for file in &files {
                    console.dim(&format!("  ✓ Migrated {file}"));
                }
                if files.is_empty() {
                    console.warn("No existing configurations found. Created default profile.");
                } else {
                    console.success(&format!(
                        "Successfully migrated {} configuration(s) to default profile",
                        files.len()
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Prints the one-time advisory for a file found outside the profile directory
pub(crate) fn advise_fallback(console: &mut dyn Console, located: &LocatedEnvFile) {
    match located.origin {
        EnvFileOrigin::Profile => {}
        EnvFileOrigin::Legacy => console.warn(&format!(
            "Found legacy env file {}. Consider migrating with 'profile list'.",
            located.path.display()
        )),
        EnvFileOrigin::WorkingDir => console.warn(&format!(
            "Found legacy env file in current directory: {}. Consider migrating with 'profile list'.",
            located.path.display()
        )),
    }
}

/// Runs one parsed command
pub fn dispatch(ctx: &AppContext, console: &mut dyn Console, command: Commands) -> Result<()> {
    match command {
        Commands::Profile { action } => match action {
            ProfileAction::List => profile::list(ctx, console),
            ProfileAction::Create { name, description } => {
                profile::create(ctx, console, &name, description.as_deref())
            }
            ProfileAction::Delete { name, force } => profile::delete(ctx, console, &name, force),
            ProfileAction::Copy {
                source,
                destination,
            } => profile::copy(ctx, console, &source, &destination),
            ProfileAction::SetDefault { name } => profile::set_default(ctx, console, &name),
            ProfileAction::Use { name } => profile::use_profile(ctx, console, &name),
            ProfileAction::Show { name } => profile::show(ctx, console, &name),
            ProfileAction::Export {
                name,
                output,
                include_credentials,
            } => profile::export(ctx, console, &name, output.as_deref(), include_credentials),
            ProfileAction::Import {
                input_file,
                name,
                merge,
            } => profile::import(ctx, console, &input_file, name.as_deref(), merge),
        },
        Commands::Configure(args) => configure::run(ctx, console, &args),
        Commands::Identity { action } => match action {
            IdentityAction::List { profile } => identity::list(ctx, console, profile.as_deref()),
            IdentityAction::Show { target, profile } => {
                identity::show(ctx, console, &target, profile.as_deref())
            }
            IdentityAction::Delete {
                target,
                profile,
                force,
            } => identity::delete(ctx, console, &target, profile.as_deref(), force),
            IdentityAction::Get {
                key,
                target,
                value,
                profile,
            } => identity::get(
                ctx,
                console,
                &key,
                &target,
                value.as_deref(),
                profile.as_deref(),
            ),
        },
    }
}
