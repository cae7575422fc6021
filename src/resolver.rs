use tracing::debug;

use crate::{
    env::EnvSource,
    error::Result,
    profile::ProfileStore,
    storage::DEFAULT_PROFILE,
};

/// Environment variable naming the profile to use
pub const PROFILE_ENV_VAR: &str = "POWERLOOM_PROFILE";

/// Which precedence level decided the active profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    Explicit,
    /// The explicit name does not exist; the hardcoded default was used instead
    MissingExplicit(String),
    Environment,
    /// The environment variable names a missing profile; the hardcoded default was used
    MissingEnvironment(String),
    ConfiguredDefault,
    LastUsed,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveProfile {
    pub name: String,
    pub source: ProfileSource,
}

impl ActiveProfile {
    fn new(name: impl Into<String>, source: ProfileSource) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    /// Operator-facing warning when a requested profile was missing
    pub fn warning(&self) -> Option<String> {
        match &self.source {
            ProfileSource::MissingExplicit(requested) => Some(format!(
                "Profile '{requested}' does not exist. Using {DEFAULT_PROFILE} profile."
            )),
            ProfileSource::MissingEnvironment(requested) => Some(format!(
                "Profile '{requested}' from {PROFILE_ENV_VAR} env var does not exist. Using {DEFAULT_PROFILE}."
            )),
            _ => None,
        }
    }
}

/// Picks the active profile by strict precedence
pub struct ProfileResolver<'a> {
    store: &'a ProfileStore,
    env: &'a dyn EnvSource,
}

impl<'a> ProfileResolver<'a> {
    pub fn new(store: &'a ProfileStore, env: &'a dyn EnvSource) -> Self {
        Self { store, env }
    }

    /// Resolves without side effects:
    /// explicit > `POWERLOOM_PROFILE` > configured default > last used > `default`.
    /// A requested profile that does not exist resolves to `default` and stops there.
    pub fn resolve(&self, explicit: Option<&str>) -> ActiveProfile {
        let resolved = self.resolve_inner(explicit);
        debug!(profile = %resolved.name, source = ?resolved.source, "resolved active profile");
        resolved
    }

    /// Resolves and records the result as the last used profile
    pub fn use_profile(&self, explicit: Option<&str>) -> Result<ActiveProfile> {
        let resolved = self.resolve(explicit);
        self.store.set_last_used(&resolved.name)?;
        Ok(resolved)
    }

    fn resolve_inner(&self, explicit: Option<&str>) -> ActiveProfile {
        if let Some(name) = explicit.filter(|name| !name.is_empty()) {
            return self.requested(name, ProfileSource::Explicit, ProfileSource::MissingExplicit);
        }

        if let Some(name) = self.env.var(PROFILE_ENV_VAR).filter(|name| !name.is_empty()) {
            return self.requested(
                &name,
                ProfileSource::Environment,
                ProfileSource::MissingEnvironment,
            );
        }

        let config = self.store.global_config();
        if self.store.exists(&config.default_profile) {
            return ActiveProfile::new(config.default_profile, ProfileSource::ConfiguredDefault);
        }
        if config.last_used_profile != DEFAULT_PROFILE
            && self.store.exists(&config.last_used_profile)
        {
            return ActiveProfile::new(config.last_used_profile, ProfileSource::LastUsed);
        }

        ActiveProfile::new(DEFAULT_PROFILE, ProfileSource::Fallback)
    }

    fn requested(
        &self,
        name: &str,
        found: ProfileSource,
        missing: fn(String) -> ProfileSource,
    ) -> ActiveProfile {
        if self.store.exists(name) {
            ActiveProfile::new(name, found)
        } else {
            ActiveProfile::new(DEFAULT_PROFILE, missing(name.to_string()))
        }
    }
}
