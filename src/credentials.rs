//! Namespaced credential files.
//!
//! One dotenv-style file per (chain, market, source chain) lives in each profile directory,
//! named `.env.<chain>.<market>.<source_chain>`. Older installs kept the same files in a flat
//! `envs/` directory or next to the operator's working directory; lookups still fall back there.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{env::EnvSource, error::Result, storage::StorePaths};

pub const WALLET_HOLDER_ADDRESS: &str = "WALLET_HOLDER_ADDRESS";
pub const SIGNER_ACCOUNT_ADDRESS: &str = "SIGNER_ACCOUNT_ADDRESS";
pub const SIGNER_ACCOUNT_PRIVATE_KEY: &str = "SIGNER_ACCOUNT_PRIVATE_KEY";
pub const SOURCE_RPC_URL: &str = "SOURCE_RPC_URL";
pub const POWERLOOM_RPC_URL: &str = "POWERLOOM_RPC_URL";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const TELEGRAM_REPORTING_URL: &str = "TELEGRAM_REPORTING_URL";
pub const TELEGRAM_NOTIFICATION_COOLDOWN: &str = "TELEGRAM_NOTIFICATION_COOLDOWN";
pub const TELEGRAM_MESSAGE_THREAD_ID: &str = "TELEGRAM_MESSAGE_THREAD_ID";
pub const MAX_STREAM_POOL_SIZE: &str = "MAX_STREAM_POOL_SIZE";
pub const CONNECTION_REFRESH_INTERVAL_SEC: &str = "CONNECTION_REFRESH_INTERVAL_SEC";
pub const LOCAL_COLLECTOR_P2P_PORT: &str = "LOCAL_COLLECTOR_P2P_PORT";
pub const LITE_NODE_BRANCH: &str = "LITE_NODE_BRANCH";
pub const LOCAL_COLLECTOR_IMAGE_TAG: &str = "LOCAL_COLLECTOR_IMAGE_TAG";

/// Well-known keys, in the order they are written out
pub const TEMPLATE_FIELD_ORDER: [&str; 14] = [
    WALLET_HOLDER_ADDRESS,
    SIGNER_ACCOUNT_ADDRESS,
    SIGNER_ACCOUNT_PRIVATE_KEY,
    SOURCE_RPC_URL,
    POWERLOOM_RPC_URL,
    TELEGRAM_CHAT_ID,
    TELEGRAM_REPORTING_URL,
    TELEGRAM_NOTIFICATION_COOLDOWN,
    TELEGRAM_MESSAGE_THREAD_ID,
    MAX_STREAM_POOL_SIZE,
    CONNECTION_REFRESH_INTERVAL_SEC,
    LOCAL_COLLECTOR_P2P_PORT,
    LITE_NODE_BRANCH,
    LOCAL_COLLECTOR_IMAGE_TAG,
];

const ENV_FILE_PREFIX: &str = ".env";
const WORKING_DIR_DOTENV: &str = ".env";

/// Normalized (chain, market, source chain) triple naming one credential file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CredentialKey {
    chain: String,
    market: String,
    source_chain: String,
}

impl CredentialKey {
    /// Lowercases all parts; hyphens in the source chain become underscores
    pub fn new(chain: &str, market: &str, source_chain: &str) -> Self {
        Self {
            chain: chain.trim().to_lowercase(),
            market: market.trim().to_lowercase(),
            source_chain: source_chain.trim().to_lowercase().replace('-', "_"),
        }
    }

    /// Parses `.env.<chain>.<market>.<source_chain>`; any other name yields `None`
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let parts: Vec<&str> = file_name.trim().split('.').collect();
        match parts.as_slice() {
            ["", "env", chain, market, source]
                if !chain.is_empty() && !market.is_empty() && !source.is_empty() =>
            {
                Some(Self::new(chain, market, source))
            }
            _ => None,
        }
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn source_chain(&self) -> &str {
        &self.source_chain
    }

    pub fn file_name(&self) -> String {
        format!(
            "{ENV_FILE_PREFIX}.{}.{}.{}",
            self.chain, self.market, self.source_chain
        )
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.chain.to_uppercase(),
            self.market.to_uppercase(),
            self.source_chain.to_uppercase()
        )
    }
}

/// Contents of one credential file: unique keys, flat values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: BTreeMap<String, String>,
}

impl EnvFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses dotenv lines, unquoting values. Comments, blank lines and malformed lines are
    /// skipped; the last occurrence of a key wins.
    pub fn parse(contents: &str) -> Self {
        let vars = dotenvy::from_read_iter(contents.as_bytes())
            .filter_map(|item| match item {
                Ok(pair) => Some(pair),
                Err(e) => {
                    debug!(error = %e, "skipping malformed env line");
                    None
                }
            })
            .collect();
        Self { vars }
    }

    /// Reads a credential file; a missing file is an empty map
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value for `key` when present and not blank
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Inserts only when the key is absent
    pub fn insert_default(&mut self, key: &str, value: &str) {
        self.vars
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `KEY=VALUE` lines: well-known keys first in template order, the rest sorted by key
    pub fn lines(&self) -> Vec<String> {
        let known = TEMPLATE_FIELD_ORDER
            .iter()
            .filter_map(|key| self.vars.get(*key).map(|value| (*key, value)));
        let custom = self
            .vars
            .iter()
            .filter(|(key, _)| !TEMPLATE_FIELD_ORDER.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value));

        known
            .chain(custom)
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }

    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvFile {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Where a located credential file was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileOrigin {
    Profile,
    Legacy,
    WorkingDir,
}

impl EnvFileOrigin {
    /// Label used when listing files outside any profile
    pub fn label(&self) -> &'static str {
        match self {
            EnvFileOrigin::Profile => "profile",
            EnvFileOrigin::Legacy => "[Legacy]",
            EnvFileOrigin::WorkingDir => "[CWD]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedEnvFile {
    pub path: PathBuf,
    pub origin: EnvFileOrigin,
}

/// Resolves credential file paths for a profile, with legacy fallbacks
#[derive(Debug, Clone)]
pub struct EnvFileLocator {
    paths: StorePaths,
    working_dir: PathBuf,
}

impl EnvFileLocator {
    pub fn new(paths: StorePaths, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths,
            working_dir: working_dir.into(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Path of the credential file inside the profile directory
    pub fn profile_path(&self, profile: &str, key: &CredentialKey) -> PathBuf {
        self.paths.profile_dir(profile).join(key.file_name())
    }

    pub fn legacy_path(&self, key: &CredentialKey) -> PathBuf {
        self.paths.legacy_envs_dir().join(key.file_name())
    }

    pub fn working_dir_path(&self, key: &CredentialKey) -> PathBuf {
        self.working_dir.join(key.file_name())
    }

    /// First existing file among profile, legacy `envs/` and working directory
    pub fn locate(&self, profile: &str, key: &CredentialKey) -> Option<LocatedEnvFile> {
        [
            (self.profile_path(profile, key), EnvFileOrigin::Profile),
            (self.legacy_path(key), EnvFileOrigin::Legacy),
            (self.working_dir_path(key), EnvFileOrigin::WorkingDir),
        ]
        .into_iter()
        .find(|(path, _)| path.is_file())
        .map(|(path, origin)| {
            debug!(path = %path.display(), ?origin, "located credential file");
            LocatedEnvFile { path, origin }
        })
    }
}

/// Credential files directly inside `dir`, sorted by key. A missing directory is empty.
pub fn scan_env_files(dir: &Path) -> Result<Vec<(CredentialKey, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        if let Some(key) = CredentialKey::from_file_name(&file_name.to_string_lossy()) {
            found.push((key, entry.path()));
        }
    }
    found.sort();
    Ok(found)
}

/// Source that supplied a credential value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit,
    Environment,
    WorkingDirDotenv,
    Namespaced,
}

impl CredentialSource {
    pub fn describe(&self) -> &'static str {
        match self {
            CredentialSource::Explicit => "command-line option",
            CredentialSource::Environment => "shell environment variable",
            CredentialSource::WorkingDirDotenv => ".env file in the current directory",
            CredentialSource::Namespaced => "namespaced profile .env file",
        }
    }
}

/// Lookup order for individual credentials, highest precedence first
pub const CREDENTIAL_PRECEDENCE: [CredentialSource; 4] = [
    CredentialSource::Explicit,
    CredentialSource::Environment,
    CredentialSource::WorkingDirDotenv,
    CredentialSource::Namespaced,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub value: String,
    pub source: CredentialSource,
}

/// Layered lookup of individual credential values
pub struct CredentialLookup<'a> {
    env: &'a dyn EnvSource,
    working_dir: PathBuf,
}

impl<'a> CredentialLookup<'a> {
    pub fn new(env: &'a dyn EnvSource, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            env,
            working_dir: working_dir.into(),
        }
    }

    /// Walks [`CREDENTIAL_PRECEDENCE`] and stops at the first non-empty value. Absence is
    /// not an error; callers decide whether it is fatal.
    pub fn get_credential(
        &self,
        key: &str,
        chain: &str,
        explicit_value: Option<&str>,
        env_map: Option<&EnvFile>,
    ) -> Option<ResolvedCredential> {
        let resolved = CREDENTIAL_PRECEDENCE.iter().find_map(|source| {
            self.lookup(*source, key, explicit_value, env_map)
                .filter(|value| !value.trim().is_empty())
                .map(|value| ResolvedCredential {
                    value,
                    source: *source,
                })
        });
        debug!(
            key,
            chain,
            source = ?resolved.as_ref().map(|r| r.source),
            "credential lookup"
        );
        resolved
    }

    fn lookup(
        &self,
        source: CredentialSource,
        key: &str,
        explicit_value: Option<&str>,
        env_map: Option<&EnvFile>,
    ) -> Option<String> {
        match source {
            CredentialSource::Explicit => explicit_value.map(str::to_string),
            CredentialSource::Environment => self.env.var(key),
            CredentialSource::WorkingDirDotenv => self.working_dir_dotenv(key),
            CredentialSource::Namespaced => {
                env_map.and_then(|map| map.get(key)).map(str::to_string)
            }
        }
    }

    fn working_dir_dotenv(&self, key: &str) -> Option<String> {
        let path = self.working_dir.join(WORKING_DIR_DOTENV);
        if !path.is_file() {
            return None;
        }
        dotenvy::from_path_iter(&path)
            .ok()?
            .filter_map(|item| item.ok())
            .filter(|(name, _)| name == key)
            .last()
            .map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_name_is_normalized() {
        let key = CredentialKey::new("MAINNET", "UniswapV2", "ETH-Mainnet");
        assert_eq!(key.file_name(), ".env.mainnet.uniswapv2.eth_mainnet");
        assert_eq!(key.to_string(), "MAINNET/UNISWAPV2/ETH_MAINNET");
    }

    #[test]
    fn file_name_parsing() {
        let key = CredentialKey::from_file_name(".env.devnet.aavev3.eth_mainnet").unwrap();
        assert_eq!(key.chain(), "devnet");
        assert_eq!(key.market(), "aavev3");
        assert_eq!(key.source_chain(), "eth_mainnet");

        assert!(CredentialKey::from_file_name(".env").is_none());
        assert!(CredentialKey::from_file_name(".env.devnet.aavev3").is_none());
        assert!(CredentialKey::from_file_name(".env.a.b.c.d").is_none());
        assert!(CredentialKey::from_file_name("env.a.b.c").is_none());
        assert!(CredentialKey::from_file_name(".env.monitor.devnet.").is_none());
    }

    #[test]
    fn parse_skips_comments_and_malformed_lines() {
        let env = EnvFile::parse(
            "# comment\n\nWALLET_HOLDER_ADDRESS = 0xABC\nnot a pair\nURL=https://x/?a=b\nWALLET_HOLDER_ADDRESS=0xDEF\n",
        );
        assert_eq!(env.len(), 2);
        assert_eq!(env.get("WALLET_HOLDER_ADDRESS"), Some("0xDEF"));
        assert_eq!(env.get("URL"), Some("https://x/?a=b"));
    }

    #[test]
    fn parse_unquotes_values() {
        let env = EnvFile::parse(
            "WALLET_HOLDER_ADDRESS=\"0x1111111111111111111111111111111111111111\"\nTELEGRAM_CHAT_ID='-100'\nLITE_NODE_BRANCH=main # trailing\n",
        );
        assert_eq!(
            env.get("WALLET_HOLDER_ADDRESS"),
            Some("0x1111111111111111111111111111111111111111")
        );
        assert_eq!(env.get("TELEGRAM_CHAT_ID"), Some("-100"));
        assert_eq!(env.get("LITE_NODE_BRANCH"), Some("main"));
    }

    #[test]
    fn render_orders_template_keys_then_custom_keys() {
        let env: EnvFile = [
            ("ZETA", "1"),
            (LITE_NODE_BRANCH, "main"),
            ("ALPHA", "2"),
            (WALLET_HOLDER_ADDRESS, "0xA"),
            (SOURCE_RPC_URL, "https://rpc"),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            env.render(),
            "WALLET_HOLDER_ADDRESS=0xA\nSOURCE_RPC_URL=https://rpc\nLITE_NODE_BRANCH=main\nALPHA=2\nZETA=1"
        );
    }

    #[test]
    fn read_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(EnvFile::read(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn locate_prefers_profile_then_legacy_then_working_dir() {
        let root = tempdir().unwrap();
        let cwd = tempdir().unwrap();
        let paths = StorePaths::new(root.path());
        let locator = EnvFileLocator::new(paths.clone(), cwd.path());
        let key = CredentialKey::new("mainnet", "uniswapv2", "eth");

        assert!(locator.locate("default", &key).is_none());

        fs::write(locator.working_dir_path(&key), "A=cwd").unwrap();
        assert_eq!(
            locator.locate("default", &key).unwrap().origin,
            EnvFileOrigin::WorkingDir
        );

        fs::create_dir_all(paths.legacy_envs_dir()).unwrap();
        fs::write(locator.legacy_path(&key), "A=legacy").unwrap();
        assert_eq!(
            locator.locate("default", &key).unwrap().origin,
            EnvFileOrigin::Legacy
        );

        fs::create_dir_all(paths.profile_dir("default")).unwrap();
        fs::write(locator.profile_path("default", &key), "A=profile").unwrap();
        let located = locator.locate("default", &key).unwrap();
        assert_eq!(located.origin, EnvFileOrigin::Profile);
        assert_eq!(EnvFile::read(&located.path).unwrap().get("A"), Some("profile"));
    }

    #[test]
    fn scan_only_returns_namespaced_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".env.mainnet.uniswapv2.eth"), "A=1").unwrap();
        fs::write(dir.path().join(".env.devnet.aavev3.eth_mainnet"), "A=1").unwrap();
        fs::write(dir.path().join(".env"), "A=1").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::create_dir(dir.path().join(".env.x.y.z")).unwrap();

        let found = scan_env_files(dir.path()).unwrap();
        let names: Vec<String> = found.iter().map(|(key, _)| key.file_name()).collect();
        assert_eq!(
            names,
            vec![".env.devnet.aavev3.eth_mainnet", ".env.mainnet.uniswapv2.eth"]
        );
        assert!(scan_env_files(&dir.path().join("missing")).unwrap().is_empty());
    }

    fn env_with(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn explicit_value_wins() {
        let cwd = tempdir().unwrap();
        let env = env_with(&[(WALLET_HOLDER_ADDRESS, "0xENV")]);
        let lookup = CredentialLookup::new(&env, cwd.path());
        let map: EnvFile = [(WALLET_HOLDER_ADDRESS, "0xFILE")].into_iter().collect();

        let resolved = lookup
            .get_credential(WALLET_HOLDER_ADDRESS, "MAINNET", Some("0xCLI"), Some(&map))
            .unwrap();
        assert_eq!(resolved.value, "0xCLI");
        assert_eq!(resolved.source, CredentialSource::Explicit);
    }

    #[test]
    fn environment_beats_namespaced_map() {
        let cwd = tempdir().unwrap();
        let env = env_with(&[(WALLET_HOLDER_ADDRESS, "0xENV")]);
        let lookup = CredentialLookup::new(&env, cwd.path());
        let map: EnvFile = [(WALLET_HOLDER_ADDRESS, "X")].into_iter().collect();

        let resolved = lookup
            .get_credential(WALLET_HOLDER_ADDRESS, "MAINNET", None, Some(&map))
            .unwrap();
        assert_eq!(resolved.value, "0xENV");
        assert_eq!(resolved.source, CredentialSource::Environment);
    }

    #[test]
    fn working_dir_dotenv_beats_namespaced_map() {
        let cwd = tempdir().unwrap();
        fs::write(cwd.path().join(".env"), "WALLET_HOLDER_ADDRESS=0xDOTENV\n").unwrap();
        let env = env_with(&[]);
        let lookup = CredentialLookup::new(&env, cwd.path());
        let map: EnvFile = [(WALLET_HOLDER_ADDRESS, "0xFILE")].into_iter().collect();

        let resolved = lookup
            .get_credential(WALLET_HOLDER_ADDRESS, "MAINNET", None, Some(&map))
            .unwrap();
        assert_eq!(resolved.value, "0xDOTENV");
        assert_eq!(resolved.source, CredentialSource::WorkingDirDotenv);
    }

    #[test]
    fn namespaced_map_is_last_resort_and_blank_values_are_absent() {
        let cwd = tempdir().unwrap();
        let env = env_with(&[(WALLET_HOLDER_ADDRESS, "")]);
        let lookup = CredentialLookup::new(&env, cwd.path());
        let map: EnvFile = [(WALLET_HOLDER_ADDRESS, "0xFILE")].into_iter().collect();

        let resolved = lookup
            .get_credential(WALLET_HOLDER_ADDRESS, "MAINNET", Some(""), Some(&map))
            .unwrap();
        assert_eq!(resolved.value, "0xFILE");
        assert_eq!(resolved.source, CredentialSource::Namespaced);

        assert!(lookup
            .get_credential(SIGNER_ACCOUNT_ADDRESS, "MAINNET", None, Some(&map))
            .is_none());
        assert!(lookup
            .get_credential(WALLET_HOLDER_ADDRESS, "MAINNET", None, None)
            .is_none());
    }
}
