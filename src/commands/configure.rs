use std::{fs, thread};

use tracing::{debug, info};

use crate::{
    cli::ConfigureArgs,
    commands::AppContext,
    console::{Console, Question},
    credentials::{
        CONNECTION_REFRESH_INTERVAL_SEC, CredentialKey, EnvFile, LITE_NODE_BRANCH,
        LOCAL_COLLECTOR_IMAGE_TAG, LOCAL_COLLECTOR_P2P_PORT, MAX_STREAM_POOL_SIZE,
        POWERLOOM_RPC_URL, SIGNER_ACCOUNT_ADDRESS, SIGNER_ACCOUNT_PRIVATE_KEY, SOURCE_RPC_URL,
        TELEGRAM_CHAT_ID, TELEGRAM_MESSAGE_THREAD_ID, TELEGRAM_NOTIFICATION_COOLDOWN,
        TELEGRAM_REPORTING_URL, WALLET_HOLDER_ADDRESS,
    },
    error::{AppError, Result},
    storage::DEFAULT_PROFILE,
    validation::{
        optional, prompt_until_valid, validate_address, validate_private_key, validate_rpc_url,
    },
};

pub const DEFAULT_POWERLOOM_RPC_URL: &str = "https://rpc-v2.powerloom.network";
pub const DEFAULT_TELEGRAM_URL: &str = "https://tg-testing.powerloom.io/";
const DEFAULT_TELEGRAM_COOLDOWN: &str = "300";
const DEFAULT_CONNECTION_REFRESH_INTERVAL: &str = "60";
const DEFAULT_P2P_PORT: &str = "8001";
const DEFAULT_LITE_NODE_BRANCH: &str = "main";
const DEFAULT_IMAGE_TAG: &str = "latest";

/// Placeholder shown instead of a stored private key; answering with it keeps the key
const HIDDEN: &str = "(hidden)";

const KNOWN_CHAINS: [&str; 2] = ["MAINNET", "DEVNET"];
const DEFAULT_MARKET: &str = "UNISWAPV2";
const DEFAULT_SOURCE_CHAIN: &str = "ETH-MAINNET";

/// Stream pool ceiling for the number of logical CPUs
pub fn recommended_pool_size(cpus: usize) -> usize {
    match cpus {
        0..=1 => 20,
        2..=3 => 40,
        _ => 100,
    }
}

/// Writes (or rewrites) the credential file for one chain/market/source chain
pub fn run(ctx: &AppContext, console: &mut dyn Console, args: &ConfigureArgs) -> Result<()> {
    let chain = match &args.env {
        Some(chain) => chain.to_uppercase(),
        None => console
            .ask(
                &Question::new("Select Powerloom chain")
                    .with_choices(KNOWN_CHAINS)
                    .with_default(KNOWN_CHAINS[0]),
            )?
            .to_uppercase(),
    };
    let market = match &args.market {
        Some(market) => market.to_uppercase(),
        None => console
            .ask(&Question::new("Enter data market name").with_default(DEFAULT_MARKET))?
            .to_uppercase(),
    };
    let source_chain = match &args.source_chain {
        Some(source) => source.to_uppercase(),
        None => console
            .ask(
                &Question::new(format!("Enter source chain for {market}"))
                    .with_default(DEFAULT_SOURCE_CHAIN),
            )?
            .to_uppercase(),
    };
    let key = CredentialKey::new(&chain, &market, &source_chain);

    ctx.ensure_structure(console)?;
    let active = ctx.resolver().use_profile(args.profile.as_deref())?;
    if let Some(warning) = active.warning() {
        console.warn(&warning);
    }
    if active.name != DEFAULT_PROFILE {
        console.dim(&format!("Using profile: {}", active.name));
    }

    let locator = ctx.locator();
    let env_file_path = locator.profile_path(&active.name, &key);
    let legacy_path = locator.legacy_path(&key);
    if active.name == DEFAULT_PROFILE && legacy_path.is_file() && !env_file_path.exists() {
        console.warn("Found legacy env file. Migrating to profile structure...");
        if let Some(parent) = env_file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::rename(&legacy_path, &env_file_path) {
            Ok(()) => console.dim(&format!(
                "Migrated configuration to profile '{}'",
                active.name
            )),
            Err(e) => console.warn(&format!("Could not migrate legacy file: {e}")),
        }
    }

    let existing = EnvFile::read(&env_file_path)?;
    if env_file_path.exists() {
        console.warn(&format!(
            "Existing configuration found for {}. Using existing values as defaults.",
            key.file_name()
        ));
    }

    let mut env = existing.clone();
    let settings = collect_settings(console, args, &existing, &source_chain)?;
    for (name, value) in settings {
        if !value.is_empty() {
            env.insert(name, value);
        }
    }

    let recommended = recommended_pool_size(
        thread::available_parallelism().map(usize::from).unwrap_or(1),
    );
    let pool_size = args
        .max_stream_pool_size
        .map(|size| size.to_string())
        .or_else(|| existing.non_empty(MAX_STREAM_POOL_SIZE).map(str::to_string))
        .unwrap_or_else(|| recommended.to_string());
    let pool_size = match pool_size.parse::<usize>() {
        Ok(size) if size <= recommended => size,
        Ok(size) => {
            console.warn(&format!(
                "MAX_STREAM_POOL_SIZE ({size}) is greater than the recommended {recommended} for this machine, using recommended value."
            ));
            recommended
        }
        Err(_) => recommended,
    };
    env.insert(MAX_STREAM_POOL_SIZE, pool_size.to_string());
    env.insert_default(LITE_NODE_BRANCH, DEFAULT_LITE_NODE_BRANCH);
    env.insert_default(LOCAL_COLLECTOR_IMAGE_TAG, DEFAULT_IMAGE_TAG);

    if env_file_path.exists() && !args.force {
        let overwrite = console.confirm(
            &format!("{} already exists. Overwrite?", key.file_name()),
            false,
        )?;
        if !overwrite {
            console.warn("Aborted.");
            return Err(AppError::Aborted);
        }
    }

    env.write(&env_file_path)?;
    info!(profile = %active.name, file = %env_file_path.display(), "wrote credential file");

    console.success(&format!(
        "Created {} with following values:",
        env_file_path.display()
    ));
    for line in env.lines() {
        if line.starts_with(SIGNER_ACCOUNT_PRIVATE_KEY) {
            console.plain(&format!("{SIGNER_ACCOUNT_PRIVATE_KEY}={HIDDEN}"));
        } else {
            console.plain(&line);
        }
    }
    Ok(())
}

/// Flag values win; otherwise the operator is asked with the stored value as default.
fn collect_settings(
    console: &mut dyn Console,
    args: &ConfigureArgs,
    existing: &EnvFile,
    source_chain: &str,
) -> Result<Vec<(&'static str, String)>> {
    let current = |key: &str| existing.get(key).unwrap_or_default().to_string();
    let mut settings = Vec::new();

    let wallet = flag_or_ask(
        console,
        args.wallet.as_deref(),
        Question::new("Enter slot NFT holder wallet address (0x...)")
            .with_default(current(WALLET_HOLDER_ADDRESS)),
        |v| optional(v, |v| validate_address("wallet address", v)),
    )?;
    settings.push((WALLET_HOLDER_ADDRESS, wallet));

    let signer = flag_or_ask(
        console,
        args.signer.as_deref(),
        Question::new("Enter SNAPSHOTTER signer address (0x...)")
            .with_default(current(SIGNER_ACCOUNT_ADDRESS)),
        |v| optional(v, |v| validate_address("signer address", v)),
    )?;
    settings.push((SIGNER_ACCOUNT_ADDRESS, signer));

    let existing_key = current(SIGNER_ACCOUNT_PRIVATE_KEY);
    let signer_key = match args.signer_key.as_deref() {
        Some(key) => {
            validate_private_key(key)?;
            key.to_string()
        }
        None => {
            let mut question = Question::new("Enter signer private key").password();
            if !existing_key.is_empty() {
                question = question.with_default(HIDDEN);
            }
            let answer = prompt_until_valid(console, &question, |v| {
                if v == HIDDEN {
                    Ok(())
                } else {
                    optional(v, validate_private_key)
                }
            })?;
            if answer == HIDDEN || answer.is_empty() {
                existing_key
            } else {
                answer
            }
        }
    };
    settings.push((SIGNER_ACCOUNT_PRIVATE_KEY, signer_key));

    let source_rpc = flag_or_ask(
        console,
        args.source_rpc.as_deref(),
        Question::new(format!("Enter RPC URL for {source_chain}"))
            .with_default(current(SOURCE_RPC_URL)),
        |v| optional(v, |v| validate_rpc_url("source RPC URL", v)),
    )?;
    settings.push((SOURCE_RPC_URL, source_rpc));

    let powerloom_rpc = match args.powerloom_rpc.as_deref() {
        Some(url) => {
            validate_rpc_url("Powerloom RPC URL", url)?;
            console.success(&format!("Using Powerloom RPC URL from CLI: {url}"));
            url.to_string()
        }
        None => {
            let default = existing
                .non_empty(POWERLOOM_RPC_URL)
                .unwrap_or(DEFAULT_POWERLOOM_RPC_URL);
            prompt_until_valid(
                console,
                &Question::new("Enter Powerloom RPC URL").with_default(default),
                |v| validate_rpc_url("Powerloom RPC URL", v),
            )?
        }
    };
    settings.push((POWERLOOM_RPC_URL, powerloom_rpc));

    let telegram_chat = flag_or_ask(
        console,
        args.telegram_chat.as_deref(),
        Question::new("Enter Telegram chat ID (optional)").with_default(current(TELEGRAM_CHAT_ID)),
        |_| Ok(()),
    )?;

    let telegram_url = match args.telegram_url.as_deref().filter(|url| !url.is_empty()) {
        Some(url) => {
            validate_rpc_url("Telegram reporting URL", url)?;
            url.to_string()
        }
        None => existing
            .non_empty(TELEGRAM_REPORTING_URL)
            .unwrap_or(DEFAULT_TELEGRAM_URL)
            .to_string(),
    };
    settings.push((TELEGRAM_REPORTING_URL, telegram_url));

    if !telegram_chat.is_empty() {
        let cooldown = match args.telegram_cooldown {
            Some(seconds) => seconds.to_string(),
            None => prompt_until_valid(
                console,
                &Question::new("Enter Telegram notification cooldown in seconds (optional)")
                    .with_default(
                        existing
                            .non_empty(TELEGRAM_NOTIFICATION_COOLDOWN)
                            .unwrap_or(DEFAULT_TELEGRAM_COOLDOWN),
                    ),
                |v| optional(v, |v| parse_number::<u64>("cooldown", v)),
            )?,
        };
        settings.push((TELEGRAM_NOTIFICATION_COOLDOWN, cooldown));

        let thread = flag_or_ask(
            console,
            args.telegram_thread.as_deref(),
            Question::new(
                "Enter Telegram message thread ID for organizing notifications (optional, leave empty for main chat)",
            )
            .with_default(current(TELEGRAM_MESSAGE_THREAD_ID)),
            |_| Ok(()),
        )?;
        settings.push((TELEGRAM_MESSAGE_THREAD_ID, thread));
    }
    settings.push((TELEGRAM_CHAT_ID, telegram_chat));

    let refresh_interval = args
        .connection_refresh_interval
        .map(|seconds| seconds.to_string())
        .or_else(|| {
            existing
                .non_empty(CONNECTION_REFRESH_INTERVAL_SEC)
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_CONNECTION_REFRESH_INTERVAL.to_string());
    settings.push((CONNECTION_REFRESH_INTERVAL_SEC, refresh_interval));

    let p2p_port = match args.local_collector_p2p_port {
        Some(port) => port.to_string(),
        None => prompt_until_valid(
            console,
            &Question::new("Enter local collector P2P port (for gossipsub mesh communication)")
                .with_default(
                    existing
                        .non_empty(LOCAL_COLLECTOR_P2P_PORT)
                        .unwrap_or(DEFAULT_P2P_PORT),
                ),
            |v| parse_number::<u16>("P2P port", v),
        )?,
    };
    settings.push((LOCAL_COLLECTOR_P2P_PORT, p2p_port));

    debug!(count = settings.len(), "collected configure settings");
    Ok(settings)
}

fn flag_or_ask<F>(
    console: &mut dyn Console,
    flag: Option<&str>,
    question: Question,
    validate: F,
) -> Result<String>
where
    F: Fn(&str) -> Result<()>,
{
    match flag {
        Some(value) => {
            validate(value)?;
            Ok(value.to_string())
        }
        None => prompt_until_valid(console, &question, validate),
    }
}

fn parse_number<T: std::str::FromStr>(label: &str, value: &str) -> Result<()> {
    value
        .trim()
        .parse::<T>()
        .map(|_| ())
        .map_err(|_| AppError::Validation(format!("{label} must be a number")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::test_support::test_context, console::testing::ScriptedConsole};

    const WALLET: &str = "0x1111111111111111111111111111111111111111";
    const SIGNER: &str = "0x2222222222222222222222222222222222222222";
    const KEY: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn full_args(profile: Option<&str>) -> ConfigureArgs {
        ConfigureArgs {
            profile: profile.map(str::to_string),
            env: Some("mainnet".to_string()),
            market: Some("uniswapv2".to_string()),
            source_chain: Some("eth-mainnet".to_string()),
            wallet: Some(WALLET.to_string()),
            signer: Some(SIGNER.to_string()),
            signer_key: Some(KEY.to_string()),
            source_rpc: Some("https://eth.example.org".to_string()),
            powerloom_rpc: Some("https://rpc.example.org".to_string()),
            telegram_chat: Some(String::new()),
            local_collector_p2p_port: Some(9001),
            max_stream_pool_size: Some(10),
            ..ConfigureArgs::default()
        }
    }

    #[test]
    fn pool_size_recommendation_follows_cpu_count() {
        assert_eq!(recommended_pool_size(1), 20);
        assert_eq!(recommended_pool_size(2), 40);
        assert_eq!(recommended_pool_size(3), 40);
        assert_eq!(recommended_pool_size(16), 100);
    }

    #[test]
    fn writes_namespaced_file_with_defaults() {
        let t = test_context(&[]);
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        run(&t.ctx, &mut console, &full_args(None)).unwrap();

        let path = t
            .ctx
            .store
            .profile_dir(DEFAULT_PROFILE)
            .join(".env.mainnet.uniswapv2.eth_mainnet");
        let env = EnvFile::read(&path).unwrap();
        assert_eq!(env.get(WALLET_HOLDER_ADDRESS), Some(WALLET));
        assert_eq!(env.get(TELEGRAM_REPORTING_URL), Some(DEFAULT_TELEGRAM_URL));
        assert_eq!(env.get(CONNECTION_REFRESH_INTERVAL_SEC), Some("60"));
        assert_eq!(env.get(LOCAL_COLLECTOR_P2P_PORT), Some("9001"));
        assert_eq!(env.get(LITE_NODE_BRANCH), Some("main"));
        assert_eq!(env.get(LOCAL_COLLECTOR_IMAGE_TAG), Some("latest"));
        assert_eq!(env.get(MAX_STREAM_POOL_SIZE), Some("10"));
        assert!(!env.contains(TELEGRAM_CHAT_ID));
        assert!(!env.contains(TELEGRAM_NOTIFICATION_COOLDOWN));

        let rendered = std::fs::read_to_string(&path).unwrap();
        assert!(rendered.starts_with(&format!("{WALLET_HOLDER_ADDRESS}={WALLET}\n")));

        let output = console.output();
        assert!(output.contains("SIGNER_ACCOUNT_PRIVATE_KEY=(hidden)"));
        assert!(!output.contains(KEY));
    }

    #[test]
    fn prompts_keep_existing_values_and_hidden_key() {
        let t = test_context(&[]);
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        run(&t.ctx, &mut console, &full_args(None)).unwrap();

        let path = t
            .ctx
            .store
            .profile_dir(DEFAULT_PROFILE)
            .join(".env.mainnet.uniswapv2.eth_mainnet");
        let mut env = EnvFile::read(&path).unwrap();
        env.insert("CUSTOM_SETTING", "keep-me");
        env.write(&path).unwrap();

        // wallet, signer, key, source rpc, powerloom rpc, telegram chat, p2p port, overwrite
        let mut console = ScriptedConsole::new(["", "", "", "", "", "", "", "y"]);
        let args = ConfigureArgs {
            env: Some("MAINNET".to_string()),
            market: Some("UNISWAPV2".to_string()),
            source_chain: Some("ETH-MAINNET".to_string()),
            ..ConfigureArgs::default()
        };
        run(&t.ctx, &mut console, &args).unwrap();
        assert_eq!(console.remaining_answers(), 0);

        let env = EnvFile::read(&path).unwrap();
        assert_eq!(env.get(SIGNER_ACCOUNT_PRIVATE_KEY), Some(KEY));
        assert_eq!(env.get(SOURCE_RPC_URL), Some("https://eth.example.org"));
        assert_eq!(env.get(LOCAL_COLLECTOR_P2P_PORT), Some("9001"));
        assert_eq!(env.get("CUSTOM_SETTING"), Some("keep-me"));
    }

    #[test]
    fn quoted_existing_values_are_kept_as_defaults() {
        let t = test_context(&[]);
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        t.ctx.ensure_structure(&mut console).unwrap();
        let path = t
            .ctx
            .store
            .profile_dir(DEFAULT_PROFILE)
            .join(".env.mainnet.uniswapv2.eth_mainnet");
        std::fs::write(
            &path,
            format!(
                "WALLET_HOLDER_ADDRESS=\"{WALLET}\"\nSIGNER_ACCOUNT_ADDRESS='{SIGNER}'\nSIGNER_ACCOUNT_PRIVATE_KEY=\"{KEY}\"\nSOURCE_RPC_URL=\"https://eth.example.org\"\n"
            ),
        )
        .unwrap();

        // wallet, signer, key, source rpc, powerloom rpc, telegram chat, p2p port
        let mut console = ScriptedConsole::new(["", "", "", "", "", "", ""]);
        let args = ConfigureArgs {
            env: Some("MAINNET".to_string()),
            market: Some("UNISWAPV2".to_string()),
            source_chain: Some("ETH-MAINNET".to_string()),
            force: true,
            ..ConfigureArgs::default()
        };
        run(&t.ctx, &mut console, &args).unwrap();
        assert_eq!(console.remaining_answers(), 0);
        assert!(!console.output().contains("must be 0x followed by 40 hex characters"));

        let env = EnvFile::read(&path).unwrap();
        assert_eq!(env.get(WALLET_HOLDER_ADDRESS), Some(WALLET));
        assert_eq!(env.get(SIGNER_ACCOUNT_ADDRESS), Some(SIGNER));
        assert_eq!(env.get(SIGNER_ACCOUNT_PRIVATE_KEY), Some(KEY));
        assert_eq!(env.get(SOURCE_RPC_URL), Some("https://eth.example.org"));
    }

    #[test]
    fn declining_overwrite_aborts() {
        let t = test_context(&[]);
        let mut console = ScriptedConsole::new(["n"]);
        run(&t.ctx, &mut console, &full_args(None)).unwrap();

        let mut args = full_args(None);
        args.wallet = Some("0x3333333333333333333333333333333333333333".to_string());
        assert!(matches!(
            run(&t.ctx, &mut console, &args),
            Err(AppError::Aborted)
        ));

        let env = EnvFile::read(
            &t.ctx
                .store
                .profile_dir(DEFAULT_PROFILE)
                .join(".env.mainnet.uniswapv2.eth_mainnet"),
        )
        .unwrap();
        assert_eq!(env.get(WALLET_HOLDER_ADDRESS), Some(WALLET));
    }

    #[test]
    fn invalid_flag_values_are_rejected() {
        let t = test_context(&[]);
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        let mut args = full_args(None);
        args.wallet = Some("0x123".to_string());
        assert!(matches!(
            run(&t.ctx, &mut console, &args),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn telegram_chat_enables_cooldown_prompt() {
        let t = test_context(&[]);
        let mut args = full_args(None);
        args.telegram_chat = Some("-100123".to_string());
        // cooldown (default), thread id
        let mut console = ScriptedConsole::new(["", "42"]);
        run(&t.ctx, &mut console, &args).unwrap();

        let env = EnvFile::read(
            &t.ctx
                .store
                .profile_dir(DEFAULT_PROFILE)
                .join(".env.mainnet.uniswapv2.eth_mainnet"),
        )
        .unwrap();
        assert_eq!(env.get(TELEGRAM_CHAT_ID), Some("-100123"));
        assert_eq!(env.get(TELEGRAM_NOTIFICATION_COOLDOWN), Some("300"));
        assert_eq!(env.get(TELEGRAM_MESSAGE_THREAD_ID), Some("42"));
    }

    #[test]
    fn legacy_file_moves_into_default_profile() {
        let t = test_context(&[]);
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        t.ctx.ensure_structure(&mut console).unwrap();

        let legacy_dir = t.ctx.store.paths().legacy_envs_dir();
        std::fs::create_dir_all(&legacy_dir).unwrap();
        std::fs::write(
            legacy_dir.join(".env.mainnet.uniswapv2.eth_mainnet"),
            "LITE_NODE_BRANCH=experimental",
        )
        .unwrap();

        let mut args = full_args(None);
        args.force = true;
        run(&t.ctx, &mut console, &args).unwrap();

        assert!(!legacy_dir.join(".env.mainnet.uniswapv2.eth_mainnet").exists());
        let env = EnvFile::read(
            &t.ctx
                .store
                .profile_dir(DEFAULT_PROFILE)
                .join(".env.mainnet.uniswapv2.eth_mainnet"),
        )
        .unwrap();
        assert_eq!(env.get(LITE_NODE_BRANCH), Some("experimental"));
        assert!(console.output().contains("Found legacy env file"));
    }

    #[test]
    fn named_profile_becomes_last_used() {
        let t = test_context(&[]);
        t.ctx.store.create("ops", None).unwrap();
        let mut console = ScriptedConsole::new(Vec::<String>::new());
        run(&t.ctx, &mut console, &full_args(Some("ops"))).unwrap();

        assert!(
            t.ctx
                .store
                .profile_dir("ops")
                .join(".env.mainnet.uniswapv2.eth_mainnet")
                .is_file()
        );
        assert_eq!(t.ctx.store.global_config().last_used_profile, "ops");
        assert!(console.output().contains("Using profile: ops"));
    }
}
