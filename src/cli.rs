use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// CLI arguments parser using `clap`
#[derive(Parser, Debug)]
#[command(
    name = "powerloom-snapshotter-cli",
    version,
    about = "Manage profiles and credentials for Powerloom snapshotter nodes"
)]
pub struct Cli {
    /// Configuration root (defaults to ~/.powerloom-snapshotter-cli)
    #[arg(long, global = true, env = "POWERLOOM_CLI_HOME", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Subcommand chosen to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage CLI profiles for different wallet configurations
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Configure credentials and settings for a chain and market combination
    Configure(ConfigureArgs),
    /// Manage chain and market specific identities (namespaced .env files)
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    /// List all available profiles
    List,
    /// Create a new profile
    Create {
        /// Name for the new profile
        name: String,
        /// Description for the profile
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a profile and all its configurations
    Delete {
        /// Name of the profile to delete
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Copy all configurations from one profile to another
    Copy {
        /// Source profile name
        source: String,
        /// Destination profile name
        destination: String,
    },
    /// Set the default profile
    SetDefault {
        /// Profile name to set as default
        name: String,
    },
    /// Mark a profile as the last used one
    Use {
        /// Profile name to use
        name: String,
    },
    /// Show detailed information about a profile
    Show {
        /// Profile name to display
        name: String,
    },
    /// Export a profile template (without credentials by default)
    Export {
        /// Profile name to export
        name: String,
        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Include sensitive credentials (security risk)
        #[arg(long)]
        include_credentials: bool,
    },
    /// Import a profile from a JSON template file
    Import {
        /// JSON file to import
        input_file: PathBuf,
        /// Override the profile name from the file
        #[arg(short, long)]
        name: Option<String>,
        /// Merge with an existing profile instead of creating a new one
        #[arg(short, long)]
        merge: bool,
    },
}

/// Options of `configure`; anything left out is asked for interactively
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigureArgs {
    /// Profile name to use
    #[arg(long)]
    pub profile: Option<String>,
    /// Powerloom chain name (e.g. MAINNET, DEVNET)
    #[arg(short, long = "env")]
    pub env: Option<String>,
    /// Data market name (e.g. UNISWAPV2)
    #[arg(short, long)]
    pub market: Option<String>,
    /// Source chain of the data market (e.g. ETH-MAINNET)
    #[arg(long)]
    pub source_chain: Option<String>,
    /// Wallet address (0x...) holding the slots
    #[arg(short, long)]
    pub wallet: Option<String>,
    /// Signer account address (0x...)
    #[arg(long)]
    pub signer: Option<String>,
    /// Signer account private key
    #[arg(short = 'k', long)]
    pub signer_key: Option<String>,
    /// Source chain RPC URL
    #[arg(short = 'r', long)]
    pub source_rpc: Option<String>,
    /// Powerloom RPC URL
    #[arg(long)]
    pub powerloom_rpc: Option<String>,
    /// Telegram chat ID for notifications
    #[arg(short, long)]
    pub telegram_chat: Option<String>,
    /// Telegram reporting URL
    #[arg(short = 'u', long)]
    pub telegram_url: Option<String>,
    /// Telegram message thread ID for organizing notifications
    #[arg(long)]
    pub telegram_thread: Option<String>,
    /// Telegram notification cooldown in seconds
    #[arg(long)]
    pub telegram_cooldown: Option<u64>,
    /// Max stream pool size for the local collector
    #[arg(long)]
    pub max_stream_pool_size: Option<usize>,
    /// Connection refresh interval (seconds) from local collector to sequencer
    #[arg(short, long)]
    pub connection_refresh_interval: Option<u64>,
    /// P2P port for the local collector gossipsub mesh
    #[arg(long)]
    pub local_collector_p2p_port: Option<u16>,
    /// Overwrite an existing configuration without asking
    #[arg(short, long)]
    pub force: bool,
}

/// Chain / market / source chain selecting one namespaced file
#[derive(Args, Debug, Clone)]
pub struct IdentityTarget {
    /// Powerloom chain name (e.g. DEVNET, MAINNET)
    #[arg(short, long)]
    pub chain: String,
    /// Data market name (e.g. UNISWAPV2)
    #[arg(short, long)]
    pub market: String,
    /// Source chain name (e.g. ETH-MAINNET)
    #[arg(short, long)]
    pub source_chain: String,
}

#[derive(Subcommand, Debug)]
pub enum IdentityAction {
    /// List configured identities across all profiles
    List {
        /// Only show this profile
        #[arg(long)]
        profile: Option<String>,
    },
    /// Show the contents of a namespaced .env file
    Show {
        #[command(flatten)]
        target: IdentityTarget,
        /// Profile name to use
        #[arg(long)]
        profile: Option<String>,
    },
    /// Delete a namespaced .env file
    Delete {
        #[command(flatten)]
        target: IdentityTarget,
        /// Profile name to use
        #[arg(long)]
        profile: Option<String>,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Resolve one credential through option, environment, .env and profile file
    Get {
        /// Credential key, e.g. WALLET_HOLDER_ADDRESS
        key: String,
        #[command(flatten)]
        target: IdentityTarget,
        /// Explicit value, highest precedence
        #[arg(long)]
        value: Option<String>,
        /// Profile name to use
        #[arg(long)]
        profile: Option<String>,
    },
}
