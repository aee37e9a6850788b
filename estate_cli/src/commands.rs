use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "estate")]
#[command(about = "Property registration and token transfers on Hedera")]
#[command(version)]
pub struct Cli {
    /// Configuration file path (falls back to ESTATE_CONFIG_PATH, then config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show the account the relay signs with
    Account,

    /// Upload a file's text contents to the file service
    Upload { file: PathBuf },

    /// Upload the property image and metadata, then register the property
    Register {
        /// JSON property form (propertyName, valuation, ..., sensitive)
        #[arg(short, long)]
        form: PathBuf,
        /// Property image, sent as a base64 data URL
        #[arg(short, long)]
        image: PathBuf,
    },

    /// Transfer HBAR, e.g. `--amount 2.5`
    TransferHbar {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },

    /// Transfer a fungible token
    TransferToken {
        #[arg(long)]
        to: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        amount: u64,
    },

    /// Transfer one NFT serial
    TransferNft {
        #[arg(long)]
        to: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        serial: u64,
    },

    /// Associate the account with a token
    Associate {
        #[arg(long)]
        token: String,
    },

    /// Call a contract function
    Call {
        #[arg(long)]
        contract: String,
        #[arg(long)]
        function: String,
        /// JSON array of {"type", "name", "value": {"kind", "value"}}
        #[arg(long, default_value = "[]")]
        params: String,
        /// Gas limit; -1 lets the wallet estimate, other negatives are rejected
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        gas: i64,
    },

    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Validate configuration
    Validate,

    /// Write the default configuration
    Init {
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
        #[arg(long)]
        force: bool,
    },
}
