use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[cfg(feature = "native")]
    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),

    #[error("Initialization error: {0}")]
    Init(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Error reported by an injected provider, carrying its EIP-1193 code.
    #[error("Provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("MetaMask is not installed! Go install the extension!")]
    ProviderNotInstalled,

    #[error("No signers found!")]
    NoActiveSigner,

    #[error("Please disconnect using the MetaMask extension.")]
    ManualDisconnectRequired,

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// EIP-1193 code for a request the user rejected.
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// Code returned by `wallet_switchEthereumChain` when the chain is not known to the wallet.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

impl CoreError {
    pub fn provider_code(&self) -> Option<i64> {
        match self {
            CoreError::Provider { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[cfg(feature = "native")]
impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Http(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::TomlSerialization(err.to_string())
    }
}

impl From<alloy_dyn_abi::Error> for CoreError {
    fn from(err: alloy_dyn_abi::Error) -> Self {
        CoreError::Encoding(err.to_string())
    }
}
