// Estate Ledger Core Library
// Wallet capability layer and property registration workflow

pub mod error;
pub mod models;
pub mod params;
pub mod settings;
pub mod wallet;
pub mod init_guard;
pub mod session;
pub mod transaction;
pub mod injected;
pub mod remote;
pub mod file_service;
pub mod registration;
pub mod context;

#[cfg(feature = "native")]
pub mod native;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

// Re-exports
pub use context::WalletContext;
pub use error::CoreError;
pub use file_service::{upload_property_metadata, FileId, FileService};
pub use injected::{InjectedProvider, InjectedWallet};
pub use models::*;
pub use params::{ContractFunctionParameterBuilder, EncodableValue, ParamType};
pub use registration::{PropertyForm, PropertyRegistrar, RegistrationStatus, SensitiveDetails};
pub use remote::{RemoteWallet, SessionConnector, SessionSigner};
pub use session::{SessionEvent, SessionStore, SessionSync, WalletSession};
pub use settings::Settings;
pub use wallet::{GasLimits, WalletInterface, WalletResult};
