// WASM-specific implementations
pub mod connector;
pub mod ethereum;
pub mod http;

// Re-exports
pub use connector::JsDAppConnector;
pub use ethereum::WindowEthereum;
pub use http::FetchFileService;
