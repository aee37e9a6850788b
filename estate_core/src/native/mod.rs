// Native implementations

pub mod http;
pub mod operator;
pub mod rpc_provider;

pub use http::HttpFileService;
pub use operator::OperatorCredentials;
pub use rpc_provider::JsonRpcProvider;
