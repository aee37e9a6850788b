// Estate Ledger WASM Bindings
// Browser wallet layer: MetaMask through window.ethereum, WalletConnect
// through the page's DAppConnector, uploads through fetch.

use estate_core::params::FunctionParameter;
use estate_core::{ContractFunctionParameterBuilder, CoreError, WalletKind};
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
pub use app::EstateApp;

// Initialize panic hook and logger for WASM
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

pub(crate) fn js_err(err: CoreError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// `metamask` / `walletconnect`, as the page names the two buttons.
pub(crate) fn parse_backend(name: &str) -> Result<WalletKind, CoreError> {
    match name.to_ascii_lowercase().as_str() {
        "metamask" | "injected" => Ok(WalletKind::Injected),
        "walletconnect" | "remote" => Ok(WalletKind::Remote),
        other => Err(CoreError::InvalidInput(format!("Unknown wallet backend: {}", other))),
    }
}

/// `[{"type": "uint256", "name": "amount", "value": {"kind": "uint", "value": "0x1"}}, ...]`
pub(crate) fn parse_params(params_json: &str) -> Result<ContractFunctionParameterBuilder, CoreError> {
    let params: Vec<FunctionParameter> = serde_json::from_str(params_json)?;
    Ok(params
        .into_iter()
        .fold(ContractFunctionParameterBuilder::new(), |builder, p| builder.add_param(p.ty, p.name, p.value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(parse_backend("MetaMask").unwrap(), WalletKind::Injected);
        assert_eq!(parse_backend("walletconnect").unwrap(), WalletKind::Remote);
        assert!(parse_backend("ledger").is_err());
    }

    #[test]
    fn test_parse_params_keeps_order() {
        let json = r#"[
            {"type": "address", "name": "to", "value": {"kind": "address", "value": "0x00000000000000000000000000000000000003ea"}},
            {"type": "bool", "name": "flag", "value": {"kind": "bool", "value": true}}
        ]"#;
        let builder = parse_params(json).unwrap();
        assert_eq!(builder.build_signature_params(), "address to,bool flag");
        assert!(parse_params("{}").is_err());
    }
}
