// Native injected-provider stand-in over HTTP JSON-RPC
// Talks to a relay whose node holds an unlocked account. Wallet-only methods
// are answered locally; the relay never pushes account changes.

use crate::error::CoreError;
use crate::injected::{AccountsChangedHandler, InjectedProvider};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::Cell;

/// EIP-1193 "unsupported method".
const UNSUPPORTED_METHOD: i64 = 4200;
/// EIP-1193 "chain disconnected".
const CHAIN_DISCONNECTED: i64 = 4901;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize, Debug)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self) -> Result<Value, CoreError> {
        match (self.error, self.result) {
            (Some(err), _) => Err(CoreError::Provider { code: err.code, message: err.message }),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

pub struct JsonRpcProvider {
    client: Client,
    endpoint: String,
    next_id: Cell<u64>,
}

impl JsonRpcProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: Client::new(), endpoint: endpoint.into(), next_id: Cell::new(1) }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, CoreError> {
        let id = self.next_id.replace(self.next_id.get() + 1);
        debug!("JSON-RPC {} #{} -> {}", method, id, self.endpoint);
        let response: RpcResponse = self
            .client
            .post(&self.endpoint)
            .json(&RpcRequest { jsonrpc: "2.0", id, method, params })
            .send()
            .await?
            .json()
            .await?;
        response.into_result()
    }

    /// Succeeds only when the relay already serves the requested chain.
    async fn switch_chain(&self, params: &Value) -> Result<Value, CoreError> {
        let wanted = params[0]["chainId"].as_str().unwrap_or_default().to_lowercase();
        let actual = self.call("eth_chainId", json!([])).await?;
        let actual = actual.as_str().unwrap_or_default().to_lowercase();
        if actual == wanted {
            Ok(Value::Null)
        } else {
            Err(CoreError::Provider {
                code: CHAIN_DISCONNECTED,
                message: format!("Relay serves chain {} not {}", actual, wanted),
            })
        }
    }
}

#[async_trait(?Send)]
impl InjectedProvider for JsonRpcProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, CoreError> {
        match method {
            "eth_requestAccounts" => self.call("eth_accounts", params).await,
            "wallet_switchEthereumChain" => self.switch_chain(&params).await,
            "wallet_addEthereumChain" => Err(CoreError::Provider {
                code: UNSUPPORTED_METHOD,
                message: "A JSON-RPC relay cannot add chains".to_string(),
            }),
            _ => self.call(method, params).await,
        }
    }

    fn on_accounts_changed(&self, _handler: AccountsChangedHandler) -> Result<(), CoreError> {
        debug!("JSON-RPC relay has no account notifications");
        Ok(())
    }

    fn remove_accounts_changed_listeners(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let req = RpcRequest { jsonrpc: "2.0", id: 7, method: "eth_chainId", params: json!([]) };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"jsonrpc": "2.0", "id": 7, "method": "eth_chainId", "params": []})
        );
    }

    #[test]
    fn test_error_response_carries_code() {
        let resp: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"error":{"code":4001,"message":"User rejected"}}"#)
                .unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.provider_code(), Some(4001));
    }

    #[test]
    fn test_result_response() {
        let resp: RpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":"0x128"}"#).unwrap();
        assert_eq!(resp.into_result().unwrap(), json!("0x128"));
    }

    #[tokio::test]
    async fn test_add_chain_is_unsupported_locally() {
        let provider = JsonRpcProvider::new("http://127.0.0.1:9");
        let err = provider.request("wallet_addEthereumChain", json!([{}])).await.unwrap_err();
        assert_eq!(err.provider_code(), Some(UNSUPPORTED_METHOD));
    }
}
