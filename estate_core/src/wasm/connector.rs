// WalletConnect pairing client handed in by the page
// The page wraps its DAppConnector so signers accept the frozen transaction
// as JSON and resolve with `{ transactionId, nodeId?, transactionHash? }`.

use crate::error::CoreError;
use crate::models::AccountId;
use crate::remote::{SessionConnector, SessionSigner, TransactionResponse};
use crate::transaction::FrozenTransaction;
use async_trait::async_trait;
use log::warn;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = DAppConnector)]
    pub type JsConnector;

    #[wasm_bindgen(method, catch)]
    async fn init(this: &JsConnector) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = openModal)]
    async fn open_modal(this: &JsConnector) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, getter)]
    fn signers(this: &JsConnector) -> js_sys::Array;

    #[wasm_bindgen(method, catch, js_name = disconnectAll)]
    async fn disconnect_all(this: &JsConnector) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_name = DAppSigner)]
    pub type JsSigner;

    #[wasm_bindgen(method, js_name = getAccountId)]
    fn get_account_id(this: &JsSigner) -> JsValue;

    #[wasm_bindgen(method, js_name = getNodeAccountIds)]
    fn get_node_account_ids(this: &JsSigner) -> js_sys::Array;

    #[wasm_bindgen(method, catch)]
    async fn call(this: &JsSigner, transaction: JsValue) -> Result<JsValue, JsValue>;
}

fn js_error(context: &str, err: JsValue) -> CoreError {
    let message = js_sys::Reflect::get(&err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", err));
    CoreError::Transaction(format!("{}: {}", context, message))
}

/// `toString()` of an SDK id object, or the string itself.
fn js_to_string(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| value.unchecked_ref::<js_sys::Object>().to_string().into())
}

struct PairedSigner {
    inner: JsSigner,
    account_id: AccountId,
}

#[async_trait(?Send)]
impl SessionSigner for PairedSigner {
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn node_account_ids(&self) -> Vec<AccountId> {
        self.inner
            .get_node_account_ids()
            .iter()
            .filter_map(|id| js_to_string(&id).parse().ok())
            .collect()
    }

    async fn call(&self, transaction: &FrozenTransaction) -> Result<Option<TransactionResponse>, CoreError> {
        let payload = transaction
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| CoreError::Encoding(format!("Failed to convert transaction: {}", e)))?;
        let response = self.inner.call(payload).await.map_err(|e| js_error("Signer rejected transaction", e))?;
        if response.is_undefined() || response.is_null() {
            return Ok(None);
        }
        let response: TransactionResponse = serde_wasm_bindgen::from_value(response)
            .map_err(|e| CoreError::ParseError(format!("Unexpected signer response: {}", e)))?;
        Ok(Some(response))
    }
}

pub struct JsDAppConnector {
    inner: JsConnector,
}

impl JsDAppConnector {
    pub fn new(connector: JsValue) -> Self {
        Self { inner: connector.unchecked_into() }
    }
}

#[async_trait(?Send)]
impl SessionConnector for JsDAppConnector {
    async fn init(&self) -> Result<(), CoreError> {
        self.inner.init().await.map(|_| ()).map_err(|e| js_error("WalletConnect init failed", e))
    }

    async fn open_modal(&self) -> Result<(), CoreError> {
        self.inner.open_modal().await.map(|_| ()).map_err(|e| js_error("WalletConnect modal failed", e))
    }

    fn signers(&self) -> Vec<Rc<dyn SessionSigner>> {
        self.inner
            .signers()
            .iter()
            .filter_map(|signer| {
                let signer: JsSigner = signer.unchecked_into();
                let raw = js_to_string(&signer.get_account_id());
                match raw.parse::<AccountId>() {
                    Ok(account_id) => Some(Rc::new(PairedSigner { inner: signer, account_id }) as Rc<dyn SessionSigner>),
                    Err(e) => {
                        warn!("Skipping signer with account {}: {}", raw, e);
                        None
                    }
                }
            })
            .collect()
    }

    async fn disconnect_all(&self) -> Result<(), CoreError> {
        self.inner.disconnect_all().await.map(|_| ()).map_err(|e| js_error("WalletConnect disconnect failed", e))
    }
}
