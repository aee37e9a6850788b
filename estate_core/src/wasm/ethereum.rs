// window.ethereum as an injected provider

use crate::error::CoreError;
use crate::injected::{AccountsChangedHandler, InjectedProvider};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

const ACCOUNTS_CHANGED: &str = "accountsChanged";

pub struct WindowEthereum {
    ethereum: JsValue,
    listeners: RefCell<Vec<Closure<dyn FnMut(JsValue)>>>,
}

fn to_js(value: &Value) -> Result<JsValue, CoreError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| CoreError::Encoding(format!("Failed to convert request: {}", e)))
}

fn provider_error(err: JsValue) -> CoreError {
    let code = js_sys::Reflect::get(&err, &JsValue::from_str("code"))
        .ok()
        .and_then(|c| c.as_f64())
        .map(|c| c as i64)
        .unwrap_or(-32603);
    let message = js_sys::Reflect::get(&err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", err));
    CoreError::Provider { code, message }
}

impl WindowEthereum {
    /// Fails with [`CoreError::ProviderNotInstalled`] when the page has no
    /// `window.ethereum`.
    pub fn detect() -> Result<Self, CoreError> {
        let window = web_sys::window().ok_or_else(|| CoreError::Init("No window object available".to_string()))?;
        let ethereum = js_sys::Reflect::get(&window, &JsValue::from_str("ethereum"))
            .map_err(|_| CoreError::ProviderNotInstalled)?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return Err(CoreError::ProviderNotInstalled);
        }
        Ok(Self { ethereum, listeners: RefCell::new(Vec::new()) })
    }

    fn method(&self, name: &str) -> Result<js_sys::Function, CoreError> {
        js_sys::Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<js_sys::Function>().ok())
            .ok_or_else(|| CoreError::Init(format!("window.ethereum.{} is not a function", name)))
    }
}

#[async_trait(?Send)]
impl InjectedProvider for WindowEthereum {
    async fn request(&self, method: &str, params: Value) -> Result<Value, CoreError> {
        debug!("window.ethereum.request {}", method);
        let args = to_js(&json!({ "method": method, "params": params }))?;
        let promise = self
            .method("request")?
            .call1(&self.ethereum, &args)
            .map_err(provider_error)?
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| CoreError::Init("window.ethereum.request did not return a promise".to_string()))?;
        let result = JsFuture::from(promise).await.map_err(provider_error)?;
        if result.is_undefined() {
            return Ok(Value::Null);
        }
        serde_wasm_bindgen::from_value(result)
            .map_err(|e| CoreError::ParseError(format!("Unexpected {} result: {}", method, e)))
    }

    fn on_accounts_changed(&self, handler: AccountsChangedHandler) -> Result<(), CoreError> {
        let closure = Closure::wrap(Box::new(move |accounts: JsValue| {
            let accounts: Vec<String> = serde_wasm_bindgen::from_value(accounts).unwrap_or_default();
            handler(accounts);
        }) as Box<dyn FnMut(JsValue)>);
        self.method("on")?
            .call2(&self.ethereum, &JsValue::from_str(ACCOUNTS_CHANGED), closure.as_ref())
            .map_err(provider_error)?;
        self.listeners.borrow_mut().push(closure);
        Ok(())
    }

    fn remove_accounts_changed_listeners(&self) {
        if let Ok(remove) = self.method("removeAllListeners") {
            let _ = remove.call1(&self.ethereum, &JsValue::from_str(ACCOUNTS_CHANGED));
        }
        self.listeners.borrow_mut().clear();
    }
}
