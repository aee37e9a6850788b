// Browser entry point for the wallet layer

use crate::{js_err, parse_backend, parse_params};
use estate_core::wasm::{FetchFileService, JsDAppConnector, WindowEthereum};
use estate_core::{
    AccountId, ContractId, GasLimit, Hbar, InjectedProvider, PropertyForm, SessionConnector, Settings, TokenId,
    TransactionResult, WalletContext, WalletInterface,
};
use log::{info, warn};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

fn parse<T: std::str::FromStr<Err = estate_core::CoreError>>(value: &str) -> Result<T, JsValue> {
    value.parse::<T>().map_err(js_err)
}

fn tx_result(result: TransactionResult) -> JsValue {
    result.map(JsValue::from).unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
pub struct EstateApp {
    ctx: WalletContext,
    files: FetchFileService,
}

#[wasm_bindgen]
impl EstateApp {
    /// `settings_json` follows the `Settings` layout; `connector` is the
    /// page's WalletConnect DAppConnector wrapper, or null.
    #[wasm_bindgen(constructor)]
    pub fn new(settings_json: &str, connector: JsValue) -> Result<EstateApp, JsValue> {
        let settings = Settings::from_json(settings_json).map_err(js_err)?;

        let provider: Option<Rc<dyn InjectedProvider>> = match WindowEthereum::detect() {
            Ok(ethereum) => Some(Rc::new(ethereum)),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        let connector: Option<Rc<dyn SessionConnector>> = if connector.is_undefined() || connector.is_null() {
            None
        } else {
            Some(Rc::new(JsDAppConnector::new(connector)))
        };

        let ctx = WalletContext::new(&settings, provider, connector).map_err(js_err)?;
        info!("Estate wallet layer ready on {}", settings.network.chain_name());
        Ok(Self { ctx, files: FetchFileService::new(settings.upload_endpoint.clone()) })
    }

    /// Pick up sessions the wallets already hold.
    pub async fn restore(&self) -> Result<JsValue, JsValue> {
        let account = self.ctx.restore().await.map_err(js_err)?;
        Ok(account.map(|a| JsValue::from(a.to_string())).unwrap_or(JsValue::NULL))
    }

    pub async fn connect(&self, backend: String) -> Result<JsValue, JsValue> {
        let kind = parse_backend(&backend).map_err(js_err)?;
        let account = self.ctx.connect(kind).await.map_err(js_err)?;
        Ok(account.map(|a| JsValue::from(a.to_string())).unwrap_or(JsValue::NULL))
    }

    pub async fn disconnect(&self) -> Result<(), JsValue> {
        self.ctx.disconnect().await.map_err(js_err)
    }

    /// `{ account, connected, backend }`
    pub fn session(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.ctx.session())
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize session: {}", e)))
    }

    pub fn account(&self) -> Option<String> {
        self.ctx.account().map(|a| a.to_string())
    }

    fn wallet(&self) -> Result<&dyn WalletInterface, JsValue> {
        self.ctx
            .active_wallet()
            .ok_or_else(|| JsValue::from_str("Wallet not connected"))
    }

    pub async fn transfer_hbar(&self, to: String, amount: String) -> Result<JsValue, JsValue> {
        let to: AccountId = parse(&to)?;
        let amount: Hbar = parse(&amount)?;
        Ok(tx_result(self.wallet()?.transfer_hbar(&to, amount).await))
    }

    pub async fn transfer_fungible_token(&self, to: String, token: String, amount: u64) -> Result<JsValue, JsValue> {
        let to: AccountId = parse(&to)?;
        let token: TokenId = parse(&token)?;
        Ok(tx_result(self.wallet()?.transfer_fungible_token(&to, token, amount).await))
    }

    pub async fn transfer_non_fungible_token(&self, to: String, token: String, serial: u64) -> Result<JsValue, JsValue> {
        let to: AccountId = parse(&to)?;
        let token: TokenId = parse(&token)?;
        Ok(tx_result(self.wallet()?.transfer_non_fungible_token(&to, token, serial).await))
    }

    pub async fn associate_token(&self, token: String) -> Result<JsValue, JsValue> {
        let token: TokenId = parse(&token)?;
        Ok(tx_result(self.wallet()?.associate_token(token).await))
    }

    /// `gas_limit` of -1 leaves the gas to the wallet; other negative values
    /// are rejected.
    pub async fn execute_contract_function(
        &self,
        contract: String,
        function_name: String,
        params_json: String,
        gas_limit: i64,
    ) -> Result<JsValue, JsValue> {
        let contract: ContractId = parse(&contract)?;
        let params = parse_params(&params_json).map_err(js_err)?;
        let gas = GasLimit::try_from(gas_limit).map_err(js_err)?;
        let result = self
            .wallet()?
            .execute_contract_function(contract, &function_name, params, gas)
            .await;
        Ok(tx_result(result))
    }

    /// Runs the upload-then-register workflow. `on_status` receives each
    /// status message; the final one is returned.
    pub async fn register_property(
        &self,
        form_json: String,
        image_data_url: String,
        on_status: js_sys::Function,
    ) -> Result<String, JsValue> {
        let form: PropertyForm = serde_json::from_str(&form_json)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse property form: {}", e)))?;
        let status = self
            .ctx
            .register_property(&self.files, &form, &image_data_url, |status| {
                if let Err(e) = on_status.call1(&JsValue::NULL, &JsValue::from_str(&status.to_string())) {
                    warn!("Status callback threw: {:?}", e);
                }
            })
            .await;
        Ok(status.to_string())
    }
}
