// Injected-provider wallet (MetaMask through the JSON-RPC relay)
// Talks EIP-1193 to whatever provider it is given: window.ethereum in the
// browser, or an HTTP JSON-RPC endpoint natively.

use crate::error::{CoreError, UNRECOGNIZED_CHAIN, USER_REJECTED_REQUEST};
use crate::models::{AccountId, ContractId, GasLimit, Hbar, TokenId, TransactionResult, WalletKind};
use crate::params::{ContractFunctionParameterBuilder, EncodableValue, ParamType};
use crate::session::{SessionEvent, SessionSync};
use crate::settings::NetworkConfig;
use crate::wallet::{GasLimits, WalletInterface, WalletResult};
use alloy_primitives::hex;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

pub type AccountsChangedHandler = Box<dyn Fn(Vec<String>)>;

/// EIP-1193 style provider.
#[async_trait(?Send)]
pub trait InjectedProvider {
    /// Send a JSON-RPC request. Provider errors come back as
    /// [`CoreError::Provider`] carrying the provider's code.
    async fn request(&self, method: &str, params: Value) -> Result<Value, CoreError>;

    /// Register a handler for `accountsChanged` notifications. Providers
    /// without push notifications may ignore it.
    fn on_accounts_changed(&self, handler: AccountsChangedHandler) -> Result<(), CoreError>;

    fn remove_accounts_changed_listeners(&self);
}

/// First address of an `eth_requestAccounts` / `accountsChanged` list.
fn first_account(addresses: &[String]) -> Option<AccountId> {
    let first = addresses.first()?;
    match first.parse::<AccountId>() {
        Ok(account) => Some(account),
        Err(e) => {
            warn!("Ignoring unparsable wallet address {}: {}", first, e);
            None
        }
    }
}

pub struct InjectedWallet {
    provider: Rc<dyn InjectedProvider>,
    network: NetworkConfig,
    gas_limits: GasLimits,
    sync: SessionSync,
    listening: Cell<bool>,
}

impl InjectedWallet {
    pub fn new(
        provider: Rc<dyn InjectedProvider>,
        network: NetworkConfig,
        gas_limits: GasLimits,
        sync: SessionSync,
    ) -> Self {
        Self { provider, network, gas_limits, sync, listening: Cell::new(false) }
    }

    /// Register the `accountsChanged` listener, once.
    pub fn listen(&self) -> WalletResult<()> {
        if !self.listening.get() {
            let sync = self.sync.clone();
            self.provider.on_accounts_changed(Box::new(move |addresses: Vec<String>| {
                debug!("accountsChanged: {:?}", addresses);
                sync.publish(SessionEvent::new(WalletKind::Injected, first_account(&addresses)));
            }))?;
            self.listening.set(true);
        }
        Ok(())
    }

    /// Start listening for account changes and publish the accounts the
    /// wallet already exposes.
    pub async fn init(&self) -> WalletResult<Option<AccountId>> {
        self.listen()?;
        Ok(self.refresh_accounts().await)
    }

    /// Drop the provider listeners registered by [`Self::listen`].
    pub fn shutdown(&self) {
        if self.listening.replace(false) {
            self.provider.remove_accounts_changed_listeners();
        }
    }

    /// Switch the wallet to the configured chain, then request accounts.
    /// Returns the connected account; any failure is logged and leaves the
    /// session without an account.
    pub async fn connect(&self) -> Option<AccountId> {
        if let Err(e) = self.switch_network().await {
            error!("Could not switch wallet to {}: {}", self.network.chain_name(), e);
            self.sync.publish(SessionEvent::new(WalletKind::Injected, None));
            return None;
        }
        self.refresh_accounts().await
    }

    /// `wallet_switchEthereumChain`; an unknown chain is registered once and
    /// the switch retried.
    pub async fn switch_network(&self) -> WalletResult<()> {
        match self.request_switch().await {
            Err(e) if e.provider_code() == Some(UNRECOGNIZED_CHAIN) => {
                info!("Wallet does not know chain {}, registering it", self.network.chain_id);
                self.provider
                    .request(
                        "wallet_addEthereumChain",
                        json!([{
                            "chainName": self.network.chain_name(),
                            "chainId": self.network.chain_id,
                            "nativeCurrency": { "name": "HBAR", "symbol": "HBAR", "decimals": 18 },
                            "rpcUrls": [self.network.json_rpc_url],
                        }]),
                    )
                    .await?;
                self.request_switch().await
            }
            other => other,
        }
    }

    async fn request_switch(&self) -> WalletResult<()> {
        self.provider
            .request("wallet_switchEthereumChain", json!([{ "chainId": self.network.chain_id }]))
            .await
            .map(|_| ())
    }

    async fn request_accounts(&self) -> WalletResult<Vec<String>> {
        let value = self.provider.request("eth_requestAccounts", json!([])).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ask the wallet for its accounts and publish the first one (or none).
    pub async fn refresh_accounts(&self) -> Option<AccountId> {
        let addresses = match self.request_accounts().await {
            Ok(addresses) => addresses,
            Err(e) if e.provider_code() == Some(USER_REJECTED_REQUEST) => {
                warn!("Please connect to MetaMask.");
                Vec::new()
            }
            Err(e) => {
                error!("eth_requestAccounts failed: {}", e);
                Vec::new()
            }
        };
        let account = first_account(&addresses);
        self.sync.publish(SessionEvent::new(WalletKind::Injected, account));
        account
    }

    async fn signer_address(&self) -> WalletResult<String> {
        let addresses = self.request_accounts().await?;
        first_account(&addresses)
            .map(|account| account.to_solidity_address())
            .ok_or(CoreError::NoActiveSigner)
    }

    async fn send_transaction(&self, tx: Value) -> WalletResult<String> {
        debug!("eth_sendTransaction {}", tx);
        let hash = self.provider.request("eth_sendTransaction", json!([tx])).await?;
        hash.as_str()
            .map(str::to_string)
            .ok_or_else(|| CoreError::Transaction(format!("Unexpected transaction hash: {}", hash)))
    }

    async fn try_transfer_hbar(&self, to: &AccountId, amount: Hbar) -> WalletResult<String> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidInput(format!("Transfer amount must be positive, got {}", amount)));
        }
        let tx = json!({
            "from": self.signer_address().await?,
            "to": to.to_solidity_address(),
            "value": format!("0x{:x}", amount.to_weibars()?),
        });
        self.send_transaction(tx).await
    }

    async fn try_execute(
        &self,
        contract: ContractId,
        function_name: &str,
        params: &ContractFunctionParameterBuilder,
        gas_limit: GasLimit,
    ) -> WalletResult<String> {
        let data = params.encode_call(function_name)?;
        let mut tx = json!({
            "from": self.signer_address().await?,
            "to": contract.to_solidity_address(),
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(gas) = gas_limit.units() {
            tx["gas"] = Value::String(format!("0x{:x}", gas));
        }
        self.send_transaction(tx).await
    }
}

fn swallow(operation: &str, result: WalletResult<String>) -> TransactionResult {
    match result {
        Ok(hash) => {
            info!("{} submitted: {}", operation, hash);
            Some(hash)
        }
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            None
        }
    }
}

#[async_trait(?Send)]
impl WalletInterface for InjectedWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Injected
    }

    async fn transfer_hbar(&self, to: &AccountId, amount: Hbar) -> TransactionResult {
        swallow("HBAR transfer", self.try_transfer_hbar(to, amount).await)
    }

    async fn transfer_fungible_token(&self, to: &AccountId, token: TokenId, amount: u64) -> TransactionResult {
        let params = ContractFunctionParameterBuilder::new()
            .add_param(ParamType::Address, "recipient", EncodableValue::address(to))
            .add_param(ParamType::Uint256, "amount", amount);
        self.execute_contract_function(token.into(), "transfer", params, self.gas_limits.transfer_ft.into())
            .await
    }

    async fn transfer_non_fungible_token(&self, to: &AccountId, token: TokenId, serial: u64) -> TransactionResult {
        let from = match self.signer_address().await {
            Ok(from) => from,
            Err(e) => {
                warn!("NFT transfer failed: {}", e);
                return None;
            }
        };
        let params = ContractFunctionParameterBuilder::new()
            .add_param(ParamType::Address, "from", EncodableValue::Address(from))
            .add_param(ParamType::Address, "to", EncodableValue::address(to))
            .add_param(ParamType::Uint256, "nftId", serial);
        self.execute_contract_function(token.into(), "transferFrom", params, self.gas_limits.transfer_nft.into())
            .await
    }

    async fn associate_token(&self, token: TokenId) -> TransactionResult {
        self.execute_contract_function(
            token.into(),
            "associate",
            ContractFunctionParameterBuilder::new(),
            self.gas_limits.associate.into(),
        )
        .await
    }

    async fn execute_contract_function(
        &self,
        contract: ContractId,
        function_name: &str,
        params: ContractFunctionParameterBuilder,
        gas_limit: GasLimit,
    ) -> TransactionResult {
        let operation = format!("{}() on {}", function_name, contract);
        swallow(&operation, self.try_execute(contract, function_name, &params, gas_limit).await)
    }

    async fn disconnect(&self) -> WalletResult<()> {
        // The injected-provider protocol has no programmatic disconnect.
        Err(CoreError::ManualDisconnectRequired)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::SessionStore;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    pub(crate) const ALICE: &str = "0x00000000000000000000000000000000000003e9";

    /// Scripted provider: answers each method from a queue and records every request.
    #[derive(Default)]
    pub(crate) struct MockProvider {
        pub responses: RefCell<HashMap<String, VecDeque<Result<Value, i64>>>>,
        pub requests: RefCell<Vec<(String, Value)>>,
        pub handler: RefCell<Option<AccountsChangedHandler>>,
    }

    impl MockProvider {
        pub fn respond(&self, method: &str, response: Result<Value, i64>) {
            self.responses.borrow_mut().entry(method.to_string()).or_default().push_back(response);
        }

        pub fn methods(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|(m, _)| m.clone()).collect()
        }

        pub fn last_params(&self, method: &str) -> Option<Value> {
            self.requests.borrow().iter().rev().find(|(m, _)| m == method).map(|(_, p)| p.clone())
        }

        pub fn emit_accounts(&self, addresses: &[&str]) {
            if let Some(handler) = self.handler.borrow().as_ref() {
                handler(addresses.iter().map(|a| a.to_string()).collect());
            }
        }
    }

    #[async_trait(?Send)]
    impl InjectedProvider for MockProvider {
        async fn request(&self, method: &str, params: Value) -> Result<Value, CoreError> {
            self.requests.borrow_mut().push((method.to_string(), params));
            let next = self.responses.borrow_mut().get_mut(method).and_then(|q| q.pop_front());
            match next {
                Some(Ok(value)) => Ok(value),
                Some(Err(code)) => Err(CoreError::Provider { code, message: format!("{} failed", method) }),
                None => Err(CoreError::Provider { code: -32601, message: format!("{} not scripted", method) }),
            }
        }

        fn on_accounts_changed(&self, handler: AccountsChangedHandler) -> Result<(), CoreError> {
            *self.handler.borrow_mut() = Some(handler);
            Ok(())
        }

        fn remove_accounts_changed_listeners(&self) {
            self.handler.borrow_mut().take();
        }
    }

    fn wallet_with(provider: &Rc<MockProvider>) -> (InjectedWallet, SessionStore) {
        let sync = SessionSync::new();
        let store = SessionStore::bind(&sync).unwrap();
        let wallet = InjectedWallet::new(provider.clone(), NetworkConfig::testnet(), GasLimits::default(), sync);
        (wallet, store)
    }

    #[tokio::test]
    async fn test_unknown_chain_registered_once_then_gives_up() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("wallet_switchEthereumChain", Err(UNRECOGNIZED_CHAIN));
        provider.respond("wallet_addEthereumChain", Ok(Value::Null));
        provider.respond("wallet_switchEthereumChain", Err(UNRECOGNIZED_CHAIN));
        let (wallet, store) = wallet_with(&provider);

        assert_eq!(wallet.connect().await, None);
        assert_eq!(
            provider.methods(),
            vec!["wallet_switchEthereumChain", "wallet_addEthereumChain", "wallet_switchEthereumChain"]
        );
        assert_eq!(store.account(), None);
        assert!(!store.is_connected());

        let add = provider.last_params("wallet_addEthereumChain").unwrap();
        assert_eq!(add[0]["chainId"], "0x128");
        assert_eq!(add[0]["chainName"], "Hedera (testnet)");
        assert_eq!(add[0]["nativeCurrency"]["decimals"], 18);
        assert_eq!(add[0]["rpcUrls"][0], "https://testnet.hashio.io/api");
    }

    #[tokio::test]
    async fn test_failed_switch_clears_existing_session() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("wallet_switchEthereumChain", Err(USER_REJECTED_REQUEST));
        let (wallet, store) = wallet_with(&provider);
        wallet.listen().unwrap();
        provider.emit_accounts(&[ALICE]);
        assert!(store.is_connected());

        assert_eq!(wallet.connect().await, None);
        assert_eq!(store.account(), None);
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_unknown_chain_registered_then_connects() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("wallet_switchEthereumChain", Err(UNRECOGNIZED_CHAIN));
        provider.respond("wallet_addEthereumChain", Ok(Value::Null));
        provider.respond("wallet_switchEthereumChain", Ok(Value::Null));
        provider.respond("eth_requestAccounts", Ok(json!([ALICE])));
        let (wallet, store) = wallet_with(&provider);

        let account = wallet.connect().await.unwrap();
        assert_eq!(account.to_solidity_address(), ALICE);
        assert_eq!(store.account(), Some(account));
        assert_eq!(store.active_backend(), Some(WalletKind::Injected));
    }

    #[tokio::test]
    async fn test_other_switch_errors_do_not_register_chain() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("wallet_switchEthereumChain", Err(USER_REJECTED_REQUEST));
        let (wallet, store) = wallet_with(&provider);

        assert_eq!(wallet.connect().await, None);
        assert_eq!(provider.methods(), vec!["wallet_switchEthereumChain"]);
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_accounts_changed_updates_session() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("eth_requestAccounts", Ok(json!([])));
        let (wallet, store) = wallet_with(&provider);

        assert_eq!(wallet.init().await.unwrap(), None);
        provider.emit_accounts(&[ALICE]);
        assert_eq!(store.account().map(|a| a.to_solidity_address()), Some(ALICE.to_string()));

        provider.emit_accounts(&[]);
        assert_eq!(store.account(), None);

        wallet.shutdown();
        assert!(provider.handler.borrow().is_none());
    }

    #[tokio::test]
    async fn test_gas_sentinel_omits_gas_field() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("eth_requestAccounts", Ok(json!([ALICE])));
        provider.respond("eth_sendTransaction", Ok(json!("0xabc")));
        let (wallet, _store) = wallet_with(&provider);

        let params = ContractFunctionParameterBuilder::new().add_param(ParamType::Bool, "flag", true);
        let hash = wallet
            .execute_contract_function(ContractId::new(0, 0, 5005), "setFlag", params, GasLimit::ProviderDefault)
            .await;
        assert_eq!(hash.as_deref(), Some("0xabc"));

        let sent = provider.last_params("eth_sendTransaction").unwrap();
        assert!(sent[0].get("gas").is_none());
        assert_eq!(sent[0]["to"], "0x000000000000000000000000000000000000138d");
        assert_eq!(sent[0]["from"], ALICE);
    }

    #[tokio::test]
    async fn test_token_transfer_forwards_gas_limit() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("eth_requestAccounts", Ok(json!([ALICE])));
        provider.respond("eth_sendTransaction", Ok(json!("0xfeed")));
        let (wallet, _store) = wallet_with(&provider);

        let hash = wallet.transfer_fungible_token(&AccountId::new(0, 0, 2), TokenId::new(0, 0, 77), 10).await;
        assert_eq!(hash.as_deref(), Some("0xfeed"));

        let sent = provider.last_params("eth_sendTransaction").unwrap();
        assert_eq!(sent[0]["gas"], "0xc350");
        assert!(sent[0]["data"].as_str().unwrap().starts_with("0xa9059cbb"));
    }

    #[tokio::test]
    async fn test_hbar_transfer_value_in_weibars() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("eth_requestAccounts", Ok(json!([ALICE])));
        provider.respond("eth_sendTransaction", Ok(json!("0x01")));
        let (wallet, _store) = wallet_with(&provider);

        let to: AccountId = "0.0.1002".parse().unwrap();
        assert!(wallet.transfer_hbar(&to, Hbar::new(5).unwrap()).await.is_some());
        let sent = provider.last_params("eth_sendTransaction").unwrap();
        assert_eq!(sent[0]["value"], "0x4563918244f40000");
        assert_eq!(sent[0]["to"], "0x00000000000000000000000000000000000003ea");
    }

    #[tokio::test]
    async fn test_rejected_signature_becomes_none() {
        let provider = Rc::new(MockProvider::default());
        provider.respond("eth_requestAccounts", Ok(json!([ALICE])));
        provider.respond("eth_sendTransaction", Err(USER_REJECTED_REQUEST));
        let (wallet, _store) = wallet_with(&provider);

        assert_eq!(wallet.associate_token(TokenId::new(0, 0, 9)).await, None);
    }

    #[tokio::test]
    async fn test_disconnect_requires_manual_action() {
        let provider = Rc::new(MockProvider::default());
        let (wallet, _store) = wallet_with(&provider);

        let err = wallet.disconnect().await.unwrap_err();
        assert_eq!(err.to_string(), "Please disconnect using the MetaMask extension.");
        assert!(provider.methods().is_empty());
    }
}
