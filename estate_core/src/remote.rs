// Remote-session wallet (WalletConnect)
// Transactions are built natively, frozen against the paired signer and
// executed through it. Pairing happens once per process.

use crate::error::CoreError;
use crate::init_guard::{InitGuard, InitStatus};
use crate::models::{AccountId, ContractId, GasLimit, Hbar, TokenId, TransactionResult, WalletKind};
use crate::params::ContractFunctionParameterBuilder;
use crate::session::{SessionEvent, SessionSync};
use crate::transaction::{
    ContractExecuteTransaction, FrozenTransaction, TokenAssociateTransaction, TransactionBody, TransferTransaction,
};
use crate::wallet::{WalletInterface, WalletResult};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// What a signer reports back after submitting a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub transaction_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// Account paired through a remote session.
#[async_trait(?Send)]
pub trait SessionSigner {
    fn account_id(&self) -> AccountId;

    /// Nodes the signer submits through; used when freezing.
    fn node_account_ids(&self) -> Vec<AccountId>;

    /// Sign and submit. `Ok(None)` means the wallet accepted the request
    /// but returned no response.
    async fn call(&self, transaction: &FrozenTransaction) -> Result<Option<TransactionResponse>, CoreError>;
}

/// Pairing client the remote wallet drives.
#[async_trait(?Send)]
pub trait SessionConnector {
    async fn init(&self) -> Result<(), CoreError>;

    /// Resolves once the pairing modal has been closed.
    async fn open_modal(&self) -> Result<(), CoreError>;

    fn signers(&self) -> Vec<Rc<dyn SessionSigner>>;

    async fn disconnect_all(&self) -> Result<(), CoreError>;
}

pub struct RemoteWallet {
    connector: Rc<dyn SessionConnector>,
    init: InitGuard,
    sync: SessionSync,
}

impl RemoteWallet {
    pub fn new(connector: Rc<dyn SessionConnector>, sync: SessionSync) -> Self {
        Self { connector, init: InitGuard::new(), sync }
    }

    pub fn init_status(&self) -> InitStatus {
        self.init.status()
    }

    async fn ensure_initialized(&self) -> WalletResult<()> {
        let connector = self.connector.clone();
        self.init
            .ensure_initialized(move || async move {
                info!("Initializing WalletConnect pairing client");
                connector.init().await
            })
            .await
    }

    /// Initialize the pairing client and publish any restored session.
    pub async fn initialize(&self) -> WalletResult<Option<AccountId>> {
        self.ensure_initialized().await?;
        Ok(self.sync())
    }

    /// Open the pairing modal and publish the session once it closes.
    pub async fn connect(&self) -> Option<AccountId> {
        if let Err(e) = self.ensure_initialized().await {
            error!("WalletConnect initialization failed: {}", e);
            return None;
        }
        match self.connector.open_modal().await {
            Ok(()) => self.sync(),
            Err(e) => {
                error!("WalletConnect pairing failed: {}", e);
                None
            }
        }
    }

    /// Publish the first paired signer's account, or no account.
    pub fn sync(&self) -> Option<AccountId> {
        let account = self.connector.signers().first().map(|s| s.account_id());
        debug!("WalletConnect session: {:?}", account.map(|a| a.to_string()));
        self.sync.publish(SessionEvent::new(WalletKind::Remote, account));
        account
    }

    /// The first paired signer.
    pub fn signer(&self) -> WalletResult<Rc<dyn SessionSigner>> {
        self.connector.signers().into_iter().next().ok_or(CoreError::NoActiveSigner)
    }

    /// Build with the signer's account, freeze, execute through the same signer.
    async fn submit<F>(&self, build: F) -> WalletResult<Option<String>>
    where
        F: FnOnce(AccountId) -> WalletResult<TransactionBody>,
    {
        let signer = self.signer()?;
        let body = build(signer.account_id())?;
        let frozen = body.freeze_with_signer(signer.as_ref())?;
        debug!("Executing {} through {}", frozen.transaction_id(), signer.account_id());
        let response = frozen.execute_with_signer(signer.as_ref()).await?;
        Ok(response.map(|r| r.transaction_id))
    }
}

fn report(operation: &str, result: WalletResult<Option<String>>) -> TransactionResult {
    match result {
        Ok(Some(id)) => {
            info!("{} submitted: {}", operation, id);
            Some(id)
        }
        Ok(None) => {
            warn!("{} returned no response", operation);
            None
        }
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            None
        }
    }
}

#[async_trait(?Send)]
impl WalletInterface for RemoteWallet {
    fn kind(&self) -> WalletKind {
        WalletKind::Remote
    }

    async fn transfer_hbar(&self, to: &AccountId, amount: Hbar) -> TransactionResult {
        let to = *to;
        let result = self
            .submit(|me| {
                if !amount.is_positive() {
                    return Err(CoreError::InvalidInput(format!("HBAR amount must be positive: {}", amount)));
                }
                Ok(TransferTransaction::new()
                    .add_hbar_transfer(me, -amount)
                    .add_hbar_transfer(to, amount)
                    .into())
            })
            .await;
        report("HBAR transfer", result)
    }

    async fn transfer_fungible_token(&self, to: &AccountId, token: TokenId, amount: u64) -> TransactionResult {
        let to = *to;
        let result = self
            .submit(|me| {
                let amount = i64::try_from(amount)
                    .map_err(|_| CoreError::InvalidInput(format!("Token amount out of range: {}", amount)))?;
                Ok(TransferTransaction::new()
                    .add_token_transfer(token, me, -amount)
                    .add_token_transfer(token, to, amount)
                    .into())
            })
            .await;
        report("Token transfer", result)
    }

    async fn transfer_non_fungible_token(&self, to: &AccountId, token: TokenId, serial: u64) -> TransactionResult {
        let to = *to;
        let result = self
            .submit(|me| Ok(TransferTransaction::new().add_nft_transfer(token, serial, me, to).into()))
            .await;
        report("NFT transfer", result)
    }

    async fn associate_token(&self, token: TokenId) -> TransactionResult {
        let result = self
            .submit(|me| {
                Ok(TokenAssociateTransaction::new()
                    .set_account_id(me)
                    .set_token_ids(vec![token])
                    .into())
            })
            .await;
        report("Token association", result)
    }

    async fn execute_contract_function(
        &self,
        contract: ContractId,
        function_name: &str,
        params: ContractFunctionParameterBuilder,
        gas_limit: GasLimit,
    ) -> TransactionResult {
        let result = self
            .submit(|_| {
                Ok(ContractExecuteTransaction::new()
                    .set_contract_id(contract)
                    .set_gas(gas_limit)
                    .set_function(function_name, &params)?
                    .into())
            })
            .await;
        report(&format!("{}() on {}", function_name, contract), result)
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.connector.disconnect_all().await?;
        self.sync();
        Ok(())
    }
}
