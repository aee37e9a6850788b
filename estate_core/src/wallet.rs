// Wallet capability interface
// Implemented by the injected-provider wallet and the remote-session wallet

use crate::error::CoreError;
use crate::models::{AccountId, ContractId, GasLimit, Hbar, TokenId, TransactionResult, WalletKind};
use crate::params::ContractFunctionParameterBuilder;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type WalletResult<T> = Result<T, CoreError>;

/// Operations every wallet backend supports.
///
/// Transfers, association and contract execution never return transport
/// errors: a rejected signature, network failure or missing signer is logged
/// by the backend and reported as `None`.
#[async_trait(?Send)]
pub trait WalletInterface {
    fn kind(&self) -> WalletKind;

    async fn transfer_hbar(&self, to: &AccountId, amount: Hbar) -> TransactionResult;

    async fn transfer_fungible_token(&self, to: &AccountId, token: TokenId, amount: u64) -> TransactionResult;

    async fn transfer_non_fungible_token(&self, to: &AccountId, token: TokenId, serial: u64) -> TransactionResult;

    async fn associate_token(&self, token: TokenId) -> TransactionResult;

    async fn execute_contract_function(
        &self,
        contract: ContractId,
        function_name: &str,
        params: ContractFunctionParameterBuilder,
        gas_limit: GasLimit,
    ) -> TransactionResult;

    /// May surface an error; the injected backend cannot disconnect
    /// programmatically and reports that instead.
    async fn disconnect(&self) -> WalletResult<()>;
}

/// Gas limits for the calls the injected backend routes through token contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasLimits {
    #[serde(default = "default_transfer_ft")]
    pub transfer_ft: u64,
    #[serde(default = "default_transfer_nft")]
    pub transfer_nft: u64,
    #[serde(default = "default_associate")]
    pub associate: u64,
    #[serde(default = "default_register_property")]
    pub register_property: u64,
}

impl Default for GasLimits {
    fn default() -> Self {
        Self {
            transfer_ft: default_transfer_ft(),
            transfer_nft: default_transfer_nft(),
            associate: default_associate(),
            register_property: default_register_property(),
        }
    }
}

fn default_transfer_ft() -> u64 { 50_000 }
fn default_transfer_nft() -> u64 { 100_000 }
fn default_associate() -> u64 { 800_000 }
fn default_register_property() -> u64 { 1_000_000 }
