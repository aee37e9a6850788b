// Native ledger transactions for the remote-session wallet
// Built with chained setters, frozen against a signer (which fixes the
// transaction id and node accounts), then executed by that same signer.

use crate::error::CoreError;
use crate::models::{AccountId, ContractId, GasLimit, Hbar, TokenId};
use crate::params::ContractFunctionParameterBuilder;
use crate::remote::{SessionSigner, TransactionResponse};
use alloy_primitives::hex;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

pub type TransactionBuildResult<T> = Result<T, CoreError>;

/// `payer@seconds.nanos`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub account_id: AccountId,
    pub valid_start: DateTime<Utc>,
}

impl TransactionId {
    pub fn generate(account_id: AccountId) -> Self {
        Self { account_id, valid_start: Utc::now() }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.account_id,
            self.valid_start.timestamp(),
            self.valid_start.timestamp_subsec_nanos()
        )
    }
}

impl Serialize for TransactionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HbarTransfer {
    pub account_id: AccountId,
    pub amount: Hbar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub token_id: TokenId,
    pub account_id: AccountId,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransfer {
    pub token_id: TokenId,
    pub serial: u64,
    pub sender: AccountId,
    pub receiver: AccountId,
}

/// Crypto transfer made of debit/credit legs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTransaction {
    pub hbar_transfers: Vec<HbarTransfer>,
    pub token_transfers: Vec<TokenTransfer>,
    pub nft_transfers: Vec<NftTransfer>,
}

impl TransferTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hbar_transfer(mut self, account_id: AccountId, amount: Hbar) -> Self {
        self.hbar_transfers.push(HbarTransfer { account_id, amount });
        self
    }

    pub fn add_token_transfer(mut self, token_id: TokenId, account_id: AccountId, amount: i64) -> Self {
        self.token_transfers.push(TokenTransfer { token_id, account_id, amount });
        self
    }

    pub fn add_nft_transfer(mut self, token_id: TokenId, serial: u64, sender: AccountId, receiver: AccountId) -> Self {
        self.nft_transfers.push(NftTransfer { token_id, serial, sender, receiver });
        self
    }

    /// HBAR legs and each token's legs sum to zero.
    pub fn is_balanced(&self) -> bool {
        let hbar_sum = self
            .hbar_transfers
            .iter()
            .try_fold(0i64, |acc, t| acc.checked_add(t.amount.to_tinybars()));
        if hbar_sum != Some(0) {
            return false;
        }
        let mut per_token: HashMap<TokenId, i64> = HashMap::new();
        for t in &self.token_transfers {
            let sum = per_token.entry(t.token_id).or_insert(0);
            match sum.checked_add(t.amount) {
                Some(next) => *sum = next,
                None => return false,
            }
        }
        per_token.values().all(|sum| *sum == 0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAssociateTransaction {
    pub account_id: Option<AccountId>,
    pub token_ids: Vec<TokenId>,
}

impl TokenAssociateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn set_token_ids(mut self, token_ids: Vec<TokenId>) -> Self {
        self.token_ids = token_ids;
        self
    }
}

fn hex_bytes<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractExecuteTransaction {
    pub contract_id: Option<ContractId>,
    /// `None` leaves the gas to the signer's default.
    pub gas: Option<u64>,
    pub function_name: String,
    #[serde(serialize_with = "hex_bytes")]
    pub function_parameters: Vec<u8>,
}

impl ContractExecuteTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_contract_id(mut self, contract_id: ContractId) -> Self {
        self.contract_id = Some(contract_id);
        self
    }

    pub fn set_gas(mut self, gas: GasLimit) -> Self {
        self.gas = gas.units();
        self
    }

    /// Encodes the call from the builder's signature and positional values.
    pub fn set_function(
        mut self,
        function_name: &str,
        params: &ContractFunctionParameterBuilder,
    ) -> TransactionBuildResult<Self> {
        self.function_parameters = params.encode_call(function_name)?;
        self.function_name = function_name.to_string();
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransactionBody {
    CryptoTransfer(TransferTransaction),
    TokenAssociate(TokenAssociateTransaction),
    ContractCall(ContractExecuteTransaction),
}

impl From<TransferTransaction> for TransactionBody {
    fn from(tx: TransferTransaction) -> Self {
        TransactionBody::CryptoTransfer(tx)
    }
}

impl From<TokenAssociateTransaction> for TransactionBody {
    fn from(tx: TokenAssociateTransaction) -> Self {
        TransactionBody::TokenAssociate(tx)
    }
}

impl From<ContractExecuteTransaction> for TransactionBody {
    fn from(tx: ContractExecuteTransaction) -> Self {
        TransactionBody::ContractCall(tx)
    }
}

impl TransactionBody {
    fn check(&self) -> TransactionBuildResult<()> {
        match self {
            TransactionBody::CryptoTransfer(tx) => {
                if tx.hbar_transfers.is_empty() && tx.token_transfers.is_empty() && tx.nft_transfers.is_empty() {
                    return Err(CoreError::Transaction("Transfer has no legs".to_string()));
                }
                if !tx.is_balanced() {
                    return Err(CoreError::Transaction("Transfer legs do not sum to zero".to_string()));
                }
            }
            TransactionBody::TokenAssociate(tx) => {
                if tx.account_id.is_none() || tx.token_ids.is_empty() {
                    return Err(CoreError::Transaction("Association needs an account and at least one token".to_string()));
                }
            }
            TransactionBody::ContractCall(tx) => {
                if tx.contract_id.is_none() || tx.function_parameters.is_empty() {
                    return Err(CoreError::Transaction("Contract call needs a contract and a function".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Fix the transaction id and node accounts from `signer`. The body
    /// cannot be changed afterwards.
    pub fn freeze_with_signer(self, signer: &dyn SessionSigner) -> TransactionBuildResult<FrozenTransaction> {
        self.check()?;
        let node_account_ids = signer.node_account_ids();
        if node_account_ids.is_empty() {
            return Err(CoreError::Transaction("Signer exposes no node accounts".to_string()));
        }
        Ok(FrozenTransaction {
            transaction_id: TransactionId::generate(signer.account_id()),
            node_account_ids,
            body: self,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenTransaction {
    transaction_id: TransactionId,
    node_account_ids: Vec<AccountId>,
    body: TransactionBody,
}

impl FrozenTransaction {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    /// Execute through the signer the transaction was frozen with.
    pub async fn execute_with_signer(
        &self,
        signer: &dyn SessionSigner,
    ) -> TransactionBuildResult<Option<TransactionResponse>> {
        if signer.account_id() != self.transaction_id.account_id {
            return Err(CoreError::Transaction(format!(
                "Transaction frozen for {} cannot be executed by {}",
                self.transaction_id.account_id,
                signer.account_id()
            )));
        }
        signer.call(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamType;

    #[test]
    fn test_balanced_transfer() {
        let a = AccountId::new(0, 0, 1);
        let b = AccountId::new(0, 0, 2);
        let amount = Hbar::new(5).unwrap();
        let tx = TransferTransaction::new().add_hbar_transfer(a, -amount).add_hbar_transfer(b, amount);
        assert!(tx.is_balanced());

        let lopsided = TransferTransaction::new().add_hbar_transfer(a, -amount);
        assert!(!lopsided.is_balanced());

        let token = TokenId::new(0, 0, 9);
        let tokens = TransferTransaction::new().add_token_transfer(token, a, -3).add_token_transfer(token, b, 3);
        assert!(tokens.is_balanced());
    }

    #[test]
    fn test_transaction_id_format() {
        let valid_start = DateTime::from_timestamp(1_700_000_000, 5).unwrap();
        let id = TransactionId { account_id: AccountId::new(0, 0, 42), valid_start };
        assert_eq!(id.to_string(), "0.0.42@1700000000.000000005");
    }

    #[test]
    fn test_contract_call_body_serializes_function_hex() {
        let params = ContractFunctionParameterBuilder::new().add_param(ParamType::Uint256, "amount", 1u64);
        let tx = ContractExecuteTransaction::new()
            .set_contract_id(ContractId::new(0, 0, 5))
            .set_gas(GasLimit::ProviderDefault)
            .set_function("deposit", &params)
            .unwrap();
        assert_eq!(tx.gas, None);
        let json = serde_json::to_value(TransactionBody::from(tx)).unwrap();
        assert_eq!(json["type"], "contractCall");
        assert!(json["functionParameters"].as_str().unwrap().starts_with("0x"));
        assert_eq!(json["contractId"], "0.0.5");
    }
}
