// Contract function parameter builder
// Accumulates typed, named arguments and renders the two encodings the wallet
// backends need: an ABI signature fragment and the positional values.

use crate::error::CoreError;
use crate::models::AccountId;
use alloy_dyn_abi::{DynSolValue, JsonAbiExt};
use alloy_json_abi::Function;
use alloy_primitives::{Address, B256, I256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type ParamResult<T> = Result<T, CoreError>;

/// Solidity type of a function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Address,
    Uint256,
    Uint64,
    Uint32,
    Int64,
    Bool,
    String,
    Bytes,
    Bytes32,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Address => "address",
            ParamType::Uint256 => "uint256",
            ParamType::Uint64 => "uint64",
            ParamType::Uint32 => "uint32",
            ParamType::Int64 => "int64",
            ParamType::Bool => "bool",
            ParamType::String => "string",
            ParamType::Bytes => "bytes",
            ParamType::Bytes32 => "bytes32",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EncodableValue {
    /// `0x`-prefixed EVM address.
    Address(String),
    Uint(U256),
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    FixedBytes(B256),
    String(String),
}

impl EncodableValue {
    pub fn address(account: &AccountId) -> Self {
        EncodableValue::Address(account.to_solidity_address())
    }
}

impl From<bool> for EncodableValue {
    fn from(value: bool) -> Self {
        EncodableValue::Bool(value)
    }
}

impl From<u64> for EncodableValue {
    fn from(value: u64) -> Self {
        EncodableValue::Uint(U256::from(value))
    }
}

impl From<U256> for EncodableValue {
    fn from(value: U256) -> Self {
        EncodableValue::Uint(value)
    }
}

impl From<i64> for EncodableValue {
    fn from(value: i64) -> Self {
        EncodableValue::Int(value)
    }
}

impl From<&str> for EncodableValue {
    fn from(value: &str) -> Self {
        EncodableValue::String(value.to_string())
    }
}

impl From<String> for EncodableValue {
    fn from(value: String) -> Self {
        EncodableValue::String(value)
    }
}

impl From<Vec<u8>> for EncodableValue {
    fn from(value: Vec<u8>) -> Self {
        EncodableValue::Bytes(value)
    }
}

impl From<B256> for EncodableValue {
    fn from(value: B256) -> Self {
        EncodableValue::FixedBytes(value)
    }
}

impl From<Address> for EncodableValue {
    fn from(value: Address) -> Self {
        EncodableValue::Address(format!("0x{}", alloy_primitives::hex::encode(value)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameter {
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub name: String,
    pub value: EncodableValue,
}

/// Pair a declared type with its positional value for ABI encoding.
fn dyn_value(ty: ParamType, name: &str, value: &EncodableValue) -> ParamResult<DynSolValue> {
    let mismatch = || CoreError::Encoding(format!("Parameter '{}' declared as {} but value is {:?}", name, ty, value));
    let value = match (ty, value) {
        (ParamType::Address, EncodableValue::Address(addr)) => {
            let addr = Address::from_str(addr)
                .map_err(|e| CoreError::Encoding(format!("Invalid address for '{}': {}", name, e)))?;
            DynSolValue::Address(addr)
        }
        (ParamType::Uint256, EncodableValue::Uint(v)) => DynSolValue::Uint(*v, 256),
        (ParamType::Uint64, EncodableValue::Uint(v)) if v.bit_len() <= 64 => DynSolValue::Uint(*v, 64),
        (ParamType::Uint32, EncodableValue::Uint(v)) if v.bit_len() <= 32 => DynSolValue::Uint(*v, 32),
        (ParamType::Int64, EncodableValue::Int(v)) => {
            let signed = I256::try_from(*v).map_err(|_| mismatch())?;
            DynSolValue::Int(signed, 64)
        }
        (ParamType::Bool, EncodableValue::Bool(b)) => DynSolValue::Bool(*b),
        (ParamType::String, EncodableValue::String(s)) => DynSolValue::String(s.clone()),
        (ParamType::Bytes, EncodableValue::Bytes(b)) => DynSolValue::Bytes(b.clone()),
        (ParamType::Bytes32, EncodableValue::FixedBytes(b)) => DynSolValue::FixedBytes(*b, 32),
        (ParamType::Bytes32, EncodableValue::Bytes(b)) if b.len() == 32 => {
            DynSolValue::FixedBytes(B256::from_slice(b), 32)
        }
        _ => return Err(mismatch()),
    };
    Ok(value)
}

/// Ordered, append-only list of contract call arguments.
///
/// Created fresh for each call. Both projections are derived from the same
/// list, so they always have the same length and order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractFunctionParameterBuilder {
    params: Vec<FunctionParameter>,
}

impl ContractFunctionParameterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_param(
        mut self,
        ty: ParamType,
        name: impl Into<String>,
        value: impl Into<EncodableValue>,
    ) -> Self {
        self.params.push(FunctionParameter { ty, name: name.into(), value: value.into() });
        self
    }

    pub fn params(&self) -> &[FunctionParameter] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// `type1 name1,type2 name2,...` in insertion order.
    pub fn build_signature_params(&self) -> String {
        self.params
            .iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Raw values in insertion order.
    pub fn build_positional_values(&self) -> Vec<EncodableValue> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }

    /// One-function ABI fragment built from the signature projection.
    pub fn abi_function(&self, function_name: &str) -> ParamResult<Function> {
        let signature = format!("function {}({})", function_name, self.build_signature_params());
        Function::parse(&signature)
            .map_err(|e| CoreError::Encoding(format!("Could not parse '{}': {}", signature, e)))
    }

    /// Selector plus ABI-encoded arguments for `function_name`.
    pub fn encode_call(&self, function_name: &str) -> ParamResult<Vec<u8>> {
        let function = self.abi_function(function_name)?;
        let values = self
            .params
            .iter()
            .zip(self.build_positional_values())
            .map(|(p, value)| dyn_value(p.ty, &p.name, &value))
            .collect::<ParamResult<Vec<_>>>()?;
        Ok(function.abi_encode_input(&values)?)
    }
}
