use crate::error::CoreError;
use alloy_primitives::{hex, Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

/// Outcome of a wallet operation: the backend's transaction identifier, or
/// `None` when the operation did not go through.
pub type TransactionResult = Option<String>;

/// Ledger entity address in `shard.realm.num` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityId {
    pub shard: u32,
    pub realm: u64,
    pub num: u64,
}

impl EntityId {
    pub const fn new(shard: u32, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    /// Long-zero EVM encoding: 4 bytes shard, 8 bytes realm, 8 bytes num.
    pub fn to_evm_address(&self) -> Address {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&self.shard.to_be_bytes());
        bytes[4..12].copy_from_slice(&self.realm.to_be_bytes());
        bytes[12..].copy_from_slice(&self.num.to_be_bytes());
        Address::from(bytes)
    }

    /// Hex form of [`Self::to_evm_address`] without the `0x` prefix.
    pub fn to_solidity_address(&self) -> String {
        hex::encode(self.to_evm_address())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

/// Splits `s.r.n` and returns the parsed shard and realm plus the raw last segment.
fn split_entity(s: &str) -> Result<(u32, u64, &str), CoreError> {
    let mut parts = s.trim().splitn(3, '.');
    let (Some(shard), Some(realm), Some(last)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(CoreError::ParseError(format!("Expected shard.realm.num, got '{}'", s)));
    };
    let shard = shard
        .parse::<u32>()
        .map_err(|e| CoreError::ParseError(format!("Invalid shard in '{}': {}", s, e)))?;
    let realm = realm
        .parse::<u64>()
        .map_err(|e| CoreError::ParseError(format!("Invalid realm in '{}': {}", s, e)))?;
    Ok((shard, realm, last))
}

fn parse_evm_address(s: &str) -> Result<Address, CoreError> {
    Address::from_str(s).map_err(|e| CoreError::ParseError(format!("Invalid EVM address '{}': {}", s, e)))
}

impl FromStr for EntityId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (shard, realm, num) = split_entity(s)?;
        let num = num
            .parse::<u64>()
            .map_err(|e| CoreError::ParseError(format!("Invalid entity number in '{}': {}", s, e)))?;
        Ok(Self { shard, realm, num })
    }
}

/// Account identifier, optionally carrying an EVM alias address.
///
/// Accepts `0.0.1234`, `0.0.<40 hex chars>` and bare `0x…` forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId {
    pub id: EntityId,
    pub evm_address: Option<Address>,
}

impl AccountId {
    pub const fn new(shard: u32, realm: u64, num: u64) -> Self {
        Self { id: EntityId::new(shard, realm, num), evm_address: None }
    }

    pub fn from_evm_address(address: Address) -> Self {
        Self { id: EntityId::default(), evm_address: Some(address) }
    }

    /// Address used on the EVM side: the alias verbatim when present,
    /// otherwise the long-zero encoding of the entity id.
    pub fn to_evm_address(&self) -> Address {
        self.evm_address.unwrap_or_else(|| self.id.to_evm_address())
    }

    /// `0x`-prefixed lowercase hex of [`Self::to_evm_address`].
    pub fn to_solidity_address(&self) -> String {
        format!("0x{}", hex::encode(self.to_evm_address()))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.evm_address {
            Some(addr) if self.id == EntityId::default() => write!(f, "0x{}", hex::encode(addr)),
            Some(addr) if self.id.num == 0 => {
                write!(f, "{}.{}.{}", self.id.shard, self.id.realm, hex::encode(addr))
            }
            _ => fmt::Display::fmt(&self.id, f),
        }
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            return Ok(Self::from_evm_address(parse_evm_address(s)?));
        }
        let (shard, realm, last) = split_entity(s)?;
        if last.len() == 40 && last.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self {
                id: EntityId::new(shard, realm, 0),
                evm_address: Some(parse_evm_address(last)?),
            });
        }
        let num = last
            .parse::<u64>()
            .map_err(|e| CoreError::ParseError(format!("Invalid account number in '{}': {}", s, e)))?;
        Ok(Self::new(shard, realm, num))
    }
}

impl TryFrom<String> for AccountId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.to_string()
    }
}

/// Fungible or non-fungible token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId(pub EntityId);

impl TokenId {
    pub const fn new(shard: u32, realm: u64, num: u64) -> Self {
        Self(EntityId::new(shard, realm, num))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TokenId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl TryFrom<String> for TokenId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenId> for String {
    fn from(value: TokenId) -> Self {
        value.to_string()
    }
}

/// Smart contract identifier, either an entity id or a deployed EVM address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractId {
    pub id: EntityId,
    pub evm_address: Option<Address>,
}

impl ContractId {
    pub const fn new(shard: u32, realm: u64, num: u64) -> Self {
        Self { id: EntityId::new(shard, realm, num), evm_address: None }
    }

    pub fn from_evm_address(address: Address) -> Self {
        Self { id: EntityId::default(), evm_address: Some(address) }
    }

    pub fn to_evm_address(&self) -> Address {
        self.evm_address.unwrap_or_else(|| self.id.to_evm_address())
    }

    pub fn to_solidity_address(&self) -> String {
        format!("0x{}", hex::encode(self.to_evm_address()))
    }
}

/// Token precompile calls are addressed to the token itself.
impl From<TokenId> for ContractId {
    fn from(token: TokenId) -> Self {
        Self { id: token.0, evm_address: None }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.evm_address {
            Some(addr) => write!(f, "0x{}", hex::encode(addr)),
            None => fmt::Display::fmt(&self.id, f),
        }
    }
}

impl FromStr for ContractId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("0x") || s.starts_with("0X") {
            return Ok(Self::from_evm_address(parse_evm_address(s)?));
        }
        Ok(Self { id: s.parse()?, evm_address: None })
    }
}

impl TryFrom<String> for ContractId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContractId> for String {
    fn from(value: ContractId) -> Self {
        value.to_string()
    }
}

pub const TINYBARS_PER_HBAR: i64 = 100_000_000;
/// The JSON-RPC relay denominates value in weibars (18 decimals); tinybars have 8.
const WEIBARS_PER_TINYBAR: u64 = 10_000_000_000;

/// HBAR amount held as an integer number of tinybars so that debit and
/// credit legs negate exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hbar(i64);

impl Hbar {
    pub const ZERO: Hbar = Hbar(0);

    pub const fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    pub fn new(hbars: i64) -> Result<Self, CoreError> {
        hbars
            .checked_mul(TINYBARS_PER_HBAR)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidInput(format!("HBAR amount out of range: {}", hbars)))
    }

    pub const fn to_tinybars(self) -> i64 {
        self.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Value as sent through the JSON-RPC relay. Negative amounts are rejected.
    pub fn to_weibars(self) -> Result<U256, CoreError> {
        let tinybars = u64::try_from(self.0)
            .map_err(|_| CoreError::InvalidInput(format!("Cannot send a negative amount: {}", self)))?;
        Ok(U256::from(tinybars) * U256::from(WEIBARS_PER_TINYBAR))
    }
}

impl Neg for Hbar {
    type Output = Hbar;

    fn neg(self) -> Self::Output {
        Hbar(-self.0)
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % TINYBARS_PER_HBAR == 0 {
            write!(f, "{} ℏ", self.0 / TINYBARS_PER_HBAR)
        } else {
            write!(f, "{} tℏ", self.0)
        }
    }
}

/// Parses decimal HBAR strings such as `5`, `-2` or `0.00000001` without
/// going through floating point.
impl FromStr for Hbar {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CoreError::ParseError(format!("Invalid HBAR amount '{}'", s));
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 8 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            format!("{:0<8}", frac).parse().map_err(|_| invalid())?
        };
        let tinybars = whole
            .checked_mul(TINYBARS_PER_HBAR)
            .and_then(|t| t.checked_add(frac))
            .ok_or_else(invalid)?;
        Ok(Hbar(if negative { -tinybars } else { tinybars }))
    }
}

/// Gas limit for a contract call. `-1` is the "let the provider decide"
/// sentinel and maps to [`GasLimit::ProviderDefault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasLimit {
    ProviderDefault,
    Units(u64),
}

impl GasLimit {
    pub const SENTINEL: i64 = -1;

    /// Gas to forward to the dispatch call, `None` meaning "omit the field".
    pub fn units(self) -> Option<u64> {
        match self {
            GasLimit::ProviderDefault => None,
            GasLimit::Units(units) => Some(units),
        }
    }
}

impl TryFrom<i64> for GasLimit {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == Self::SENTINEL {
            return Ok(GasLimit::ProviderDefault);
        }
        u64::try_from(value).map(GasLimit::Units).map_err(|_| {
            CoreError::InvalidInput(format!(
                "Gas limit must be {} or non-negative, got {}",
                Self::SENTINEL,
                value
            ))
        })
    }
}

impl From<u64> for GasLimit {
    fn from(value: u64) -> Self {
        GasLimit::Units(value)
    }
}

/// Which wallet backend owns the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// Browser-injected provider (MetaMask).
    Injected,
    /// Remote session signer (WalletConnect).
    Remote,
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletKind::Injected => write!(f, "MetaMask"),
            WalletKind::Remote => write!(f, "WalletConnect"),
        }
    }
}
