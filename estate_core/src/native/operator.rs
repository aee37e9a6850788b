// Operator credentials for the upload endpoint
// The operator account pays for file creation; uploads are signed with its
// ED25519 key so the endpoint can check who is asking.

use crate::error::CoreError;
use crate::models::AccountId;
use alloy_primitives::hex;
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

pub const OPERATOR_ACCOUNT_ID: &str = "OPERATOR_ACCOUNT_ID";
pub const OPERATOR_PRIVATE_KEY: &str = "OPERATOR_PRIVATE_KEY";

/// PKCS#8 DER prefix of an ED25519 private key.
const ED25519_DER_PREFIX: &str = "302e020100300506032b657004220420";

pub struct OperatorCredentials {
    pub account_id: AccountId,
    signing_key: SigningKey,
}

impl std::fmt::Debug for OperatorCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorCredentials")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl OperatorCredentials {
    /// Read `OPERATOR_ACCOUNT_ID` and `OPERATOR_PRIVATE_KEY`.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (account, key) = match (lookup(OPERATOR_ACCOUNT_ID), lookup(OPERATOR_PRIVATE_KEY)) {
            (Some(account), Some(key)) if !account.trim().is_empty() && !key.trim().is_empty() => (account, key),
            _ => return Err(CoreError::Config("Missing operator account details in environment".to_string())),
        };
        Self::parse(&account, &key)
    }

    pub fn parse(account_id: &str, private_key: &str) -> Result<Self, CoreError> {
        let account_id: AccountId = account_id
            .trim()
            .parse()
            .map_err(|e| CoreError::Config(format!("Invalid {}: {}", OPERATOR_ACCOUNT_ID, e)))?;
        let signing_key = parse_ed25519_key(private_key)?;
        Ok(Self { account_id, signing_key })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().to_bytes())
    }

    /// Base64 ED25519 signature of `message`.
    pub fn sign_base64(&self, message: &[u8]) -> String {
        Base64Engine.encode(self.signing_key.sign(message).to_bytes())
    }
}

/// Raw 32-byte hex, optionally `0x`-prefixed, or DER-encoded hex.
fn parse_ed25519_key(key: &str) -> Result<SigningKey, CoreError> {
    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    let raw = key.strip_prefix(ED25519_DER_PREFIX).unwrap_or(key);
    let bytes = hex::decode(raw)
        .map_err(|e| CoreError::Config(format!("{} is not hex: {}", OPERATOR_PRIVATE_KEY, e)))?;
    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        CoreError::Config(format!(
            "{} must be a 32-byte ED25519 key, got {} bytes",
            OPERATOR_PRIVATE_KEY,
            bytes.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};
    use std::collections::HashMap;

    const KEY_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let env: HashMap<&str, String> = HashMap::from([(OPERATOR_ACCOUNT_ID, "0.0.1234".to_string())]);
        let err = OperatorCredentials::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_raw_and_der_keys_agree() {
        let raw = OperatorCredentials::parse("0.0.1234", KEY_HEX).unwrap();
        let der = OperatorCredentials::parse("0.0.1234", &format!("{}{}", ED25519_DER_PREFIX, KEY_HEX)).unwrap();
        assert_eq!(raw.public_key_hex(), der.public_key_hex());
        assert_eq!(raw.account_id, AccountId::new(0, 0, 1234));
    }

    #[test]
    fn test_signature_verifies() {
        let creds = OperatorCredentials::parse("0.0.1234", &format!("0x{}", KEY_HEX)).unwrap();
        let sig = Base64Engine.decode(creds.sign_base64(b"{\"name\":\"Plot A\"}")).unwrap();
        let sig = Signature::from_slice(&sig).unwrap();
        creds.verifying_key().verify(b"{\"name\":\"Plot A\"}", &sig).unwrap();
    }

    #[test]
    fn test_rejects_malformed_keys() {
        assert!(OperatorCredentials::parse("0.0.1234", "zz").is_err());
        assert!(OperatorCredentials::parse("0.0.1234", "abcd").is_err());
        assert!(OperatorCredentials::parse("operator", KEY_HEX).is_err());
    }
}
