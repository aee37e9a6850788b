use crate::error::CoreError;
use crate::models::ContractId;
use crate::wallet::GasLimits;
use serde::{Deserialize, Serialize};

/// Chain the wallets connect to, as announced to the injected provider.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NetworkConfig {
    /// `mainnet`, `testnet` or `previewnet`.
    pub network: String,
    /// EVM chain id in hex, e.g. `0x128`.
    pub chain_id: String,
    pub json_rpc_url: String,
    #[serde(default)]
    pub mirror_node_url: Option<String>,
}

impl NetworkConfig {
    pub fn testnet() -> Self {
        Self {
            network: "testnet".to_string(),
            chain_id: "0x128".to_string(),
            json_rpc_url: "https://testnet.hashio.io/api".to_string(),
            mirror_node_url: Some("https://testnet.mirrornode.hedera.com".to_string()),
        }
    }

    pub fn chain_name(&self) -> String {
        format!("Hedera ({})", self.network)
    }

    pub fn chain_id_number(&self) -> Result<u64, CoreError> {
        let hex = self
            .chain_id
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::Validation(format!("chain_id must be 0x-prefixed hex: {}", self.chain_id)))?;
        u64::from_str_radix(hex, 16)
            .map_err(|e| CoreError::Validation(format!("Invalid chain_id {}: {}", self.chain_id, e)))
    }
}

/// dApp metadata shown by the remote wallet during pairing.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "Estate Ledger".to_string(),
            description: "Real-estate tokenization on Hedera".to_string(),
            url: "http://localhost:3000".to_string(),
            icons: vec!["http://localhost:3000/logo192.png".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    pub network: NetworkConfig,
    /// Property registry contract, as an EVM address or `shard.realm.num`.
    pub registry_contract: String,
    /// Endpoint accepting `{"contents": ...}` and answering `{"fileId": ...}`.
    pub upload_endpoint: String,
    #[serde(default)]
    pub wallet_connect_project_id: Option<String>,
    #[serde(default)]
    pub app_metadata: AppMetadata,
    #[serde(default)]
    pub gas_limits: GasLimits,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network: NetworkConfig::testnet(),
            registry_contract: "0x1bdf2502e00a2a08cfa931c3890525c32f81296d".to_string(),
            upload_endpoint: "http://localhost:3000/api/uploadMetadata".to_string(),
            wallet_connect_project_id: None,
            app_metadata: AppMetadata::default(),
            gas_limits: GasLimits::default(),
        }
    }
}

impl Settings {
    /// Load from a TOML file, with `ESTATE__SECTION__KEY` environment overrides.
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ESTATE").separator("__"));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), CoreError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn registry_contract_id(&self) -> Result<ContractId, CoreError> {
        self.registry_contract.parse()
    }

    /// Validate settings ranges and constraints
    pub fn validate(&self) -> Result<(), CoreError> {
        if !matches!(self.network.network.as_str(), "mainnet" | "testnet" | "previewnet") {
            return Err(CoreError::Validation(format!("Unknown network: {}", self.network.network)));
        }
        self.network.chain_id_number()?;
        url::Url::parse(&self.network.json_rpc_url)
            .map_err(|e| CoreError::Validation(format!("json_rpc_url is not a valid URL: {}", e)))?;
        url::Url::parse(&self.upload_endpoint)
            .map_err(|e| CoreError::Validation(format!("upload_endpoint is not a valid URL: {}", e)))?;
        if let Some(mirror) = &self.network.mirror_node_url {
            url::Url::parse(mirror)
                .map_err(|e| CoreError::Validation(format!("mirror_node_url is not a valid URL: {}", e)))?;
        }
        self.registry_contract_id()
            .map_err(|e| CoreError::Validation(format!("registry_contract: {}", e)))?;
        let gas = &self.gas_limits;
        if gas.transfer_ft == 0 || gas.transfer_nft == 0 || gas.associate == 0 || gas.register_property == 0 {
            return Err(CoreError::Validation("gas limits must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.network.chain_id_number().unwrap(), 296);
        assert_eq!(settings.network.chain_name(), "Hedera (testnet)");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut s = Settings::default();
        s.network.chain_id = "296".to_string();
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.upload_endpoint = "not a url".to_string();
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.registry_contract = "registry".to_string();
        assert!(s.validate().is_err());

        let mut s = Settings::default();
        s.gas_limits.associate = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn settings_from_partial_json_use_defaults() {
        let json = r#"{
            "network": {"network": "testnet", "chain_id": "0x128", "json_rpc_url": "https://testnet.hashio.io/api"},
            "registry_contract": "0.0.5005",
            "upload_endpoint": "https://estate.example/api/uploadMetadata"
        }"#;
        let s = Settings::from_json(json).unwrap();
        assert_eq!(s.gas_limits, GasLimits::default());
        assert_eq!(s.registry_contract_id().unwrap(), ContractId::new(0, 0, 5005));
        s.validate().unwrap();
    }

    #[cfg(feature = "native")]
    #[test]
    fn load_example_config() {
        let s = Settings::from_file("config.example.toml").unwrap();
        assert_eq!(s.network.network, "testnet");
        assert_eq!(s.gas_limits.transfer_nft, 100_000);
        s.validate().unwrap();
    }

    #[cfg(feature = "native")]
    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("estate.toml");
        let path = path.to_str().unwrap();
        let mut s = Settings::default();
        s.wallet_connect_project_id = Some("project".to_string());
        s.save_to_file(path).unwrap();
        let loaded = Settings::from_file(path).unwrap();
        assert_eq!(loaded, s);
    }
}
