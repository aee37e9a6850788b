// Property registration workflow
// Upload image -> upload metadata referencing it -> registerProperty on the
// registry contract through whichever wallet owns the session.

use crate::error::CoreError;
use crate::file_service::{upload_property_metadata, FileId, FileService};
use crate::models::{AccountId, ContractId, GasLimit};
use crate::params::{ContractFunctionParameterBuilder, EncodableValue, ParamType};
use crate::wallet::WalletInterface;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REGISTER_PROPERTY: &str = "registerProperty";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveDetails {
    pub kra_pin: String,
    pub id_number: String,
    pub title_deed_hash: String,
}

/// Property details as entered by the owner. Serializes to the metadata
/// document stored on the file service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyForm {
    pub property_name: String,
    /// Valuation in KES.
    pub valuation: u64,
    pub location_name: String,
    pub property_type: String,
    /// `lat, long`
    pub geo_coordinates: String,
    pub bedrooms: u64,
    pub has_swimming_pool: bool,
    #[serde(default)]
    pub sensitive: SensitiveDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationStatus {
    WalletNotConnected,
    MissingImage,
    Uploading,
    UploadFailed(String),
    Registering,
    Registered(String),
    RegistrationFailed(String),
}

impl RegistrationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RegistrationStatus::Registered(_))
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationStatus::WalletNotConnected => f.write_str("Wallet not connected"),
            RegistrationStatus::MissingImage => f.write_str("Please upload a property image"),
            RegistrationStatus::Uploading => f.write_str("Uploading metadata to Hedera File Service..."),
            RegistrationStatus::UploadFailed(msg) => write!(f, "Error uploading metadata: {}", msg),
            RegistrationStatus::Registering => f.write_str("Registering property on-chain..."),
            RegistrationStatus::Registered(tx) => write!(f, "Property registered successfully. Tx: {}", tx),
            RegistrationStatus::RegistrationFailed(msg) => write!(f, "Error registering property: {}", msg),
        }
    }
}

/// Arguments of `registerProperty(address owner, string name, string propertyURI,
/// uint256 valuation, string locationName, string propertyType,
/// string geoCoordinates, uint256 bedrooms, bool hasSwimmingPool,
/// string kraPin, string idNumber, string titleDeedHash)`.
pub fn build_registration_params(
    owner: &AccountId,
    form: &PropertyForm,
    property_uri: &FileId,
) -> ContractFunctionParameterBuilder {
    ContractFunctionParameterBuilder::new()
        .add_param(ParamType::Address, "owner", EncodableValue::address(owner))
        .add_param(ParamType::String, "name", form.property_name.as_str())
        .add_param(ParamType::String, "propertyURI", property_uri.0.as_str())
        .add_param(ParamType::Uint256, "valuation", form.valuation)
        .add_param(ParamType::String, "locationName", form.location_name.as_str())
        .add_param(ParamType::String, "propertyType", form.property_type.as_str())
        .add_param(ParamType::String, "geoCoordinates", form.geo_coordinates.as_str())
        .add_param(ParamType::Uint256, "bedrooms", form.bedrooms)
        .add_param(ParamType::Bool, "hasSwimmingPool", form.has_swimming_pool)
        .add_param(ParamType::String, "kraPin", form.sensitive.kra_pin.as_str())
        .add_param(ParamType::String, "idNumber", form.sensitive.id_number.as_str())
        .add_param(ParamType::String, "titleDeedHash", form.sensitive.title_deed_hash.as_str())
}

pub struct PropertyRegistrar {
    registry: ContractId,
    gas_limit: GasLimit,
}

impl PropertyRegistrar {
    pub fn new(registry: ContractId, gas_limit: impl Into<GasLimit>) -> Self {
        Self { registry, gas_limit: gas_limit.into() }
    }

    pub fn registry(&self) -> ContractId {
        self.registry
    }

    /// Run the workflow, reporting each intermediate status to `on_status`.
    /// Returns the final status. A failed upload never reaches the contract.
    pub async fn register<S>(
        &self,
        owner: Option<AccountId>,
        wallet: Option<&dyn WalletInterface>,
        files: &dyn FileService,
        form: &PropertyForm,
        image_contents: &str,
        mut on_status: S,
    ) -> RegistrationStatus
    where
        S: FnMut(&RegistrationStatus),
    {
        let (owner, wallet) = match (owner, wallet) {
            (Some(owner), Some(wallet)) => (owner, wallet),
            _ => return RegistrationStatus::WalletNotConnected,
        };
        if image_contents.is_empty() {
            return RegistrationStatus::MissingImage;
        }

        on_status(&RegistrationStatus::Uploading);
        let property_uri = match self.upload(files, form, image_contents).await {
            Ok(id) => id,
            Err(e) => {
                warn!("Metadata upload failed: {}", e);
                return RegistrationStatus::UploadFailed(e.to_string());
            }
        };

        on_status(&RegistrationStatus::Registering);
        let params = build_registration_params(&owner, form, &property_uri);
        match wallet
            .execute_contract_function(self.registry, REGISTER_PROPERTY, params, self.gas_limit)
            .await
        {
            Some(tx) => {
                info!("Registered {} ({}) via {}: {}", form.property_name, property_uri, wallet.kind(), tx);
                RegistrationStatus::Registered(tx)
            }
            None => RegistrationStatus::RegistrationFailed(format!(
                "{} did not return a transaction id",
                wallet.kind()
            )),
        }
    }

    async fn upload(&self, files: &dyn FileService, form: &PropertyForm, image: &str) -> Result<FileId, CoreError> {
        let metadata = serde_json::to_value(form)?;
        upload_property_metadata(files, image, &metadata).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_service::tests::MemoryFileService;
    use crate::models::{Hbar, TokenId, TransactionResult, WalletKind};
    use crate::wallet::WalletResult;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingWallet {
        calls: RefCell<Vec<(ContractId, String, String, GasLimit)>>,
        result: Option<String>,
    }

    #[async_trait(?Send)]
    impl WalletInterface for RecordingWallet {
        fn kind(&self) -> WalletKind {
            WalletKind::Remote
        }

        async fn transfer_hbar(&self, _to: &AccountId, _amount: Hbar) -> TransactionResult {
            None
        }

        async fn transfer_fungible_token(&self, _to: &AccountId, _token: TokenId, _amount: u64) -> TransactionResult {
            None
        }

        async fn transfer_non_fungible_token(&self, _to: &AccountId, _token: TokenId, _serial: u64) -> TransactionResult {
            None
        }

        async fn associate_token(&self, _token: TokenId) -> TransactionResult {
            None
        }

        async fn execute_contract_function(
            &self,
            contract: ContractId,
            function_name: &str,
            params: ContractFunctionParameterBuilder,
            gas_limit: GasLimit,
        ) -> TransactionResult {
            self.calls.borrow_mut().push((
                contract,
                function_name.to_string(),
                params.build_signature_params(),
                gas_limit,
            ));
            self.result.clone()
        }

        async fn disconnect(&self) -> WalletResult<()> {
            Ok(())
        }
    }

    const OWNER: AccountId = AccountId::new(0, 0, 1001);

    fn form() -> PropertyForm {
        PropertyForm {
            property_name: "Plot A".to_string(),
            valuation: 12_500_000,
            location_name: "Karen, Nairobi".to_string(),
            property_type: "Villa".to_string(),
            geo_coordinates: "-1.3197, 36.7073".to_string(),
            bedrooms: 4,
            has_swimming_pool: true,
            sensitive: SensitiveDetails {
                kra_pin: "A123456789Z".to_string(),
                id_number: "12345678".to_string(),
                title_deed_hash: "0xdeed".to_string(),
            },
        }
    }

    fn registrar() -> PropertyRegistrar {
        PropertyRegistrar::new(ContractId::new(0, 0, 5005), 1_000_000u64)
    }

    #[test]
    fn test_registration_signature() {
        let params = build_registration_params(&OWNER, &form(), &FileId("0.0.5001".to_string()));
        assert_eq!(params.len(), 12);
        assert_eq!(
            params.build_signature_params(),
            "address owner,string name,string propertyURI,uint256 valuation,string locationName,\
             string propertyType,string geoCoordinates,uint256 bedrooms,bool hasSwimmingPool,\
             string kraPin,string idNumber,string titleDeedHash"
        );
        params.encode_call(REGISTER_PROPERTY).unwrap();
    }

    #[test]
    fn test_form_serializes_as_metadata_document() {
        let value = serde_json::to_value(form()).unwrap();
        assert_eq!(value["propertyName"], "Plot A");
        assert_eq!(value["hasSwimmingPool"], Value::Bool(true));
        assert_eq!(value["sensitive"]["kraPin"], "A123456789Z");
    }

    #[tokio::test]
    async fn test_successful_registration_sequence() {
        let files = MemoryFileService::default();
        let wallet = RecordingWallet { result: Some("0.0.1001@1.000000000".to_string()), ..Default::default() };
        let mut seen = Vec::new();

        let status = registrar()
            .register(Some(OWNER), Some(&wallet), &files, &form(), "data:image/png;base64,AAAA", |s| {
                seen.push(s.to_string())
            })
            .await;

        assert!(status.is_success());
        assert_eq!(status.to_string(), "Property registered successfully. Tx: 0.0.1001@1.000000000");
        assert_eq!(seen, vec!["Uploading metadata to Hedera File Service...", "Registering property on-chain..."]);

        let uploads = files.uploads.borrow();
        let metadata: Value = serde_json::from_str(&uploads[1]).unwrap();
        assert_eq!(metadata["propertyImage"], "0.0.5000");

        let calls = wallet.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ContractId::new(0, 0, 5005));
        assert_eq!(calls[0].1, "registerProperty");
        assert_eq!(calls[0].3, GasLimit::Units(1_000_000));
    }

    #[tokio::test]
    async fn test_upload_failure_never_calls_contract() {
        let files = MemoryFileService { fail_on: Some(1), ..Default::default() };
        let wallet = RecordingWallet { result: Some("tx".to_string()), ..Default::default() };

        let status = registrar().register(Some(OWNER), Some(&wallet), &files, &form(), "IMG", |_| {}).await;

        assert_eq!(
            status.to_string(),
            "Error uploading metadata: Upload error: File creation failed, fileId is null"
        );
        assert!(wallet.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_preconditions() {
        let files = MemoryFileService::default();
        let wallet = RecordingWallet::default();

        let status = registrar().register(None, Some(&wallet), &files, &form(), "IMG", |_| {}).await;
        assert_eq!(status, RegistrationStatus::WalletNotConnected);

        let status = registrar().register(Some(OWNER), Some(&wallet), &files, &form(), "", |_| {}).await;
        assert_eq!(status.to_string(), "Please upload a property image");
        assert!(files.uploads.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_missing_transaction_id_is_failure() {
        let files = MemoryFileService::default();
        let wallet = RecordingWallet::default();
        let status = registrar().register(Some(OWNER), Some(&wallet), &files, &form(), "IMG", |_| {}).await;
        assert!(matches!(status, RegistrationStatus::RegistrationFailed(_)));
    }
}
