// File-upload collaborator
// Stores text contents on the ledger's file service and hands back the file id.

use crate::error::CoreError;
use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub type UploadResult<T> = Result<T, CoreError>;

/// Identifier returned by the file service, e.g. `0.0.4815162`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body posted to the upload endpoint.
#[derive(Debug, Serialize)]
pub struct UploadRequest<'a> {
    pub contents: &'a str,
}

/// Upload endpoint answer: `{"fileId": ...}` or `{"error": ...}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn into_file_id(self) -> UploadResult<FileId> {
        if let Some(error) = self.error {
            return Err(CoreError::Upload(error));
        }
        match self.file_id {
            Some(id) if !id.is_empty() => Ok(FileId(id)),
            _ => Err(CoreError::Upload("File creation failed, fileId is null".to_string())),
        }
    }
}

#[async_trait(?Send)]
pub trait FileService {
    async fn upload(&self, contents: &str) -> UploadResult<FileId>;
}

/// Upload the image, reference it from the metadata as `propertyImage`,
/// then upload the enriched metadata. Returns the metadata file id.
///
/// Nothing is rolled back when the second upload fails.
pub async fn upload_property_metadata(
    service: &dyn FileService,
    image_contents: &str,
    metadata: &Value,
) -> UploadResult<FileId> {
    let mut enriched = match metadata {
        Value::Object(map) => map.clone(),
        other => {
            return Err(CoreError::InvalidInput(format!(
                "Property metadata must be a JSON object, got {}",
                other
            )))
        }
    };

    let image_id = service.upload(image_contents).await?;
    info!("Uploaded property image: {}", image_id);

    enriched.insert("propertyImage".to_string(), Value::String(image_id.0));
    let metadata_json = serde_json::to_string(&Value::Object(enriched))?;
    let metadata_id = service.upload(&metadata_json).await?;
    info!("Uploaded property metadata: {}", metadata_id);
    Ok(metadata_id)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// In-memory file service numbering files from `0.0.5000`.
    #[derive(Default)]
    pub struct MemoryFileService {
        pub uploads: RefCell<Vec<String>>,
        pub fail_on: Option<usize>,
    }

    #[async_trait(?Send)]
    impl FileService for MemoryFileService {
        async fn upload(&self, contents: &str) -> UploadResult<FileId> {
            let index = self.uploads.borrow().len();
            if self.fail_on == Some(index) {
                return Err(CoreError::Upload("File creation failed, fileId is null".to_string()));
            }
            self.uploads.borrow_mut().push(contents.to_string());
            Ok(FileId(format!("0.0.{}", 5000 + index)))
        }
    }

    #[tokio::test]
    async fn test_image_id_merged_into_metadata() {
        let service = MemoryFileService::default();
        let id = upload_property_metadata(&service, "IMG_BASE64", &json!({"name": "Plot A"}))
            .await
            .unwrap();

        let uploads = service.uploads.borrow();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0], "IMG_BASE64");
        let metadata: Value = serde_json::from_str(&uploads[1]).unwrap();
        assert_eq!(metadata, json!({"name": "Plot A", "propertyImage": "0.0.5000"}));
        assert_eq!(id, FileId("0.0.5001".to_string()));
    }

    #[tokio::test]
    async fn test_image_failure_skips_metadata_upload() {
        let service = MemoryFileService { fail_on: Some(0), ..Default::default() };
        let err = upload_property_metadata(&service, "IMG", &json!({})).await.unwrap_err();
        assert!(err.to_string().contains("fileId is null"));
        assert!(service.uploads.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_non_object_metadata_rejected() {
        let service = MemoryFileService::default();
        assert!(upload_property_metadata(&service, "IMG", &json!([1, 2])).await.is_err());
        assert!(service.uploads.borrow().is_empty());
    }

    #[test]
    fn test_upload_response_mapping() {
        let ok: UploadResponse = serde_json::from_str(r#"{"fileId":"0.0.77"}"#).unwrap();
        assert_eq!(ok.into_file_id().unwrap().to_string(), "0.0.77");

        let err: UploadResponse = serde_json::from_str(r#"{"error":"Missing contents in request body"}"#).unwrap();
        assert_eq!(
            err.into_file_id().unwrap_err().to_string(),
            "Upload error: Missing contents in request body"
        );

        let empty: UploadResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.into_file_id().is_err());
    }
}
