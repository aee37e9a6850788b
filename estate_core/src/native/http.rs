// Native upload client using reqwest

use crate::error::CoreError;
use crate::file_service::{FileId, FileService, UploadRequest, UploadResponse, UploadResult};
use crate::native::operator::OperatorCredentials;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;

pub const OPERATOR_ACCOUNT_HEADER: &str = "x-operator-account";
pub const OPERATOR_SIGNATURE_HEADER: &str = "x-operator-signature";

/// Posts `{"contents": ...}` to the upload endpoint.
pub struct HttpFileService {
    client: Client,
    endpoint: String,
    operator: Option<OperatorCredentials>,
}

impl HttpFileService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { client: Client::new(), endpoint: endpoint.into(), operator: None }
    }

    /// Sign every upload with the operator key.
    pub fn with_operator(mut self, operator: OperatorCredentials) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait(?Send)]
impl FileService for HttpFileService {
    async fn upload(&self, contents: &str) -> UploadResult<FileId> {
        debug!("Uploading {} bytes to {}", contents.len(), self.endpoint);

        let mut request = self.client.post(&self.endpoint).json(&UploadRequest { contents });
        if let Some(operator) = &self.operator {
            request = request
                .header(OPERATOR_ACCOUNT_HEADER, operator.account_id.to_string())
                .header(OPERATOR_SIGNATURE_HEADER, operator.sign_base64(contents.as_bytes()));
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Errors come back as `{"error": ...}` bodies with a non-2xx status.
        let body: UploadResponse = serde_json::from_str(&text)
            .map_err(|_| CoreError::Http(format!("Upload endpoint returned {}: {}", status, text)))?;
        body.into_file_id()
    }
}
