// WASM upload client using fetch API

use crate::error::CoreError;
use crate::file_service::{FileId, FileService, UploadRequest, UploadResponse, UploadResult};
use async_trait::async_trait;
use log::debug;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

pub struct FetchFileService {
    endpoint: String,
}

impl FetchFileService {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

#[async_trait(?Send)]
impl FileService for FetchFileService {
    async fn upload(&self, contents: &str) -> UploadResult<FileId> {
        debug!("Uploading {} bytes via fetch to {}", contents.len(), self.endpoint);

        let body = serde_json::to_string(&UploadRequest { contents })?;
        let headers = Headers::new().map_err(|e| CoreError::Http(format!("Failed to create headers: {:?}", e)))?;
        headers
            .set("Content-Type", "application/json")
            .map_err(|e| CoreError::Http(format!("Failed to set header: {:?}", e)))?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_headers(&headers);
        opts.set_body(&JsValue::from_str(&body));

        let request = Request::new_with_str_and_init(&self.endpoint, &opts)
            .map_err(|e| CoreError::Http(format!("Failed to create request: {:?}", e)))?;

        let window = web_sys::window().ok_or_else(|| CoreError::Init("No window object available".to_string()))?;

        let resp_value = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| CoreError::Http(format!("Fetch failed: {:?}", e)))?;

        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| CoreError::Http("Failed to cast response".to_string()))?;
        let status = resp.status();

        let text_promise = resp.text().map_err(|e| CoreError::Http(format!("Failed to get text: {:?}", e)))?;
        let text = JsFuture::from(text_promise)
            .await
            .map_err(|e| CoreError::Http(format!("Failed to await text: {:?}", e)))?
            .as_string()
            .ok_or_else(|| CoreError::Http("Response text is not a string".to_string()))?;

        let body: UploadResponse = serde_json::from_str(&text)
            .map_err(|_| CoreError::Http(format!("Upload endpoint returned {}: {}", status, text)))?;
        body.into_file_id()
    }
}
