use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::OcrSettings;
use crate::error::ServiceError;
use crate::models::ocr::{DocumentUrlChunk, OcrRequest, SignedUrl, UploadedFileInfo};
use crate::models::OcrResponse;

const SERVICE: &str = "ocr";

/// Remote OCR service: upload, sign, process, delete.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Stores the document in the service's temporary storage; returns its id.
    async fn upload(&self, file_name: &str, content: Vec<u8>) -> Result<String, ServiceError>;

    /// Time-limited URL the OCR call can read the upload from.
    async fn signed_url(&self, file_id: &str) -> Result<String, ServiceError>;

    /// Runs OCR with inline base64 image payloads.
    async fn process(&self, document_url: &str) -> Result<OcrResponse, ServiceError>;

    async fn delete(&self, file_id: &str) -> Result<(), ServiceError>;
}

/// [`OcrService`] over the Mistral REST API.
pub struct MistralOcrClient {
    http: Client,
    api_key: String,
    api_base: String,
    model: String,
    expiry_hours: u32,
}

impl MistralOcrClient {
    pub fn new(http: Client, settings: &OcrSettings, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            expiry_hours: settings.signed_url_expiry_hours,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ServiceError::transport(SERVICE, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::Api {
            service: SERVICE,
            status,
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))
    }
}

#[async_trait]
impl OcrService for MistralOcrClient {
    async fn upload(&self, file_name: &str, content: Vec<u8>) -> Result<String, ServiceError> {
        debug!(file_name = file_name, bytes = content.len(), "Uploading document to OCR service");
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ServiceError::client(SERVICE, e.to_string()))?;
        let form = Form::new().text("purpose", "ocr").part("file", part);

        let info: UploadedFileInfo = self
            .send_json(self.http.post(self.url("/files")).multipart(form))
            .await?;
        Ok(info.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, ServiceError> {
        let request = self
            .http
            .get(self.url(&format!("/files/{}/url", file_id)))
            .query(&[("expiry", self.expiry_hours)]);
        let signed: SignedUrl = self.send_json(request).await?;
        Ok(signed.url)
    }

    async fn process(&self, document_url: &str) -> Result<OcrResponse, ServiceError> {
        let body = OcrRequest {
            model: &self.model,
            document: DocumentUrlChunk {
                kind: "document_url",
                document_url,
            },
            include_image_base64: true,
        };
        self.send_json(self.http.post(self.url("/ocr")).json(&body))
            .await
    }

    async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        self.send(self.http.delete(self.url(&format!("/files/{}", file_id))))
            .await
            .map(|_| ())
    }
}
