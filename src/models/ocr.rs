//! Payloads exchanged with the OCR service.
//!
//! Fields the pipeline does not use are kept in `extra` so the diagnostic
//! `ocr_response.json` is a faithful copy of what the service sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrResponse {
    #[serde(default)]
    pub pages: Vec<OcrPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrPage {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub images: Vec<OcrImage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrImage {
    pub id: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OcrImage {
    pub fn new(id: impl Into<String>, image_base64: Option<String>) -> Self {
        Self {
            id: id.into(),
            image_base64,
            extra: Map::new(),
        }
    }
}

impl OcrPage {
    pub fn new(index: usize, markdown: impl Into<String>, images: Vec<OcrImage>) -> Self {
        Self {
            index,
            markdown: markdown.into(),
            images,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFileInfo {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedUrl {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct OcrRequest<'a> {
    pub model: &'a str,
    pub document: DocumentUrlChunk<'a>,
    pub include_image_base64: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentUrlChunk<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub document_url: &'a str,
}
