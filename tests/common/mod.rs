//! Fake service clients shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;

use pdfmark::config::Config;
use pdfmark::error::ServiceError;
use pdfmark::models::{OcrImage, OcrPage, OcrResponse};
use pdfmark::services::{ClientFactory, OcrService, TextCorrector};

/// Upload content that makes the fake OCR service reject the upload.
pub const REJECTED_UPLOAD: &[u8] = b"%PDF-reject";
/// Upload content that makes the signed URL request fail.
pub const UNSIGNABLE_UPLOAD: &[u8] = b"%PDF-unsignable";
/// Upload content whose OCR call fails after a successful upload.
pub const OCR_FAILING_UPLOAD: &[u8] = b"%PDF-ocr-fails";

#[derive(Default)]
pub struct FakeOcrState {
    pub uploads: Mutex<HashMap<String, (String, Vec<u8>)>>,
    pub deleted: Mutex<Vec<String>>,
}

pub struct FakeOcr {
    state: Arc<FakeOcrState>,
}

pub fn ocr_pages(title: &str) -> Vec<OcrPage> {
    vec![
        OcrPage::new(
            0,
            format!("# {}\n\n![img-0.jpeg](img-0.jpeg)\n\n![img-1.jpeg](img-1.jpeg)", title),
            vec![
                OcrImage::new("img-0.jpeg", Some(STANDARD.encode(b"jpeg-bytes"))),
                OcrImage::new("img-1.jpeg", Some(String::new())),
            ],
        ),
        OcrPage::new(
            1,
            "1. 다음 중 옳은 것은?\n\n![img-2](img-2)",
            vec![OcrImage::new(
                "img-2",
                Some(format!("data:image/png;base64,{}", STANDARD.encode(b"png-bytes"))),
            )],
        ),
    ]
}

#[async_trait]
impl OcrService for FakeOcr {
    async fn upload(&self, file_name: &str, content: Vec<u8>) -> Result<String, ServiceError> {
        if content == REJECTED_UPLOAD {
            return Err(ServiceError::Api {
                service: "ocr",
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: r#"{"object":"error","message":"Invalid document","type":"invalid_request"}"#
                    .to_string(),
            });
        }
        let mut uploads = self.state.uploads.lock().unwrap();
        let id = format!("file-{}", uploads.len() + 1);
        uploads.insert(id.clone(), (file_name.to_string(), content));
        Ok(id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, ServiceError> {
        let uploads = self.state.uploads.lock().unwrap();
        match uploads.get(file_id) {
            Some((_, content)) if content == UNSIGNABLE_UPLOAD => {
                Err(ServiceError::decode("ocr", "signed url missing"))
            }
            Some(_) => Ok(format!("https://signed.example/{}", file_id)),
            None => Err(ServiceError::decode("ocr", "unknown file")),
        }
    }

    async fn process(&self, document_url: &str) -> Result<OcrResponse, ServiceError> {
        let id = document_url.rsplit('/').next().unwrap_or_default();
        let uploads = self.state.uploads.lock().unwrap();
        let (name, content) = uploads
            .get(id)
            .ok_or_else(|| ServiceError::decode("ocr", "unknown document"))?;
        if content == OCR_FAILING_UPLOAD {
            return Err(ServiceError::Api {
                service: "ocr",
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: r#"{"detail":"OCR backend unavailable"}"#.to_string(),
            });
        }
        Ok(OcrResponse {
            pages: ocr_pages(name),
            model: Some("fake-ocr".to_string()),
            ..Default::default()
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), ServiceError> {
        self.state.deleted.lock().unwrap().push(file_id.to_string());
        Ok(())
    }
}

/// Correction behaviour for [`FakeClients`].
#[derive(Clone)]
pub enum CorrectorReply {
    Fails,
    Empty,
    /// Replaces the first occurrence of `.0` with `.1`.
    Replace(String, String),
}

pub struct FakeCorrector {
    reply: CorrectorReply,
}

#[async_trait]
impl TextCorrector for FakeCorrector {
    async fn correct(&self, text: &str) -> Result<String, ServiceError> {
        match &self.reply {
            CorrectorReply::Fails => Err(ServiceError::client(
                "correction",
                r#"{"error":{"message":"quota exceeded"}}"#,
            )),
            CorrectorReply::Empty => Ok(String::new()),
            CorrectorReply::Replace(from, to) => Ok(text.replacen(from.as_str(), to, 1)),
        }
    }
}

pub struct FakeClients {
    pub state: Arc<FakeOcrState>,
    pub reply: CorrectorReply,
}

impl FakeClients {
    pub fn new(reply: CorrectorReply) -> Self {
        Self {
            state: Arc::new(FakeOcrState::default()),
            reply,
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.deleted.lock().unwrap().clone()
    }
}

impl ClientFactory for FakeClients {
    fn ocr_client(&self, _api_key: &str) -> Box<dyn OcrService> {
        Box::new(FakeOcr {
            state: self.state.clone(),
        })
    }

    fn corrector(&self, _api_key: &str) -> Box<dyn TextCorrector> {
        Box::new(FakeCorrector {
            reply: self.reply.clone(),
        })
    }
}

pub fn test_config(root: &Path) -> Config {
    Config {
        upload_dir: root.join("uploads"),
        output_dir: root.join("output"),
        ..Config::default()
    }
}
