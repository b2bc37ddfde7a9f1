use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::models::{DocumentLayout, OcrPage, ProcessedDocument};
use crate::services::correction::{correct_spelling, TextCorrector};
use crate::services::ocr_service::OcrService;
use crate::services::relink::relink_images;
use crate::services::sanitize::secure_filename;

/// Joins per-page Markdown into one document.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Used when the OCR image id carries no usable extension.
pub const DEFAULT_IMAGE_EXTENSION: &str = ".png";

/// Failures that abort a single document.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read uploaded file {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Upload to OCR service failed: {0}")]
    Upload(#[source] ServiceError),

    #[error("Signed URL request failed: {0}")]
    SignedUrl(#[source] ServiceError),

    #[error("OCR request failed: {0}")]
    Ocr(#[source] ServiceError),

    #[error("Failed to write final markdown file {path}: {source}")]
    WriteMarkdown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Message recorded against the document in the batch error list.
    pub fn user_message(&self) -> String {
        match self {
            ProcessError::Upload(e) | ProcessError::SignedUrl(e) | ProcessError::Ocr(e) => {
                e.user_message()
            }
            other => other.to_string(),
        }
    }
}

/// `{base}_p{page}_img{counter}{ext}`; `page` is 1-based.
pub fn renamed_image_name(base: &str, page_number: usize, counter: usize, extension: &str) -> String {
    format!("{}_p{}_img{}{}", base, page_number, counter, extension)
}

/// Extension (with dot) taken from an OCR image id such as `img-0.jpeg`.
pub fn image_extension(image_id: &str) -> String {
    Path::new(image_id)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(secure_filename)
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}

#[derive(Debug)]
pub enum PayloadError {
    MalformedDataUri,
    Base64(base64::DecodeError),
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadError::MalformedDataUri => write!(f, "data URI without a payload"),
            PayloadError::Base64(e) => write!(f, "invalid base64: {}", e),
        }
    }
}

/// Decodes an inline image payload, with or without a `data:` prefix.
///
/// `None` means there is no payload at all.
pub fn decode_image_payload(payload: Option<&str>) -> Option<Result<Vec<u8>, PayloadError>> {
    let payload = payload.filter(|p| !p.is_empty())?;

    let encoded = if payload.starts_with("data:") {
        match payload.split_once(',') {
            Some((_, data)) => data,
            None => return Some(Err(PayloadError::MalformedDataUri)),
        }
    } else {
        payload
    };

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Some(STANDARD.decode(compact).map_err(PayloadError::Base64))
}

/// Markdown and image names assembled from the OCR pages.
#[derive(Debug, Default)]
pub struct AssembledPages {
    pub markdown: String,
    pub images: Vec<String>,
}

/// Writes every decodable image of `pages` into `images_dir` and relinks the text.
///
/// The image counter runs across the whole document and advances only
/// when an image file was actually written. Empty, undecodable or
/// unwritable images are skipped and do not abort the document.
pub async fn assemble_pages(pages: &[OcrPage], base: &str, images_dir: &Path) -> AssembledPages {
    let mut counter = 1;
    let mut images = Vec::new();
    let mut page_markdown = Vec::with_capacity(pages.len());

    for (page_index, page) in pages.iter().enumerate() {
        let page_number = page_index + 1;
        let (mapping, next_counter) =
            extract_page_images(page, page_number, base, images_dir, counter).await;
        counter = next_counter;

        images.extend(mapping.iter().map(|(_, name)| name.clone()));
        page_markdown.push(relink_images(&page.markdown, &mapping));
    }

    AssembledPages {
        markdown: page_markdown.join(PAGE_SEPARATOR),
        images,
    }
}

/// Returns the id-to-file mapping for one page and the next counter value.
async fn extract_page_images(
    page: &OcrPage,
    page_number: usize,
    base: &str,
    images_dir: &Path,
    mut counter: usize,
) -> (Vec<(String, String)>, usize) {
    let mut mapping = Vec::new();

    for image in &page.images {
        let bytes = match decode_image_payload(image.image_base64.as_deref()) {
            None => continue,
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                warn!(page = page_number, image = %image.id, error = %e, "Skipping undecodable image");
                continue;
            }
        };

        let new_name = renamed_image_name(base, page_number, counter, &image_extension(&image.id));
        let path = images_dir.join(&new_name);
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!(page = page_number, image = %image.id, path = %path.display(), error = %e, "Could not write image file");
            continue;
        }

        debug!(page = page_number, image = %image.id, file = %new_name, "Image extracted");
        counter += 1;
        mapping.push((image.id.clone(), new_name));
    }

    (mapping, counter)
}

/// Runs one PDF through OCR, image extraction, optional correction and persistence.
pub struct DocumentProcessor {
    ocr: Box<dyn OcrService>,
    corrector: Option<Box<dyn TextCorrector>>,
}

impl DocumentProcessor {
    pub fn new(ocr: Box<dyn OcrService>, corrector: Option<Box<dyn TextCorrector>>) -> Self {
        Self { ocr, corrector }
    }

    /// Processes the PDF stored at `pdf_path` into `{session_output}/{base}/`.
    ///
    /// `upload_name` is the file name reported to the OCR service.
    pub async fn process(
        &self,
        pdf_path: &Path,
        upload_name: &str,
        base: &str,
        session_output: &Path,
    ) -> Result<ProcessedDocument, ProcessError> {
        let start = Instant::now();
        info!(file_name = upload_name, base = base, "Processing document");

        let layout = DocumentLayout::new(session_output, base);
        tokio::fs::create_dir_all(&layout.images_dir)
            .await
            .map_err(|source| ProcessError::CreateDir {
                path: layout.images_dir.clone(),
                source,
            })?;

        let content = tokio::fs::read(pdf_path)
            .await
            .map_err(|source| ProcessError::ReadInput {
                path: pdf_path.to_path_buf(),
                source,
            })?;

        let mut upload_id = None;
        let result = self
            .run(&layout, upload_name, base, content, &mut upload_id)
            .await;

        if let Some(id) = upload_id {
            match self.ocr.delete(&id).await {
                Ok(()) => debug!(upload_id = %id, "Deleted temporary file from OCR service"),
                Err(e) => warn!(upload_id = %id, error = %e, "Could not delete temporary file from OCR service"),
            }
        }

        match &result {
            Ok(doc) => info!(
                file_name = upload_name,
                images = doc.images.len(),
                markdown_bytes = doc.markdown.len(),
                processing_time_ms = start.elapsed().as_millis() as u64,
                "Document processed"
            ),
            Err(e) => warn!(file_name = upload_name, error = %e.user_message(), "Document processing failed"),
        }
        result
    }

    async fn run(
        &self,
        layout: &DocumentLayout,
        upload_name: &str,
        base: &str,
        content: Vec<u8>,
        upload_id: &mut Option<String>,
    ) -> Result<ProcessedDocument, ProcessError> {
        let id = self
            .ocr
            .upload(upload_name, content)
            .await
            .map_err(ProcessError::Upload)?;
        info!(upload_id = %id, "Document uploaded, requesting signed URL");
        *upload_id = Some(id.clone());

        let url = self
            .ocr
            .signed_url(&id)
            .await
            .map_err(ProcessError::SignedUrl)?;

        info!(upload_id = %id, "Calling OCR");
        let response = self.ocr.process(&url).await.map_err(ProcessError::Ocr)?;
        info!(upload_id = %id, pages = response.pages.len(), "OCR completed");

        persist_diagnostic(&layout.ocr_json_path, &response).await;

        let assembled = assemble_pages(&response.pages, base, &layout.images_dir).await;

        let markdown = match &self.corrector {
            Some(corrector) => {
                info!("Running spelling correction");
                correct_spelling(corrector.as_ref(), &assembled.markdown).await
            }
            None => {
                debug!("Spelling correction skipped");
                assembled.markdown
            }
        };

        tokio::fs::write(&layout.markdown_path, &markdown)
            .await
            .map_err(|source| ProcessError::WriteMarkdown {
                path: layout.markdown_path.clone(),
                source,
            })?;
        info!(path = %layout.markdown_path.display(), "Markdown written");

        Ok(ProcessedDocument {
            base: base.to_string(),
            markdown,
            images: assembled.images,
            markdown_path: layout.markdown_path.clone(),
            images_dir: layout.images_dir.clone(),
            output_dir: layout.output_dir.clone(),
        })
    }
}

/// Best effort: the raw OCR payload is only kept for diagnosis.
async fn persist_diagnostic<T: serde::Serialize>(path: &Path, response: &T) {
    let json = match serde_json::to_vec_pretty(response) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Could not serialize raw OCR response");
            return;
        }
    };
    match tokio::fs::write(path, json).await {
        Ok(()) => debug!(path = %path.display(), "Raw OCR response saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not save raw OCR response"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OcrImage;

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn extension_defaults_to_png() {
        assert_eq!(image_extension("img-0.jpeg"), ".jpeg");
        assert_eq!(image_extension("img-0"), ".png");
        assert_eq!(image_extension("img-0.%%"), ".png");
    }

    #[test]
    fn decodes_plain_and_data_uri_payloads() {
        let raw = b64(b"abc");
        assert_eq!(decode_image_payload(Some(&raw)).unwrap().unwrap(), b"abc");
        let uri = format!("data:image/jpeg;base64,{}", raw);
        assert_eq!(decode_image_payload(Some(&uri)).unwrap().unwrap(), b"abc");
        assert!(decode_image_payload(Some("")).is_none());
        assert!(decode_image_payload(None).is_none());
        assert!(matches!(
            decode_image_payload(Some("data:image/png;base64")),
            Some(Err(PayloadError::MalformedDataUri))
        ));
        assert!(matches!(decode_image_payload(Some("!!!")), Some(Err(PayloadError::Base64(_)))));
    }

    #[tokio::test]
    async fn counter_spans_pages_and_skips_bad_images() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![
            OcrPage::new(
                0,
                "p1 ![img-0.jpeg](img-0.jpeg) ![img-1.jpeg](img-1.jpeg)",
                vec![
                    OcrImage::new("img-0.jpeg", Some(b64(b"one"))),
                    OcrImage::new("img-1.jpeg", Some("%%%".into())),
                ],
            ),
            OcrPage::new(1, "p2", vec![OcrImage::new("img-2.jpeg", None)]),
            OcrPage::new(
                2,
                "p3 ![img-3](img-3)",
                vec![OcrImage::new("img-3", Some(format!("data:image/png;base64,{}", b64(b"three"))))],
            ),
        ];

        let out = assemble_pages(&pages, "doc", dir.path()).await;
        assert_eq!(out.images, vec!["doc_p1_img1.jpeg", "doc_p3_img2.png"]);
        assert_eq!(
            out.markdown,
            "p1 ![[doc_p1_img1.jpeg]] ![img-1.jpeg](img-1.jpeg)\n\n---\n\np2\n\n---\n\np3 ![[doc_p3_img2.png]]"
        );
        assert_eq!(std::fs::read(dir.path().join("doc_p3_img2.png")).unwrap(), b"three");
    }
}
