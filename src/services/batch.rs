use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{archive_name, FileResult, Preview, ProcessResponse, ProcessedDocument, UploadedFile};
use crate::services::archive::create_zip_archive;
use crate::services::clients::ClientFactory;
use crate::services::document_processor::DocumentProcessor;
use crate::services::sanitize::{document_base, secure_filename, unique_base};
use crate::services::session::{discard_upload, Session};

/// A validated batch: at least one allowed file and an OCR credential.
#[derive(Debug)]
pub struct BatchRequest {
    pub files: Vec<UploadedFile>,
    /// Names of submitted files with a disallowed extension.
    pub skipped: Vec<String>,
    pub ocr_api_key: String,
    pub correction_api_key: Option<String>,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub session_id: String,
    pub results: Vec<FileResult>,
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Partial success is success; only a batch with no result fails.
    pub fn classify(self) -> AppResult<ProcessResponse> {
        if self.results.is_empty() && !self.errors.is_empty() {
            return Err(AppError::AllFailed {
                details: self.errors,
            });
        }
        if self.results.is_empty() {
            return Err(AppError::NothingProcessed);
        }
        Ok(ProcessResponse::new(self.session_id, self.results, self.errors))
    }
}

/// Splits uploads into allowed files and the names of rejected ones.
///
/// Parts with an empty file name are dropped entirely.
pub fn partition_files(files: Vec<UploadedFile>) -> (Vec<UploadedFile>, Vec<String>) {
    let mut valid = Vec::new();
    let mut skipped = Vec::new();
    for file in files {
        if file.is_allowed() {
            valid.push(file);
        } else if !file.name.is_empty() {
            skipped.push(file.name);
        }
    }
    (valid, skipped)
}

pub fn skipped_message(skipped: &[String]) -> String {
    format!("Skipped non-PDF files: {}", skipped.join(", "))
}

/// Processes the documents of one submission strictly in order.
pub struct BatchCoordinator<'a> {
    config: &'a Config,
    clients: &'a dyn ClientFactory,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(config: &'a Config, clients: &'a dyn ClientFactory) -> Self {
        Self { config, clients }
    }

    pub async fn run(&self, request: BatchRequest) -> AppResult<BatchOutcome> {
        let session = Session::create(self.config)
            .map_err(|e| AppError::internal(format!("Failed to create session directories: {}", e)))?;
        info!(
            session_id = %session.id,
            files = request.files.len(),
            skipped = request.skipped.len(),
            correction = request.correction_api_key.is_some(),
            "Starting batch"
        );

        let processor = DocumentProcessor::new(
            self.clients.ocr_client(&request.ocr_api_key),
            request
                .correction_api_key
                .as_deref()
                .map(|key| self.clients.corrector(key)),
        );

        let mut results = Vec::new();
        let mut errors = Vec::new();
        if !request.skipped.is_empty() {
            errors.push(skipped_message(&request.skipped));
        }

        let mut used_bases = HashSet::new();
        for file in &request.files {
            let base = unique_base(document_base(&file.name), &mut used_bases);
            match self.process_file(&session, &processor, file, &base).await {
                Ok(result) => {
                    info!(session_id = %session.id, file_name = %file.name, "File processed and archived");
                    results.push(result);
                }
                Err(message) => {
                    error!(session_id = %session.id, file_name = %file.name, error = %message, "File failed");
                    errors.push(format!("{}: processing error - {}", file.name, message));
                }
            }
        }

        let session_id = session.id.clone();
        session.close();

        info!(
            session_id = %session_id,
            succeeded = results.len(),
            errors = errors.len(),
            "Batch finished"
        );
        Ok(BatchOutcome {
            session_id,
            results,
            errors,
        })
    }

    async fn process_file(
        &self,
        session: &Session,
        processor: &DocumentProcessor,
        file: &UploadedFile,
        base: &str,
    ) -> Result<FileResult, String> {
        let upload_name = match secure_filename(&file.name) {
            name if name.is_empty() => format!("{}.pdf", base),
            name => name,
        };

        let scratch = session
            .store_upload(&upload_name, &file.content)
            .await
            .map_err(|e| format!("Failed to store upload: {}", e))?;

        let processed = processor
            .process(scratch.path(), &upload_name, base, &session.output_dir)
            .await;
        discard_upload(scratch);
        let document = processed.map_err(|e| e.user_message())?;

        let zip_filename = archive_name(base);
        archive_document(&document, session.output_dir.join(&zip_filename)).await;

        Ok(FileResult {
            original_filename: file.name.clone(),
            download_url: self.download_url(&session.id, &zip_filename),
            zip_filename,
            preview: Preview {
                markdown: document.markdown,
                images: document.images,
                pdf_base: document.base,
            },
        })
    }

    fn download_url(&self, session_id: &str, zip_filename: &str) -> String {
        let prefix = self
            .config
            .public_base_url
            .as_deref()
            .unwrap_or("")
            .trim_end_matches('/');
        format!("{}/download/{}/{}", prefix, session_id, zip_filename)
    }
}

/// A failed archive only leaves that document's download link dangling.
async fn archive_document(document: &ProcessedDocument, zip_path: PathBuf) {
    let dir = document.output_dir.clone();
    let target = zip_path.clone();
    match tokio::task::spawn_blocking(move || create_zip_archive(&dir, &target)).await {
        Ok(Ok(entries)) => info!(path = %zip_path.display(), entries = entries, "Archive created"),
        Ok(Err(e)) => warn!(path = %zip_path.display(), error = %e, "Archive creation failed"),
        Err(e) => warn!(path = %zip_path.display(), error = %e, "Archive task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(results: usize, errors: &[&str]) -> BatchOutcome {
        let result = FileResult {
            original_filename: "a.pdf".into(),
            zip_filename: "a_output.zip".into(),
            download_url: "/download/s/a_output.zip".into(),
            preview: Preview {
                markdown: String::new(),
                images: vec![],
                pdf_base: "a".into(),
            },
        };
        BatchOutcome {
            session_id: "s".into(),
            results: vec![result; results],
            errors: errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn classifies_outcomes() {
        assert!(matches!(
            outcome(0, &["a.pdf: processing error - boom"]).classify(),
            Err(AppError::AllFailed { details }) if details.len() == 1
        ));
        assert!(matches!(outcome(0, &[]).classify(), Err(AppError::NothingProcessed)));

        let partial = outcome(1, &["b.pdf: processing error - boom"]).classify().unwrap();
        assert!(partial.success);
        assert_eq!(partial.errors.len(), 1);
    }

    #[test]
    fn partitions_by_extension() {
        let files = vec![
            UploadedFile::new("a.PDF".into(), vec![1]),
            UploadedFile::new("notes.txt".into(), vec![1]),
            UploadedFile::new("".into(), vec![]),
            UploadedFile::new("pdf".into(), vec![1]),
        ];
        let (valid, skipped) = partition_files(files);
        assert_eq!(valid.len(), 1);
        assert_eq!(skipped, vec!["notes.txt", "pdf"]);
    }
}
