use axum::{
    extract::{Multipart, State},
    response::Json,
};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::key_prefix;
use crate::error::{AppError, AppResult};
use crate::models::{ProcessForm, ProcessResponse, UploadedFile};
use crate::services::batch::{partition_files, BatchCoordinator, BatchRequest};
use crate::state::AppState;

/// `POST /process`: OCR every PDF of the submission into Markdown.
pub async fn process_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ProcessResponse>> {
    let start = Instant::now();
    let form = read_process_form(multipart).await?;
    let request = validate_form(&state, form)?;

    let coordinator = BatchCoordinator::new(&state.config, state.clients.as_ref());
    let outcome = coordinator.run(request).await?;
    let session_id = outcome.session_id.clone();
    let response = outcome.classify()?;

    info!(
        session_id = %session_id,
        results = response.results.len(),
        errors = response.errors.len(),
        total_time_ms = start.elapsed().as_millis() as u64,
        "Batch request completed"
    );
    Ok(Json(response))
}

/// Checks run in order; the first failure rejects the whole request.
fn validate_form(state: &AppState, form: ProcessForm) -> AppResult<BatchRequest> {
    if !form.saw_file_part {
        return Err(AppError::MissingFiles);
    }

    let ocr_api_key = state
        .config
        .resolve_ocr_key(form.api_key)
        .ok_or(AppError::MissingApiKey)?;
    debug!(key = %key_prefix(&ocr_api_key), "OCR API key resolved");

    if form.files.iter().all(|f| f.name.is_empty()) {
        return Err(AppError::NoFilesSelected);
    }

    let (files, skipped) = partition_files(form.files);
    if files.is_empty() {
        return Err(AppError::NoValidFiles { skipped });
    }

    let correction_api_key = state
        .config
        .resolve_correction_key(form.openai_api_key, form.use_openai);

    Ok(BatchRequest {
        files,
        skipped,
        ocr_api_key,
        correction_api_key,
    })
}

async fn read_process_form(mut multipart: Multipart) -> AppResult<ProcessForm> {
    let mut form = ProcessForm::default();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "pdf_files" => {
                form.saw_file_part = true;
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field.bytes().await?;

                let mut file = UploadedFile::new(file_name, data.to_vec());
                if let Some(mime_type) = content_type {
                    file = file.with_mime_type(mime_type);
                }
                debug!(
                    "Received file: {} ({} bytes, type: {:?})",
                    file.name,
                    file.size,
                    file.mime_type
                );
                form.files.push(file);
            }
            "api_key" => form.api_key = Some(field.text().await?),
            "openai_api_key" => form.openai_api_key = Some(field.text().await?),
            "use_openai" => form.use_openai = field.text().await?.trim() == "true",
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}
