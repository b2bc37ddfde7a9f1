use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub session_id: String,
    pub results: Vec<FileResult>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub original_filename: String,
    pub zip_filename: String,
    pub download_url: String,
    pub preview: Preview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub markdown: String,
    pub images: Vec<String>,
    pub pdf_base: String,
}

impl ProcessResponse {
    pub fn new(session_id: String, results: Vec<FileResult>, errors: Vec<String>) -> Self {
        Self {
            success: true,
            session_id,
            results,
            errors,
        }
    }
}
