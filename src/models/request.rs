use std::path::Path;

/// One file part of a batch submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub size: usize,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: String, content: Vec<u8>) -> Self {
        let size = content.len();
        Self {
            name,
            size,
            content,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: String) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    /// Only the extension decides; content type and magic bytes are not checked.
    pub fn is_allowed(&self) -> bool {
        is_allowed_file(&self.name)
    }
}

pub fn is_allowed_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Fields of the `POST /process` form.
#[derive(Debug, Default)]
pub struct ProcessForm {
    pub files: Vec<UploadedFile>,
    pub saw_file_part: bool,
    pub api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub use_openai: bool,
}
