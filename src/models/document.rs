use std::path::PathBuf;

/// Output of the document processor for one PDF.
///
/// Carries the final Markdown in memory so callers never re-read it from disk.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub base: String,
    pub markdown: String,
    /// Renamed image files, in extraction order.
    pub images: Vec<String>,
    pub markdown_path: PathBuf,
    pub images_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Paths of one document's output subtree.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
    pub markdown_path: PathBuf,
    pub ocr_json_path: PathBuf,
}

impl DocumentLayout {
    /// `{session_output}/{base}/` with `images/`, `{base}_output.md` and `ocr_response.json`.
    pub fn new(session_output: &std::path::Path, base: &str) -> Self {
        let output_dir = session_output.join(base);
        Self {
            images_dir: output_dir.join("images"),
            markdown_path: output_dir.join(format!("{}_output.md", base)),
            ocr_json_path: output_dir.join("ocr_response.json"),
            output_dir,
        }
    }
}

/// `{base}_output.zip`, stored next to the document directory.
pub fn archive_name(base: &str) -> String {
    format!("{}_output.zip", base)
}
