pub mod document;
pub mod ocr;
pub mod request;
pub mod response;

pub use document::{archive_name, DocumentLayout, ProcessedDocument};
pub use ocr::{OcrImage, OcrPage, OcrResponse};
pub use request::{is_allowed_file, ProcessForm, UploadedFile};
pub use response::{FileResult, Preview, ProcessResponse};
