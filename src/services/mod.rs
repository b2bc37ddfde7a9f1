pub mod archive;
pub mod batch;
pub mod clients;
pub mod correction;
pub mod document_processor;
pub mod ocr_service;
pub mod relink;
pub mod sanitize;
pub mod session;

pub use batch::{BatchCoordinator, BatchOutcome, BatchRequest};
pub use clients::{ClientFactory, RemoteClients};
pub use correction::{OpenAiCorrector, TextCorrector};
pub use document_processor::{DocumentProcessor, ProcessError};
pub use ocr_service::{MistralOcrClient, OcrService};
