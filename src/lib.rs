//! pdfmark: batch PDF to Markdown conversion service
//!
//! Sends uploaded PDFs to a remote OCR service, rebuilds each document as
//! Markdown with locally stored images, optionally proofreads the text with
//! a language model, and packages every document as a zip archive.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
