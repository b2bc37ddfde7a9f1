pub mod service;
pub mod types;

pub use service::{extract_error_message, ServiceError};
pub use types::{AppError, AppResult};
