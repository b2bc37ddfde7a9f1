use std::sync::Arc;

use crate::config::Config;
use crate::error::ServiceError;
use crate::services::correction::{OpenAiCorrector, TextCorrector};
use crate::services::ocr_service::{MistralOcrClient, OcrService};

/// Builds service clients for the credentials supplied with a request.
pub trait ClientFactory: Send + Sync {
    fn ocr_client(&self, api_key: &str) -> Box<dyn OcrService>;

    fn corrector(&self, api_key: &str) -> Box<dyn TextCorrector>;
}

/// Production clients talking to the configured remote APIs.
pub struct RemoteClients {
    config: Arc<Config>,
    http: reqwest::Client,
}

impl RemoteClients {
    pub fn new(config: Arc<Config>) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::transport("http", e))?;
        Ok(Self { config, http })
    }
}

impl ClientFactory for RemoteClients {
    fn ocr_client(&self, api_key: &str) -> Box<dyn OcrService> {
        Box::new(MistralOcrClient::new(self.http.clone(), &self.config.ocr, api_key))
    }

    fn corrector(&self, api_key: &str) -> Box<dyn TextCorrector> {
        Box::new(OpenAiCorrector::new(
            self.http.clone(),
            &self.config.correction,
            api_key,
        ))
    }
}
