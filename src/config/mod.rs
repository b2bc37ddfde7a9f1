use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_concurrent_requests: usize,
    pub request_timeout_seconds: u64,
    pub upload_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Prefix for download links, e.g. `https://ocr.example.com`.
    pub public_base_url: Option<String>,
    pub ocr: OcrSettings,
    pub correction: CorrectionSettings,
}

#[derive(Clone)]
pub struct OcrSettings {
    pub api_base: String,
    pub model: String,
    pub signed_url_expiry_hours: u32,
    pub fallback_api_key: Option<String>,
}

#[derive(Clone)]
pub struct CorrectionSettings {
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub fallback_api_key: Option<String>,
}

// Keys stay out of Debug output; only whether one is present is shown.
impl std::fmt::Debug for OcrSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrSettings")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("signed_url_expiry_hours", &self.signed_url_expiry_hours)
            .field("fallback_api_key", &self.fallback_api_key.is_some())
            .finish()
    }
}

impl std::fmt::Debug for CorrectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectionSettings")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("fallback_api_key", &self.fallback_api_key.is_some())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 5001,
            max_file_size_mb: 50,
            max_concurrent_requests: 4,
            request_timeout_seconds: 300,
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            public_base_url: None,
            ocr: OcrSettings {
                api_base: "https://api.mistral.ai/v1".to_string(),
                model: "mistral-ocr-latest".to_string(),
                signed_url_expiry_hours: 1,
                fallback_api_key: None,
            },
            correction: CorrectionSettings {
                api_base: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o".to_string(),
                temperature: 0.3,
                fallback_api_key: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");
        let defaults = Config::default();

        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                info!("SERVER_HOST not set, using default: {}", defaults.server_host);
                defaults.server_host.clone()
            }),
            server_port: Self::parse_env_var("SERVER_PORT", defaults.server_port)
                .context("Failed to parse SERVER_PORT")?,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            max_concurrent_requests: Self::parse_env_var(
                "MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            )
            .context("Failed to parse MAX_CONCURRENT_REQUESTS")?,
            request_timeout_seconds: Self::parse_env_var(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )
            .context("Failed to parse REQUEST_TIMEOUT_SECONDS")?,
            upload_dir: Self::env_string("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            output_dir: Self::env_string("OUTPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_base_url: Self::env_string("PUBLIC_BASE_URL"),
            ocr: OcrSettings {
                api_base: Self::env_string("OCR_API_BASE").unwrap_or(defaults.ocr.api_base),
                model: Self::env_string("OCR_MODEL").unwrap_or(defaults.ocr.model),
                signed_url_expiry_hours: Self::parse_env_var(
                    "SIGNED_URL_EXPIRY_HOURS",
                    defaults.ocr.signed_url_expiry_hours,
                )
                .context("Failed to parse SIGNED_URL_EXPIRY_HOURS")?,
                fallback_api_key: Self::env_string("MISTRAL_API_KEY"),
            },
            correction: CorrectionSettings {
                api_base: Self::env_string("CORRECTION_API_BASE")
                    .unwrap_or(defaults.correction.api_base),
                model: Self::env_string("CORRECTION_MODEL").unwrap_or(defaults.correction.model),
                temperature: Self::parse_env_var(
                    "CORRECTION_TEMPERATURE",
                    defaults.correction.temperature,
                )
                .context("Failed to parse CORRECTION_TEMPERATURE")?,
                fallback_api_key: Self::env_string("OPENAI_API_KEY"),
            },
        };

        config.validate()?;

        match &config.ocr.fallback_api_key {
            Some(key) => info!("Fallback OCR API key loaded (prefix: {})", key_prefix(key)),
            None => warn!("MISTRAL_API_KEY not set; every request must supply an OCR API key"),
        }

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn env_string(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.trim().parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_REQUESTS must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECONDS must be greater than 0"));
        }
        if self.ocr.signed_url_expiry_hours == 0 {
            return Err(anyhow::anyhow!("SIGNED_URL_EXPIRY_HOURS must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.correction.temperature) {
            return Err(anyhow::anyhow!("CORRECTION_TEMPERATURE must be between 0 and 2"));
        }
        Ok(())
    }

    /// Creates the upload and output roots if they are missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.output_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Form value wins; the environment key is the fallback.
    pub fn resolve_ocr_key(&self, form_value: Option<String>) -> Option<String> {
        non_empty(form_value).or_else(|| {
            let key = self.ocr.fallback_api_key.clone();
            if let Some(k) = &key {
                info!("Using fallback OCR API key from environment (prefix: {})", key_prefix(k));
            }
            key
        })
    }

    /// `None` whenever correction was not requested, regardless of keys.
    pub fn resolve_correction_key(
        &self,
        form_value: Option<String>,
        use_correction: bool,
    ) -> Option<String> {
        if !use_correction {
            info!("Spelling correction disabled for this request");
            return None;
        }
        non_empty(form_value).or_else(|| self.correction.fallback_api_key.clone())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First four characters of a credential, for log lines.
pub fn key_prefix(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}...", prefix)
}
