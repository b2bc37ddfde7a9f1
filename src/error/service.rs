//! Errors raised at the OCR and correction service boundary.
//!
//! Third-party failures arrive as a mix of transport errors, HTTP bodies
//! and client-library errors. They are all funnelled through
//! [`ServiceError`] so the message shown to the user is extracted in one
//! place ([`ServiceError::user_message`]).

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API error {status}: {body}")]
    Api {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("{service} client error: {message}")]
    Client {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        ServiceError::Transport { service, source }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Decode {
            service,
            message: message.into(),
        }
    }

    pub fn client(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Client {
            service,
            message: message.into(),
        }
    }

    /// Human-readable message for the batch error list.
    pub fn user_message(&self) -> String {
        extract_error_message(&self.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for ServiceError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        match err {
            async_openai::error::OpenAIError::ApiError(api) => ServiceError::Client {
                service: "correction",
                message: api.message,
            },
            other => ServiceError::client("correction", other.to_string()),
        }
    }
}

/// Pulls the `message` out of a JSON payload embedded in a failure's text.
///
/// Looks at everything from the first `{` onwards. Falls back to the whole
/// text when there is no object or it carries no usable message.
pub fn extract_error_message(text: &str) -> String {
    let Some(start) = text.find('{') else {
        return text.to_string();
    };

    match serde_json::from_str::<Value>(&text[start..]) {
        Ok(payload) => message_field(&payload).unwrap_or_else(|| text.to_string()),
        Err(_) => text.to_string(),
    }
}

fn message_field(payload: &Value) -> Option<String> {
    let candidates = [
        payload.get("message"),
        payload.get("error").and_then(|e| e.get("message")),
        payload.get("detail"),
    ];

    candidates.into_iter().flatten().find_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Null => None,
        // validation errors put a list of objects under `detail`
        other if !other.is_string() => Some(other.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_level_message() {
        let text = r#"API error occurred: Status 401 {"message":"Unauthorized","request_id":"abc"}"#;
        assert_eq!(extract_error_message(text), "Unauthorized");
    }

    #[test]
    fn extracts_nested_openai_style_message() {
        let text = r#"correction API error 429 Too Many Requests: {"error":{"message":"Rate limit reached","type":"requests"}}"#;
        assert_eq!(extract_error_message(text), "Rate limit reached");
    }

    #[test]
    fn falls_back_to_full_text_without_json() {
        assert_eq!(extract_error_message("connection reset"), "connection reset");
    }

    #[test]
    fn falls_back_when_json_is_malformed() {
        let text = "ocr API error 500: {not json";
        assert_eq!(extract_error_message(text), text);
    }

    #[test]
    fn falls_back_when_object_has_no_message() {
        let text = r#"ocr API error 400: {"code":17}"#;
        assert_eq!(extract_error_message(text), text);
    }

    #[test]
    fn api_variant_goes_through_extraction() {
        let err = ServiceError::Api {
            service: "ocr",
            status: StatusCode::UNAUTHORIZED,
            body: r#"{"message":"Invalid API key"}"#.to_string(),
        };
        assert_eq!(err.user_message(), "Invalid API key");
    }
}
