//! Spelling correction through a chat-completion model.
//!
//! The model is told to keep Markdown and image links intact and to leave
//! exam questions unanswered, but its output is not trusted on that: every
//! correction is checked by [`validate_correction`] and discarded when it
//! changes the document's structure.

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::config::CorrectionSettings;
use crate::error::ServiceError;
use crate::services::document_processor::PAGE_SEPARATOR;
use crate::services::relink::local_links;

pub const SYSTEM_PROMPT: &str = "\
You are an expert proofreader fixing spelling and grammar in text produced by OCR \
(frequently Korean). Follow these rules strictly:

1. OCR errors: replace misrecognized words with the intended word, using common OCR \
confusions (similar-looking letters or jamo) and the surrounding context. Take particular \
care with names of institutions, universities and people.

2. Preserve formatting:
   - Keep every Markdown construct exactly as it is.
   - Never modify image links of the form ![[...]]; copy them verbatim.
   - Keep indentation, line breaks, special characters and the `---` page separators.

3. Exam and quiz content:
   - Never solve, answer, explain or comment on questions. Leave them as they are.
   - This includes multiple-choice, short-answer and essay questions, sentences ending in \
'?', phrases such as 'which of the following', and numbered items (1. 2. 3.).

4. Scope of correction: spelling, spacing, punctuation and words misread by OCR. Nothing else.

5. Caution:
   - When unsure, keep the original.
   - Review technical terms and proper nouns carefully.
   - Do not touch formulas or code blocks.
   - Return only the corrected text, with no preamble and no commentary.";

/// Service that proofreads a document body.
#[async_trait]
pub trait TextCorrector: Send + Sync {
    async fn correct(&self, text: &str) -> Result<String, ServiceError>;
}

pub struct OpenAiCorrector {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiCorrector {
    pub fn new(http: reqwest::Client, settings: &CorrectionSettings, api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(settings.api_base.trim_end_matches('/'));
        Self {
            client: Client::with_config(config).with_http_client(http),
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }
}

#[async_trait]
impl TextCorrector for OpenAiCorrector {
    async fn correct(&self, text: &str) -> Result<String, ServiceError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(text)
                    .build()?
                    .into(),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::decode("correction", "completion has no content"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    ImageLinksChanged,
    PageBreaksChanged,
    LinesChanged { original: usize, corrected: usize },
    TooLong { original: usize, corrected: usize },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::Empty => write!(f, "correction is empty"),
            Rejection::ImageLinksChanged => write!(f, "image links were altered"),
            Rejection::PageBreaksChanged => write!(f, "page separators were altered"),
            Rejection::LinesChanged { original, corrected } => write!(
                f,
                "non-empty lines went from {} to {}",
                original, corrected
            ),
            Rejection::TooLong { original, corrected } => write!(
                f,
                "correction grew from {} to {} characters",
                original, corrected
            ),
        }
    }
}

static RE_WRAPPING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

/// Removes a ```markdown fence wrapped around the whole reply.
pub fn strip_wrapping_fence(text: &str) -> &str {
    RE_WRAPPING_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
}

/// Structural checks a correction must pass to replace the original.
pub fn validate_correction(original: &str, corrected: &str) -> Result<(), Rejection> {
    if corrected.trim().is_empty() {
        return Err(Rejection::Empty);
    }
    if local_links(original) != local_links(corrected) {
        return Err(Rejection::ImageLinksChanged);
    }
    if original.matches(PAGE_SEPARATOR).count() != corrected.matches(PAGE_SEPARATOR).count() {
        return Err(Rejection::PageBreaksChanged);
    }

    // an appended answer or explanation shows up as extra lines
    let original_lines = content_lines(original);
    let corrected_lines = content_lines(corrected);
    if original_lines != corrected_lines {
        return Err(Rejection::LinesChanged {
            original: original_lines,
            corrected: corrected_lines,
        });
    }

    let original_len = original.chars().count();
    let corrected_len = corrected.chars().count();
    if corrected_len > original_len + original_len / 2 + 200 {
        return Err(Rejection::TooLong {
            original: original_len,
            corrected: corrected_len,
        });
    }
    Ok(())
}

fn content_lines(text: &str) -> usize {
    text.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Corrected text, or `text` unchanged when the call fails or the result is rejected.
pub async fn correct_spelling(corrector: &dyn TextCorrector, text: &str) -> String {
    let corrected = match corrector.correct(text).await {
        Ok(corrected) => corrected,
        Err(e) => {
            warn!(error = %e.user_message(), "Spelling correction failed, keeping original text");
            return text.to_string();
        }
    };

    // a body that is itself one fenced block comes back with its fence
    let corrected = if RE_WRAPPING_FENCE.is_match(text) {
        corrected.as_str()
    } else {
        strip_wrapping_fence(&corrected)
    };
    match validate_correction(text, corrected) {
        Ok(()) => {
            info!(
                original_bytes = text.len(),
                corrected_bytes = corrected.len(),
                "Spelling correction applied"
            );
            corrected.to_string()
        }
        Err(rejection) => {
            warn!(reason = %rejection, "Spelling correction rejected, keeping original text");
            text.to_string()
        }
    }
}
