//! Ticket triage through an external LLM.
//!
//! The classifier is fail-open: a missing API key, a transport error, a bad
//! status code or an unparseable reply all produce the same default
//! suggestion, so ticket submission never waits on the provider succeeding.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::models::{Category, ClassificationResult, Priority};

pub const DEFAULT_AI_RESPONSE: &str = "Thank you for contacting support. We have received your ticket and an admin will follow up with you shortly.";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const CLASSIFY_PROMPT: &str = r#"You are a support ticket classification assistant.

Read the support ticket description below and decide:
1. The most appropriate category. It must be exactly one of: billing, technical, account, general
2. The most appropriate priority. It must be exactly one of: low, medium, high, critical
3. A short acknowledgement for the customer.

Category guidelines:
- "billing": payments, invoices, charges, refunds, subscription pricing
- "technical": bugs, errors, crashes, performance problems, broken features, API problems
- "account": login trouble, password resets, profile changes, account access, permissions
- "general": questions, feedback, feature requests, anything else

Priority guidelines:
- "critical": system down, data loss, security breach, product completely unusable
- "high": major feature broken, significant workflow impact, urgent deadline
- "medium": feature partially broken, a workaround exists, moderate inconvenience
- "low": cosmetic issue, general question, feature request, no immediate impact

The acknowledgement ("ai_response") must be 1-2 sentences in a professional tone,
mention the specific issue described, and end by saying that an admin will follow up.

Respond ONLY with a JSON object in exactly this format (no markdown, no extra text):
{"suggested_category": "<category>", "suggested_priority": "<priority>", "ai_response": "<acknowledgement>"}

Ticket description:
{description}"#;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("external service failure: {0}")]
    ExternalServiceFailure(String),
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        ClassifyError::ExternalServiceFailure(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifyError {
    fn from(err: serde_json::Error) -> Self {
        ClassifyError::ExternalServiceFailure(format!("invalid JSON: {}", err))
    }
}

/// A text-in, text-out completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ClassifyError>;
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// `None` or blank disables the provider entirely.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Google Gemini `generateContent` over REST.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ClassifyError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::ExternalServiceFailure(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ClassifyError::ExternalServiceFailure(
                "response contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

impl ClassificationResult {
    /// The suggestion used whenever the provider is unavailable.
    pub fn fallback() -> Self {
        Self {
            suggested_category: Category::General,
            suggested_priority: Priority::Medium,
            ai_response: DEFAULT_AI_RESPONSE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Classifier {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl Classifier {
    /// Builds a Gemini-backed classifier, or a disabled one when no key is set.
    pub fn new(config: &ClassifierConfig) -> Self {
        let api_key = match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => {
                warn!("No LLM API key configured, classification will use defaults");
                return Self::disabled();
            }
        };

        match GeminiProvider::new(
            api_key,
            &config.model,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        ) {
            Ok(provider) => Self::with_provider(Arc::new(provider)),
            Err(e) => {
                error!(error = %e, "Failed to build LLM client, classification will use defaults");
                Self::disabled()
            }
        }
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Single best-effort attempt. Never fails.
    pub async fn classify(&self, description: &str) -> ClassificationResult {
        let Some(provider) = &self.provider else {
            return ClassificationResult::fallback();
        };

        let prompt = build_prompt(description);
        let outcome = match provider.generate(&prompt).await {
            Ok(text) => parse_response(&text),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                debug!(
                    category = %result.suggested_category,
                    priority = %result.suggested_priority,
                    "Classified ticket description"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "LLM classification failed, using defaults");
                ClassificationResult::fallback()
            }
        }
    }
}

pub fn build_prompt(description: &str) -> String {
    CLASSIFY_PROMPT.replace("{description}", description)
}

/// Parses the model's reply. Out-of-range category or priority values fall back
/// to their defaults; only an unreadable reply is an error.
pub fn parse_response(text: &str) -> Result<ClassificationResult, ClassifyError> {
    let json = strip_code_fence(text.trim());
    let value: Value = serde_json::from_str(json)?;
    let obj = value.as_object().ok_or_else(|| {
        ClassifyError::ExternalServiceFailure("response is not a JSON object".to_string())
    })?;

    let suggested_category = obj
        .get("suggested_category")
        .and_then(Value::as_str)
        .and_then(|s| s.to_lowercase().parse::<Category>().ok())
        .unwrap_or_default();

    let suggested_priority = obj
        .get("suggested_priority")
        .and_then(Value::as_str)
        .and_then(|s| s.to_lowercase().parse::<Priority>().ok())
        .unwrap_or_default();

    let ai_response = obj
        .get("ai_response")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_AI_RESPONSE)
        .to_string();

    Ok(ClassificationResult {
        suggested_category,
        suggested_priority,
        ai_response,
    })
}

/// Drops a surrounding markdown fence: the opening line and the last closing fence.
fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }
    let body = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let body = match body.rfind("```") {
        Some(idx) => &body[..idx],
        None => body,
    };
    body.trim()
}
