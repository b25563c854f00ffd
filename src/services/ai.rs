//! Text generation through Google's Gemini `generateContent` endpoint.
//!
//! Handlers talk to the [`TextGenerator`] trait so generation can be swapped
//! out in tests. Generation is best-effort: [`generate_or_fallback`] turns any
//! failure into a canned message instead of an error response.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Returned when the model answers without any text part.
pub const EMPTY_RESPONSE_TEXT: &str = "No response";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Gemini API key is not configured")]
    MissingApiKey,

    #[error("Gemini request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemini quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Malformed Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        Self::new(
            &config.gemini_api_url,
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            Duration::from_secs(config.ai_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            tracing::error!(status = status.as_u16(), message = %message, "Gemini API error");
            if status.as_u16() == 429 {
                return Err(GenerationError::QuotaExceeded(message));
            }
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        Ok(parsed
            .first_text()
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Gemini,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
    pub source: GenerationSource,
}

/// Run a prompt, substituting `fallback` if generation fails for any reason.
pub async fn generate_or_fallback(
    generator: &dyn TextGenerator,
    prompt: &str,
    fallback: &str,
) -> Generated {
    match generator.generate(prompt).await {
        Ok(text) => Generated {
            text,
            source: GenerationSource::Gemini,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Text generation unavailable, using fallback");
            Generated {
                text: fallback.to_string(),
                source: GenerationSource::Fallback,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Generator that answers every prompt with a fixed reply, or fails.
    pub struct StaticGenerator {
        pub reply: Option<String>,
    }

    impl StaticGenerator {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Some(text.to_string()),
            }
        }

        pub fn failing() -> Self {
            Self { reply: None }
        }
    }

    #[async_trait]
    impl TextGenerator for StaticGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.reply
                .clone()
                .ok_or_else(|| GenerationError::QuotaExceeded("daily limit".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticGenerator;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: &str) -> GeminiClient {
        GeminiClient::new(&server.uri(), key, "gemini-2.0-flash", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_generate_returns_first_text_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .and(query_param("key", "secret"))
            .and(body_json(json!({"contents": [{"parts": [{"text": "plan please"}]}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "Breakfast: oats"}, {"text": "ignored"}]}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server, "secret").generate("plan please").await.unwrap();
        assert_eq!(text, "Breakfast: oats");
    }

    #[tokio::test]
    async fn test_generate_without_candidates_is_no_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let text = client(&server, "secret").generate("hi").await.unwrap();
        assert_eq!(text, EMPTY_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn test_generate_maps_429_to_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {"code": 429, "message": "Resource has been exhausted"}
            })))
            .mount(&server)
            .await;

        let err = client(&server, "secret").generate("hi").await.unwrap_err();
        match err {
            GenerationError::QuotaExceeded(msg) => assert_eq!(msg, "Resource has been exhausted"),
            other => panic!("expected quota error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_maps_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
            .mount(&server)
            .await;

        let err = client(&server, "secret").generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 500, ref message } if message == "upstream broke"));
    }

    #[tokio::test]
    async fn test_generate_rejects_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server, "secret").generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server, "").generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_fallback_on_failure() {
        let generated =
            generate_or_fallback(&StaticGenerator::failing(), "hi", "Sorry, there was an error.").await;
        assert_eq!(generated.text, "Sorry, there was an error.");
        assert_eq!(generated.source, GenerationSource::Fallback);
    }

    #[tokio::test]
    async fn test_no_fallback_on_success() {
        let generated =
            generate_or_fallback(&StaticGenerator::replying("Drink water"), "hi", "fallback").await;
        assert_eq!(generated.text, "Drink water");
        assert_eq!(generated.source, GenerationSource::Gemini);
    }

    #[test]
    fn test_debug_redacts_key() {
        let c = GeminiClient::new("http://localhost", "super-secret", "m", Duration::from_secs(1)).unwrap();
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
