//! Text-generation API interaction with exponential backoff retry logic.
//!
//! The augmentation stage turns each stored summary into a ready-to-post
//! LinkedIn text through an OpenAI-compatible chat-completions endpoint.
//! The module uses a trait-based design:
//! - [`Generate`]: core trait, "given a summary, return generated text"
//! - [`ChatClient`]: the HTTP client implementation
//! - [`RetryGenerate`]: decorator adding retry logic to any implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};

const SYSTEM_PROMPT: &str = "Você é um estrategista de marketing experiente e direto.";

/// Capability consumed by the augmentation stage.
#[async_trait]
pub trait Generate: Send + Sync {
    /// Produce the generated text for one stored summary.
    async fn generate(&self, summary: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("generator API key is empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl Generate for ChatClient {
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, summary: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(summary),
                },
            ],
            temperature: 0.7,
            max_tokens: 500,
        };

        let t0 = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                elapsed_ms = t0.elapsed().as_millis() as u128,
                %status,
                "generation API call failed"
            );
            return Err(Error::Generation(format!("API error ({status}): {message}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("malformed API response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::Generation("empty response from model".to_string()))
    }
}

/// The generation brief, kept word-for-word from the campaign that the
/// worksheet feeds.
fn user_prompt(summary: &str) -> String {
    [
        "Crie um post para LinkedIn com tom provocador e autoridade técnica sobre o tema.",
        "",
        &format!("Resumo do artigo:\n\"{summary}\""),
        "",
        "O texto deve:",
        "– Começar com uma frase que aponte um erro comum no mercado",
        "– Mostrar o contraste entre a prática superficial e a prática correta",
        "– Incluir um exemplo real (ou simulado) que mostre como isso se aplica na prática",
        "– Terminar com uma provocação aberta, convidando ao debate",
        "",
        "Direto, frases curtas, até 1300 caracteres, com hashtags específicas no final.",
    ]
    .join("\n")
}

/// Wrapper that adds exponential backoff retry logic to any [`Generate`]
/// implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryGenerate<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> RetryGenerate<T>
where
    T: Generate,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T> Generate for RetryGenerate<T>
where
    T: Generate,
{
    #[instrument(level = "info", skip_all)]
    async fn generate(&self, summary: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.generate(summary).await {
                Ok(text) => {
                    info!(
                        attempt,
                        elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                        "generate() succeeded"
                    );
                    return Ok(text);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "generate() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "generate() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_chat_client_returns_generated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "  Post pronto.  " } }]
            })))
            .mount(&server)
            .await;

        let client = ChatClient::new("test-key", "gpt-4o-mini", &server.uri()).unwrap();
        let text = client.generate("Um resumo longo o bastante.").await.unwrap();
        assert_eq!(text, "Post pronto.");
    }

    #[tokio::test]
    async fn test_chat_client_maps_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = ChatClient::new("test-key", "gpt-4o-mini", &server.uri()).unwrap();
        let err = client.generate("resumo").await.unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[test]
    fn test_empty_api_key_is_a_config_error() {
        assert!(matches!(
            ChatClient::new("  ", "gpt-4o-mini", "https://api.openai.com/v1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_user_prompt_embeds_summary() {
        let prompt = user_prompt("resumo do artigo aqui");
        assert!(prompt.contains("\"resumo do artigo aqui\""));
        assert!(prompt.contains("LinkedIn"));
    }

    struct FlakyGenerator {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl Generate for FlakyGenerator {
        async fn generate(&self, _summary: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(Error::Generation("transient".to_string()))
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let flaky = FlakyGenerator {
            calls: AtomicUsize::new(0),
            fail_first: 2,
        };
        let retrying = RetryGenerate::new(flaky, 5, Duration::from_millis(1));
        let text = retrying.generate("resumo").await.unwrap();
        assert_eq!(text, "ok");
        assert_eq!(retrying.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let flaky = FlakyGenerator {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        };
        let retrying = RetryGenerate::new(flaky, 2, Duration::from_millis(1));
        assert!(retrying.generate("resumo").await.is_err());
        assert_eq!(retrying.inner.calls.load(Ordering::SeqCst), 3);
    }
}
