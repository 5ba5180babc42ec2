use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::GenerationError;

// ═══════════════════════════════════════════
// Wire types (OpenAI-compatible chat completion)
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ═══════════════════════════════════════════
// Transport seam
// ═══════════════════════════════════════════

/// Sends one chat-completion request and returns the assistant's text.
///
/// Implementations map transport failures onto [`GenerationError`]; they
/// never retry.
pub trait ChatTransport: Send + Sync {
    fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Bearer-authenticated HTTPS transport.
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpChatTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::GenerationFailed(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ChatTransport for HttpChatTransport {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, GenerationError> {
        tracing::debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, "Request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status.as_u16(), &body, self.timeout));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e, "Invalid response body"))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::GenerationFailed("Response had no choices".into()))
    }
}

impl HttpChatTransport {
    /// The client timeout covers the whole exchange, so a stall while the
    /// body is read is a timeout too.
    fn map_transport_error(&self, e: reqwest::Error, context: &str) -> GenerationError {
        if e.is_timeout() {
            GenerationError::RequestTimeout(self.timeout.as_secs())
        } else {
            tracing::warn!(error = %e, "Chat completion request failed");
            GenerationError::GenerationFailed(format!("{context}: {e}"))
        }
    }
}

/// Non-2xx HTTP status to error kind.
fn map_status(status: u16, body: &str, timeout: Duration) -> GenerationError {
    match status {
        401 => GenerationError::InvalidCredential,
        429 => GenerationError::RateLimited,
        408 => GenerationError::RequestTimeout(timeout.as_secs()),
        _ => {
            tracing::warn!(status, "Generation service returned an error status");
            GenerationError::GenerationFailed(format!("HTTP {status}: {}", body.trim()))
        }
    }
}

// ═══════════════════════════════════════════
// Mock transport
// ═══════════════════════════════════════════

/// Test transport returning a canned reply or error, optionally after a delay.
pub struct MockChatTransport {
    reply: Result<String, GenerationError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ChatCompletionRequest>>,
}

impl MockChatTransport {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `complete` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatCompletionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ChatTransport for MockChatTransport {
    async fn complete(
        &self,
        _api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}
