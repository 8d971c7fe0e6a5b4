use std::thread;
use std::time::Duration;

use thiserror::Error;

use super::chat::{ChatMessage, ToolDefinition};

/// Failure of a call to the Ollama server.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Connection refused, DNS failure, or a body that could not be read.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Non-success status; 5xx is retried.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The server answered, but not with what the call needs.
    #[error("Ollama API error: {message}")]
    Api { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl OllamaError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OllamaError::Timeout(error)
        } else {
            OllamaError::Network(error)
        }
    }
}

/// Default overall request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Pauses between attempts of a transient-failing request.
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

const DEFAULT_HOST: &str = "http://localhost:11434";

/// Configures an [`OllamaClient`].
///
/// Host and model come from `OLLAMA_HOST` and `OLLAMA_MODEL` unless set
/// explicitly; the host falls back to `http://localhost:11434` and the model
/// to an empty string.
///
/// ```
/// use garden::ollama::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("llama3.2")
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(client.model(), "llama3.2");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    retry_delays: Option<Vec<Duration>>,
}

impl OllamaClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overall timeout per request (default [`DEFAULT_TIMEOUT`]).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Pauses between retries; an empty list disables retrying.
    pub fn retry_delays(mut self, delays: impl Into<Vec<Duration>>) -> Self {
        self.retry_delays = Some(delays.into());
        self
    }

    /// Validates the host URL and creates the HTTP client.
    pub fn build(self) -> Result<OllamaClient, OllamaError> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let model = self
            .model
            .or_else(|| std::env::var("OLLAMA_MODEL").ok())
            .unwrap_or_default();

        if let Err(e) = reqwest::Url::parse(&base_url) {
            return Err(OllamaError::InvalidUrl(format!("{base_url}: {e}")));
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(OllamaError::Network)?;

        Ok(OllamaClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            retry_delays: self
                .retry_delays
                .unwrap_or_else(|| DEFAULT_RETRY_DELAYS.to_vec()),
        })
    }
}

/// Blocking client for a local Ollama server.
pub struct OllamaClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    retry_delays: Vec<Duration>,
}

/// The model calls the garden makes.
///
/// `chat` and `embed` default to an "unsupported" error, so a test double
/// only implements what it is asked for.
pub trait OllamaClientTrait: Send + Sync {
    /// Generates text for a single prompt.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, OllamaError>;

    /// Sends a chat exchange, offering `tools` to the model, and returns the
    /// assistant's reply.
    fn chat(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatMessage, OllamaError> {
        Err(OllamaError::Api {
            message: "chat is not supported by this client".to_string(),
        })
    }

    /// Returns the embedding vector for `text`.
    fn embed(&self, _model: &str, _text: &str) -> Result<Vec<f32>, OllamaError> {
        Err(OllamaError::Api {
            message: "embeddings are not supported by this client".to_string(),
        })
    }
}

impl OllamaClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default model, possibly empty.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// POSTs `body` to `endpoint` and decodes the JSON reply, retrying
    /// transient failures.
    fn post_json(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, OllamaError> {
        let url = format!("{}{endpoint}", self.base_url);

        retry_with_backoff(&self.retry_delays, || {
            let response = self
                .http
                .post(&url)
                .json(body)
                .send()
                .map_err(OllamaError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                return Err(OllamaError::Http {
                    status: status.as_u16(),
                });
            }

            let text = response.text().map_err(OllamaError::from_reqwest)?;
            serde_json::from_str(&text).map_err(OllamaError::Serialization)
        })
    }
}

impl OllamaClientTrait for OllamaClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, OllamaError> {
        let json = self.post_json(
            "/api/generate",
            &serde_json::json!({
                "model": model,
                "prompt": prompt,
                "stream": false
            }),
        )?;

        json.get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| OllamaError::Api {
                message: "Missing 'response' field in API response".to_string(),
            })
    }

    fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, OllamaError> {
        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": false
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools).map_err(OllamaError::Serialization)?;
        }

        let json = self.post_json("/api/chat", &body)?;
        parse_chat_reply(json)
    }

    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, OllamaError> {
        let json = self.post_json(
            "/api/embed",
            &serde_json::json!({
                "model": model,
                "input": text
            }),
        )?;
        parse_embed_reply(json)
    }
}

fn parse_chat_reply(mut json: serde_json::Value) -> Result<ChatMessage, OllamaError> {
    let message = json
        .get_mut("message")
        .map(serde_json::Value::take)
        .ok_or_else(|| OllamaError::Api {
            message: "Missing 'message' field in API response".to_string(),
        })?;
    serde_json::from_value(message).map_err(OllamaError::Serialization)
}

fn parse_embed_reply(json: serde_json::Value) -> Result<Vec<f32>, OllamaError> {
    let vector = json
        .get("embeddings")
        .and_then(|e| e.get(0))
        .and_then(|v| v.as_array())
        .ok_or_else(|| OllamaError::Api {
            message: "Missing 'embeddings' field in API response".to_string(),
        })?;

    vector
        .iter()
        .map(|x| {
            x.as_f64().map(|f| f as f32).ok_or_else(|| OllamaError::Api {
                message: "Non-numeric value in embedding".to_string(),
            })
        })
        .collect()
}

/// Runs `attempt`, retrying after each of `delays` while it fails with a
/// transient error (network, timeout, HTTP 5xx). Other errors return at once.
pub fn retry_with_backoff<F, T>(delays: &[Duration], mut attempt: F) -> Result<T, OllamaError>
where
    F: FnMut() -> Result<T, OllamaError>,
{
    let mut pauses = delays.iter();
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) => match pauses.next() {
                Some(pause) => {
                    tracing::debug!(error = %e, pause_ms = pause.as_millis() as u64, "retrying Ollama request");
                    thread::sleep(*pause);
                }
                None => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(error: &OllamaError) -> bool {
    match error {
        OllamaError::Network(_) | OllamaError::Timeout(_) => true,
        OllamaError::Http { status } => *status >= 500,
        OllamaError::Serialization(_) | OllamaError::Api { .. } | OllamaError::InvalidUrl(_) => {
            false
        }
    }
}
