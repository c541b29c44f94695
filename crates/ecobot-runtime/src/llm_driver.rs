//! Completion collaborators for the EcoBot Engineer chat.
//!
//! Two backends implement [`CompletionBackend`]:
//!
//! - [`GeminiDriver`] – Google's hosted `generateContent` REST endpoint
//!   (`https://generativelanguage.googleapis.com`).  Requires an API key.
//! - [`OpenAiCompatDriver`] – any OpenAI-compatible `/v1/chat/completions`
//!   server, such as a local [Ollama](https://ollama.com) instance.
//!
//! Neither driver keeps conversation state; the full turn history is resent
//! with every call so the [`ChatSession`][crate::session::ChatSession] log is
//! the single source of truth.
//!
//! # Example
//!
//! ```rust,no_run
//! use ecobot_runtime::llm_driver::{CompletionBackend, CompletionRequest, GeminiDriver, ECOBOT_ENGINEER_PREAMBLE};
//!
//! # async fn demo() {
//! let driver = GeminiDriver::new(
//!     "https://generativelanguage.googleapis.com",
//!     "gemini-2.5-flash",
//!     std::env::var("GEMINI_API_KEY").ok(),
//! );
//! let request = CompletionRequest {
//!     system_preamble: ECOBOT_ENGINEER_PREAMBLE,
//!     prior_turns: &[],
//!     new_user_text: "Which motor should I use for the paddles?",
//! };
//! // Requires network access and a valid key.
//! // let reply = driver.complete(&request).await.unwrap();
//! # let _ = (driver, request);
//! # }
//! ```

use async_trait::async_trait;
use ecobot_types::{ChatTurn, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

// ─────────────────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────────────────

/// System preamble describing the robot's construction and the assistant's
/// persona.  Sent with every completion request.
pub const ECOBOT_ENGINEER_PREAMBLE: &str = "\
You are \"EcoBot Engineer\", an expert robotics assistant.
You are analyzing a DIY autonomous water cleaning robot simulation.
The robot is made of:
- A Styrofoam cooler box (buoyancy body).
- Two paddle wheels made of popsicle sticks and DC motors (differential drive propulsion).
- A front-mounted net ramp (passive trash collection).
- HC-SR04 Ultrasonic sensors (obstacle avoidance).
- Solar panels (power augmentation).

Your job is to answer user questions about:
1. How to improve this specific design (e.g., better materials, gear ratios, sensor placement).
2. The physics of buoyancy and propulsion involved here.
3. Code logic for autonomous navigation (Arduino/C++ snippets if asked).
4. Environmental impact.

Keep answers concise, technical but accessible, and encouraging for DIY enthusiasts.";

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from a completion backend.
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key was configured for a backend that requires one.
    #[error("API key not found")]
    MissingCredential,
    /// The HTTP request to the model server failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response from the model server could not be interpreted.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend contract
// ─────────────────────────────────────────────────────────────────────────────

/// One stateless completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system_preamble: &'a str,
    /// Every turn before the new user text, oldest first.
    pub prior_turns: &'a [ChatTurn],
    pub new_user_text: &'a str,
}

/// A remote text-completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Return the assistant's reply to `request`.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Gemini
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn gemini_body<'a>(request: &CompletionRequest<'a>) -> GenerateContentRequest<'a> {
    let mut contents: Vec<GeminiContent<'a>> = request
        .prior_turns
        .iter()
        .map(|turn| GeminiContent {
            role: Some(gemini_role(turn.role)),
            parts: vec![GeminiPart { text: &turn.text }],
        })
        .collect();
    contents.push(GeminiContent {
        role: Some("user"),
        parts: vec![GeminiPart {
            text: request.new_user_text,
        }],
    });
    GenerateContentRequest {
        system_instruction: GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: request.system_preamble,
            }],
        },
        contents,
    }
}

fn gemini_reply_text(response: GenerateContentResponse) -> Result<String, LlmError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| LlmError::BadResponse("no candidates in response".into()))?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        return Err(LlmError::BadResponse("candidate has no text parts".into()));
    }
    Ok(text)
}

/// Client for the hosted `generateContent` endpoint.
pub struct GeminiDriver {
    base_url: String,
    model: String,
    api_key: Option<Zeroizing<String>>,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiDriver")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field(
                "api_key",
                if self.api_key.is_some() { &"<redacted>" } else { &"<not set>" },
            )
            .finish()
    }
}

impl GeminiDriver {
    /// Create a driver for `model` at `base_url`.  An empty `api_key` is
    /// treated as absent.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()).map(Zeroizing::new),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl CompletionBackend for GeminiDriver {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::MissingCredential)?;
        let body = gemini_body(request);
        debug!(
            model = %self.model,
            turns = body.contents.len(),
            "sending generateContent request"
        );

        let response: GenerateContentResponse = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key.as_str())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        gemini_reply_text(response)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible (Ollama)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

fn openai_messages(request: &CompletionRequest<'_>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.prior_turns.len() + 2);
    messages.push(ChatMessage {
        role: "system".into(),
        content: request.system_preamble.to_string(),
    });
    messages.extend(request.prior_turns.iter().map(|turn| ChatMessage {
        role: match turn.role {
            Role::User => "user".into(),
            Role::Assistant => "assistant".into(),
        },
        content: turn.text.clone(),
    }));
    messages.push(ChatMessage {
        role: "user".into(),
        content: request.new_user_text.to_string(),
    });
    messages
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
///
/// Local servers such as Ollama need no key; hosted ones receive it as a
/// bearer token.
pub struct OpenAiCompatDriver {
    base_url: String,
    model: String,
    api_key: Option<Zeroizing<String>>,
    client: reqwest::Client,
}

impl OpenAiCompatDriver {
    /// Create a new driver pointing at `base_url` (e.g. `"http://localhost:11434"`)
    /// and using `model` (e.g. `"llama3"`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Attach a bearer token.
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(Zeroizing::new(api_key)).filter(|k| !k.is_empty());
        self
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatDriver {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: openai_messages(request),
            stream: false,
        };
        debug!(model = %self.model, messages = body.messages.len(), "sending chat completion");

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.as_str());
        }
        let response: ChatResponse = builder.send().await?.error_for_status()?.json().await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::BadResponse("empty choices array".into()))
    }
}
