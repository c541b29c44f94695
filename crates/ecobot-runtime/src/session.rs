//! [`ChatSession`] – the append-only chat log behind the EcoBot Engineer panel.
//!
//! The session owns the conversation; completion backends are stateless and
//! receive the whole history on every call.
//!
//! # Rules
//!
//! - Turns are only ever appended.  A new conversation means a new session.
//! - At most one completion request is in flight per session.  A submission
//!   made while another is pending is rejected with [`SessionError::Busy`].
//! - Backend failures (missing key, network, bad payload) never reach the
//!   caller: they become a single [`FALLBACK_REPLY`] assistant turn and are
//!   not retried.
//! - A reply that arrives after [`ChatSession::close`] is discarded.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ecobot_runtime::llm_driver::OpenAiCompatDriver;
//! use ecobot_runtime::session::ChatSession;
//!
//! # async fn demo() {
//! let backend = Arc::new(OpenAiCompatDriver::new("http://localhost:11434", "llama3"));
//! let session = ChatSession::new(backend);
//! let reply = session.submit("How do I waterproof the motors?").await;
//! # let _ = reply;
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ecobot_types::ChatTurn;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::llm_driver::{CompletionBackend, CompletionRequest, ECOBOT_ENGINEER_PREAMBLE};

/// Opening assistant turn of every session.
pub const GREETING: &str = "Hello! I'm your EcoBot Engineer. Ask me anything about the robot's design, how to build it in real life, or how to improve its code!";

/// Assistant turn recorded in place of a failed completion.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting to the engineering database. Please check your API key.";

/// Reasons a submission was not accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is already pending")]
    Busy,
    #[error("chat session is closed")]
    Closed,
}

/// Clears the in-flight flag when dropped, including when the submitting
/// future is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ChatSession {
    id: Uuid,
    backend: Arc<dyn CompletionBackend>,
    preamble: String,
    turns: Mutex<Vec<ChatTurn>>,
    in_flight: AtomicBool,
    closed: AtomicBool,
}

impl ChatSession {
    /// Open a session with the EcoBot Engineer persona and greeting.
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self::with_preamble(backend, ECOBOT_ENGINEER_PREAMBLE)
    }

    /// Open a session with a custom system preamble.
    pub fn with_preamble(backend: Arc<dyn CompletionBackend>, preamble: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, "chat session opened");
        Self {
            id,
            backend,
            preamble: preamble.into(),
            turns: Mutex::new(vec![ChatTurn::assistant(GREETING)]),
            in_flight: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ordered copy of the log.
    pub fn turns(&self) -> Vec<ChatTurn> {
        self.log().clone()
    }

    /// `true` while a completion request is outstanding.
    pub fn is_waiting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Close the chat surface.  Any pending reply will be dropped on arrival.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!(session = %self.id, turns = self.log().len(), "chat session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Append `text` as a user turn, ask the backend, and append its reply.
    ///
    /// Returns the assistant text that was appended, which is
    /// [`FALLBACK_REPLY`] when the backend failed.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyInput`] for blank text, [`SessionError::Busy`]
    /// while another reply is pending, [`SessionError::Closed`] once the
    /// session is closed (including when it closes mid-request).
    #[instrument(skip(self, text), fields(session = %self.id))]
    pub async fn submit(&self, text: &str) -> Result<String, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let _in_flight = InFlight::acquire(&self.in_flight).ok_or(SessionError::Busy)?;

        let prior_turns = {
            let mut log = self.log();
            let prior = log.clone();
            log.push(ChatTurn::user(text));
            prior
        };

        let request = CompletionRequest {
            system_preamble: &self.preamble,
            prior_turns: &prior_turns,
            new_user_text: text,
        };
        let reply = match self.backend.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "completion failed; recording fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };

        if self.is_closed() {
            debug!("reply arrived after close; discarded");
            return Err(SessionError::Closed);
        }
        self.log().push(ChatTurn::assistant(reply.clone()));
        debug!(turns = prior_turns.len() + 2, "reply recorded");
        Ok(reply)
    }

    fn log(&self) -> MutexGuard<'_, Vec<ChatTurn>> {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
