//! `ecobot-runtime` – everything around the kinematic core that waits on
//! time or the network.
//!
//! # Modules
//!
//! - [`llm_driver`] – [`CompletionBackend`][llm_driver::CompletionBackend]
//!   and its two implementations: [`GeminiDriver`][llm_driver::GeminiDriver]
//!   for the hosted `generateContent` API and
//!   [`OpenAiCompatDriver`][llm_driver::OpenAiCompatDriver] for local
//!   OpenAI-compatible servers such as [Ollama](https://ollama.com).
//! - [`session`] – [`ChatSession`][session::ChatSession]: the append-only
//!   chat log with single-flight submission and a fixed fallback reply when
//!   the backend fails.
//! - [`frame_driver`] – [`FrameDriver`][frame_driver::FrameDriver]: a
//!   headless render loop that ticks a
//!   [`Simulation`][ecobot_sim::Simulation] with wall-clock deltas and
//!   publishes telemetry snapshots.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with optional OTLP export.

pub mod frame_driver;
pub mod llm_driver;
pub mod session;
pub mod telemetry;

pub use frame_driver::{DriverCommand, FrameDriver, FrameDriverHandle};
pub use llm_driver::{
    CompletionBackend, CompletionRequest, ECOBOT_ENGINEER_PREAMBLE, GeminiDriver, LlmError,
    OpenAiCompatDriver,
};
pub use session::{ChatSession, FALLBACK_REPLY, GREETING, SessionError};
pub use telemetry::{TracerProviderGuard, init_tracing};
