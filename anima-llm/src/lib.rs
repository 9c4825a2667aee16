//! # anima-llm — Language Inference Layer
//!
//! Everything the affect engine needs from a language model goes through
//! the [`InferenceService`] trait:
//!
//! - `analyze_emotions` — sparse emotion readings for a piece of text
//! - `appraise_event` — novelty, pleasantness, goal conduciveness, coping
//!   potential and urgency for an event description
//! - `generate` — persona replies, coping thoughts and analysis passes
//!
//! [`LlmService`] implements the trait over an [`LlmClient`] talking to
//! Ollama or any OpenAI-compatible endpoint. Model output is never
//! trusted: JSON is extracted leniently ([`parse`]) and every number is
//! clamped before it reaches the engine.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod service;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use service::{InferenceService, LlmService};
pub use types::{ChatTurn, Generation, GenerationConfig, GenerationRequest, Role};
