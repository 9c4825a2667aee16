//! # anima-runtime — Orchestration
//!
//! Puts an [`anima_core::Engine`] to work next to a language inference
//! service without ever blocking the interactive path:
//!
//! - [`Companion`] — request building, exchange ingestion, feedback,
//!   absence and proactive timing
//! - [`learning`] — bounded, drop-when-busy characteristic learning
//! - [`regulation`] — delayed self-regulation of strong negative emotions
//! - [`maintenance`] — the periodic decay/eviction tick
//! - [`telemetry`] — tracing subscriber setup

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod companion;
pub mod learning;
pub mod maintenance;
pub mod regulation;
pub mod telemetry;

pub use companion::{Companion, CompanionProfile, FeedbackKind, FeedbackOutcome};
pub use learning::{DispatchOutcome, LearningCategory, LearningDispatcher};
pub use maintenance::MaintenanceHandle;
pub use regulation::{RegulationOutcome, SelfRegulator};
pub use telemetry::init_tracing;
