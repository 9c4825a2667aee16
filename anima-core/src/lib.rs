//! # Anima Core Library
//!
//! Affective state engine for a conversational companion.
//!
//! A companion carries one composite [`AffectState`] made of:
//!
//! - **Core affect** — continuous valence/arousal (Russell circumplex, 1980)
//! - **Discrete emotions** — a fixed vocabulary of 51 named intensities
//! - **Personality** — OCEAN traits that drift under significant events
//! - **Attachment** — one relationship score with saturating updates
//! - **Self-efficacy** — per-domain competence beliefs
//! - **Neuromodulators** — motivation, mood balance, stress, social warmth,
//!   which feed back into the effective decay and sensitivity parameters
//! - **Characteristics** — relevance-weighted facts about the user and self
//!
//! The [`Engine`] guards the composite state behind a single lock and writes
//! every change through a [`RecordStore`](persistence::RecordStore).
//!
//! ## Failure contract
//!
//! Numeric input is clamped, unknown identifiers are logged and ignored,
//! and storage failures are logged. No operation on the engine returns an
//! error to the interactive caller.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod attachment;
pub mod characteristic;
pub mod config;
pub mod describe;
pub mod efficacy;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod events;
pub mod neuro;
pub mod persistence;
pub mod personality;
pub mod types;

pub use config::AnimaConfig;
pub use engine::{AffectState, Engine, StateSnapshot, TickReport};
pub use error::AnimaError;
pub use events::SignificantEvent;
pub use types::*;
