//! # Simulacra
//!
//! Schema-validated generation core for generative-agent simulations.
//!
//! Application code in a running simulation constantly asks an external
//! text-generation service for structured data (wake-up hours, task
//! decompositions, conversations), and that service is unreliable: it
//! produces malformed output, violates schemas, fails transiently, and gets
//! arithmetic wrong. This crate turns those requests into typed, validated,
//! retried, fail-safe-bounded operations so a single misbehaving generation
//! never crashes or corrupts a simulation step.
//!
//! The two load-bearing pieces are the [`orchestrator`] (the retry loop over
//! the provider adapter and schema validator) and the [`schedule`]
//! normalizer (a pure algorithm reconciling decomposed schedules against an
//! exact target duration).

pub mod config;
pub mod error;
pub mod legacy;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod schedule;
pub mod schema;

pub use config::ProviderConfig;
pub use error::{AdapterError, ValidationError};
pub use orchestrator::{Predicate, SafeGenerator, Transform, DEFAULT_RETRY_BUDGET};
pub use provider::{
    GenerationClient, GenerationOptions, GenerationProvider, ReasoningEffort, Verbosity,
};
pub use schedule::{normalize, ScheduleOptions, Subtask};
pub use schema::{validate, CognitiveFunction, TypedResponse};

/// Library version.
pub const VERSION: &str = "0.1.0";

/// Initialize env-filtered logging for binaries and tests.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
