//! Error types for the orchestration engine.
//!
//! - [`RegistryError`] — Errors raised by the adviser and step registries.
//! - [`ResolveError`] — Errors raised while resolving sweeping-output references.
//! - [`EngineError`] — Top-level errors for plan advance, interrupts, and resumption.

pub mod engine_error;
pub mod registry_error;
pub mod resolve_error;

pub use engine_error::EngineError;
pub use registry_error::RegistryError;
pub use resolve_error::ResolveError;

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;
