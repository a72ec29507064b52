use thiserror::Error;

/// Errors raised while resolving sweeping-output references.
///
/// Resolution failures abort only the expression evaluation that triggered
/// them, never the node the expression belongs to.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Output service error: {0}")]
    Service(String),
    #[error("Malformed output value for '{key}': {message}")]
    Malformed { key: String, message: String },
}
