use thiserror::Error;

/// Typed failures of the decision evaluators.
///
/// Configuration problems are supposed to be caught at the configuration
/// boundary (promo-config). If a bad value still reaches an evaluator, the
/// error is returned to the caller so it can fail closed — no promotion —
/// instead of unwinding through the host's completion handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The resolved configuration is unusable (e.g. zero threshold).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The history window is structurally malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
