use thiserror::Error;

/// Errors surfaced by learning, ranking and merging operations.
///
/// Convergence failures are deliberately absent: a fit that hits its
/// iteration cap still yields usable coefficients and is reported through
/// `tracing`, not through this enum. An empty candidate set is likewise not
/// an error; ranking simply returns an empty list.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid hyperparameter or input configuration, rejected before any
    /// work starts.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// Two structures that must agree on a dimension do not.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
}

impl Error {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(context: &'static str, expected: usize, found: usize) -> Self {
        Error::ShapeMismatch {
            context,
            expected,
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
