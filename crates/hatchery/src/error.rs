//! Error taxonomy for registry, factory, and store operations.

/// Result alias for hatchery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the registry, the agent factory, and the descriptor store.
///
/// Everything except [`Error::Persistence`] can be attributed to a single
/// client request and is reported in-band by the [`crate::Handler`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or missing fields in a request or a generated draft.
    #[error("{0}")]
    Validation(String),

    /// The name is reserved or already registered.
    #[error("tool name '{0}' is already registered")]
    NameCollision(String),

    /// The generation collaborator failed, timed out, or returned an
    /// unusable draft.
    #[error("agent generation failed: {0}")]
    Generation(String),

    /// No tool with this name exists.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The descriptor file could not be read or written.
    #[error("descriptor store: {0}")]
    Persistence(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a generation error.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}
