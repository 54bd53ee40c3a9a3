/// Crate-wide result alias.
pub type TexflowResult<T> = Result<T, TexflowError>;

/// Errors surfaced by graph construction, resource management and command recording.
///
/// Node processing never returns these to the caller of a graph run: the scheduler contains them
/// at the node and turns them into a failed process result plus a node message.
#[derive(thiserror::Error, Debug)]
pub enum TexflowError {
    /// Invalid user input (settings, graph description, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// Structural graph problem (unknown node or port, cycle, incompatible connection).
    #[error("graph error: {0}")]
    Graph(String),

    /// A named program, kernel or texture could not be found.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// A texture format cannot be honored and no fallback applies.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A dispatch would read and write the same texture.
    #[error("resource hazard: {0}")]
    Hazard(String),

    /// Kernel execution failed (missing parameter, bad binding, thread pool failure).
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// Graph description (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TexflowError {
    /// Build a [`TexflowError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TexflowError::Graph`].
    pub fn graph(msg: impl Into<String>) -> Self {
        Self::Graph(msg.into())
    }

    /// Build a [`TexflowError::ResourceNotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::ResourceNotFound(msg.into())
    }

    /// Build a [`TexflowError::UnsupportedFormat`].
    pub fn unsupported_format(msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Build a [`TexflowError::Hazard`].
    pub fn hazard(msg: impl Into<String>) -> Self {
        Self::Hazard(msg.into())
    }

    /// Build a [`TexflowError::Dispatch`].
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Build a [`TexflowError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for TexflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
