/// Convenience result type used across pixreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by rendering-core APIs.
///
/// Degraded-but-non-fatal conditions (missing sprites, backgrounds, music) are never errors; they
/// are appended to the run's [`crate::WarningLog`] instead.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Malformed or incomplete script input. Raised before any rendering starts.
    #[error("script validation error at '{field}': {message}")]
    ScriptValidation {
        /// Dotted/indexed path of the offending field, e.g. `scenes[1].background`.
        field: String,
        /// Human readable description.
        message: String,
    },

    /// A position slot could not be resolved for a location.
    #[error("layout error: location '{location}' slot '{slot}': {message}")]
    Layout {
        /// Location identifier.
        location: String,
        /// Requested slot name.
        slot: String,
        /// Human readable description.
        message: String,
    },

    /// The encoder subprocess failed (non-zero exit, broken pipe, spawn failure).
    #[error("encoder error: {0}")]
    Encoder(String),

    /// The per-render wall-clock budget was exhausted.
    #[error("render timed out after {seconds:.1}s")]
    Timeout {
        /// Budget that was exceeded, in seconds.
        seconds: f64,
    },

    /// The render was cancelled by the caller.
    #[error("render cancelled")]
    Cancelled,

    /// An explicitly requested asset is unreadable and no fallback applies.
    #[error("asset error: {0}")]
    Asset(String),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Errors when serializing or deserializing documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant of [`ReelError`] for callers that branch on failure kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`ReelError::ScriptValidation`].
    ScriptValidation,
    /// See [`ReelError::Layout`].
    Layout,
    /// See [`ReelError::Encoder`].
    Encoder,
    /// See [`ReelError::Timeout`].
    Timeout,
    /// See [`ReelError::Cancelled`].
    Cancelled,
    /// See [`ReelError::Asset`].
    Asset,
    /// See [`ReelError::Config`].
    Config,
    /// See [`ReelError::Serde`].
    Serde,
    /// See [`ReelError::Other`].
    Other,
}

impl ReelError {
    /// Build a [`ReelError::ScriptValidation`] value.
    pub fn script(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ScriptValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a [`ReelError::Layout`] value.
    pub fn layout(
        location: impl Into<String>,
        slot: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Layout {
            location: location.into(),
            slot: slot.into(),
            message: message.into(),
        }
    }

    /// Build a [`ReelError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Build a [`ReelError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`ReelError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return the kind discriminant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ScriptValidation { .. } => ErrorKind::ScriptValidation,
            Self::Layout { .. } => ErrorKind::Layout,
            Self::Encoder(_) => ErrorKind::Encoder,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Asset(_) => ErrorKind::Asset,
            Self::Config(_) => ErrorKind::Config,
            Self::Serde(_) => ErrorKind::Serde,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Whether the orchestrator may retry the failed operation.
    ///
    /// Only transient encoder failures qualify. Timeouts and cancellations are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Encoder(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
