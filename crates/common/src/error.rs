//! Error types shared across framemix crates.

/// Top-level error type for framemix operations.
#[derive(Debug, thiserror::Error)]
pub enum FramemixError {
    /// A platform primitive required by the compositor is missing.
    #[error("Missing capability: {message}")]
    Capability { message: String },

    /// The compositor was destroyed and can no longer accept sources.
    #[error("Compositor has been destroyed")]
    Destroyed,

    /// A single source failed to draw during a render tick.
    #[error("Draw error for source {source_id}: {message}")]
    Draw { source_id: String, message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Audio error: {message}")]
    Audio { message: String },

    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FramemixError.
pub type FramemixResult<T> = Result<T, FramemixError>;

impl FramemixError {
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability {
            message: msg.into(),
        }
    }

    pub fn draw(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Draw {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio {
            message: msg.into(),
        }
    }

    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the error only affects a single frame of a single source.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::Render { .. })
    }
}
