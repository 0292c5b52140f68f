//! Error types shared across Tessera crates.

/// Top-level error type for Tessera operations.
#[derive(Debug, thiserror::Error)]
pub enum TesseraError {
    #[error("Allocation error: {message}")]
    Allocation { message: String },

    #[error("Pixel format error: {message}")]
    Format { message: String },

    #[error("Sink error: {message}")]
    Sink { message: String },

    #[error("Control surface error: {message}")]
    Control { message: String },

    #[error("Invalid canvas dimensions {width}x{height}: both sides must be zero or both positive")]
    InvalidDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using TesseraError.
pub type TesseraResult<T> = Result<T, TesseraError>;

impl TesseraError {
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation {
            message: msg.into(),
        }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format {
            message: msg.into(),
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink {
            message: msg.into(),
        }
    }

    pub fn control(msg: impl Into<String>) -> Self {
        Self::Control {
            message: msg.into(),
        }
    }

    /// Whether this error came from a failed frame allocation.
    pub fn is_allocation(&self) -> bool {
        matches!(self, Self::Allocation { .. })
    }
}
