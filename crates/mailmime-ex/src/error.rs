//! Error types for MIME operations.

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The charset name does not resolve to a supported encoding.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Converting between two charsets failed.
    #[error("Transcoding error: {0}")]
    Transcoding(#[from] TranscodeError),

    /// Unknown message parameter name.
    #[error("Unknown parameter: {0}")]
    UnknownParam(String),

    /// Unknown message option name.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Invalid transfer encoding token.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Failure while converting bytes from one charset to another.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscodeError {
    /// The target charset has no code for this character.
    #[error("{ch:?} cannot be represented in {charset}")]
    Unmappable {
        /// Target charset name.
        charset: String,
        /// Offending character.
        ch: char,
    },

    /// The input is not valid in the source charset.
    #[error("Input is not valid {charset}")]
    Malformed {
        /// Source charset name.
        charset: String,
    },
}

impl Error {
    /// Returns `true` when the error came from a character the target
    /// charset cannot represent.
    #[must_use]
    pub const fn is_unmappable(&self) -> bool {
        matches!(self, Self::Transcoding(TranscodeError::Unmappable { .. }))
    }
}
