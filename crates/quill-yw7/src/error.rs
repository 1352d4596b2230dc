//! Error type for yw7 import and export.

use thiserror::Error;

/// Result type alias for quill-yw7 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the yw7 codec.
///
/// The messages are part of the observable surface: host applications show
/// them verbatim in their status line.
#[derive(Debug, Error)]
pub enum Error {
    /// A `.lock` sibling of the project file exists, so the legacy tool
    /// considers the project open.
    #[error("yWriter seems to be open. Please close first.")]
    LockedByExternalTool,

    /// Neither decoding strategy nor the fallback parse produced a usable
    /// document.
    #[error("Can not process file - {details}")]
    Parse { details: String },

    /// The existing project file could not be moved out of the way.
    #[error("Cannot overwrite file: \"{path}\".")]
    Overwrite { path: String },

    /// The final document text could not be written.
    #[error("Cannot write file: \"{path}\".")]
    Write { path: String },

    /// An internal model constraint was violated during emission; the
    /// message is surfaced verbatim.
    #[error("{0}")]
    Model(String),
}

impl Error {
    /// Wrap any displayable parse-stage failure.
    pub(crate) fn parse(details: impl std::fmt::Display) -> Self {
        Error::Parse {
            details: details.to_string(),
        }
    }
}
