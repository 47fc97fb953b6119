//! Error kinds that decide whether a batch aborts or skips a single document.
//!
//! Everything else in the crate propagates `anyhow::Result`; these variants
//! are raised where the distinction matters and can be recovered with
//! `anyhow::Error::downcast_ref`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Rename dictionary not found at {0:?}")]
    DictionaryNotFound(PathBuf),

    #[error("Input location not found at {0:?}")]
    InputNotFound(PathBuf),

    #[error("Schema document not found at {0:?}")]
    DocumentNotFound(PathBuf),

    #[error("Schema document {path:?} could not be parsed: {message}")]
    DocumentParse { path: PathBuf, message: String },

    #[error("Schema document {0:?} does not declare a table_name")]
    MissingTableName(PathBuf),
}

impl RenameError {
    /// Fatal errors abort the whole invocation; the rest only skip one document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenameError::DictionaryNotFound(_) | RenameError::InputNotFound(_)
        )
    }
}

/// Returns true when `err` carries a fatal [`RenameError`] anywhere in its chain.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<RenameError>())
        .any(RenameError::is_fatal)
}
