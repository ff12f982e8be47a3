//! Error types for the ES3 codec and save documents

use thiserror::Error;

/// Failures of the ES3 codec
///
/// Each variant carries the message of the underlying cause. Callers only
/// need to know which direction failed; the message is for humans.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Es3Error {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

impl Es3Error {
    /// Folds any error raised while decoding into `Decryption`
    pub(crate) fn into_decryption(self) -> Self {
        match self {
            Es3Error::Decryption(msg) => Es3Error::Decryption(msg),
            Es3Error::KeyDerivation(msg) | Es3Error::Encryption(msg) => Es3Error::Decryption(msg),
        }
    }

    /// Folds any error raised while encoding into `Encryption`
    pub(crate) fn into_encryption(self) -> Self {
        match self {
            Es3Error::Encryption(msg) => Es3Error::Encryption(msg),
            Es3Error::KeyDerivation(msg) | Es3Error::Decryption(msg) => Es3Error::Encryption(msg),
        }
    }
}

/// Failures while loading or editing a save document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    Codec(#[from] Es3Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file type: {0} (expected .es3, .es3.bac or .json)")]
    UnsupportedExtension(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a player save: missing {0}")]
    NotPlayerSave(&'static str),

    #[error("Not a container save: missing {0}")]
    NotContainerSave(&'static str),

    #[error("Grid {grid} has no slot {slot} ({len} slots)")]
    SlotOutOfRange { grid: usize, slot: usize, len: usize },

    #[error("No inventory grid {0}")]
    GridNotFound(usize),

    #[error("Invalid value for {path}: expected {expected}, got {input:?}")]
    InvalidValue {
        path: String,
        expected: &'static str,
        input: String,
    },
}
