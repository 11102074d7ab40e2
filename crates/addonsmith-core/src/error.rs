//! Error types for addonsmith-core

use thiserror::Error;

/// Result type alias using addonsmith-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for addonsmith
///
/// Every failure aborts the current installation call; there are no
/// retries anywhere in the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Input reference cannot be parsed as a URL or path
    #[error("Invalid addon reference: {message}")]
    Reference { message: String },

    /// Resolved filename/content-type is neither a script nor an archive
    #[error("Not a .py or .zip file: {name}")]
    UnsupportedFileKind { name: String },

    /// Network probe or download failed
    #[error("Download failed: {message}")]
    Transport { message: String },

    /// Archive contains zero script files
    #[error("No .py files in the archive")]
    NoScriptsFound,

    /// Multiple scripts present, none is a recognized entry-point file
    #[error("Archive contains {count} script(s) but no __init__.py entry point")]
    AmbiguousLayout { count: usize },

    /// Destination path exists and overwrite was not requested
    #[error("Already installed: {path} (pass --overwrite to replace)")]
    AlreadyInstalled { path: String },

    /// Local source resides inside an addon search directory
    #[error("Source '{path}' is inside an addon directory; refusing to install onto itself")]
    InvalidSource { path: String },

    /// Entry script lacks the metadata literal
    #[error("No bl_info block found in the entry script")]
    MetadataNotFound,

    /// Entry script misdeclares the metadata literal
    #[error("Malformed bl_info block: {message}")]
    MalformedMetadata { message: String },

    /// Archive could not be read or extracted
    #[error("Archive error: {message}")]
    Archive { message: String },

    /// Unknown addon directory choice
    #[error("Unknown addon directory '{name}'. Valid choices: user, system")]
    UnknownAddonDir { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a reference error
    pub fn reference(message: impl Into<String>) -> Self {
        Self::Reference {
            message: message.into(),
        }
    }

    /// Create an unsupported file kind error
    pub fn unsupported_file(name: impl Into<String>) -> Self {
        Self::UnsupportedFileKind { name: name.into() }
    }

    /// Create a transport error from any displayable source
    pub fn transport(source: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: source.to_string(),
        }
    }

    /// Create an ambiguous layout error
    pub fn ambiguous_layout(count: usize) -> Self {
        Self::AmbiguousLayout { count }
    }

    /// Create an already installed error
    pub fn already_installed(path: impl Into<String>) -> Self {
        Self::AlreadyInstalled { path: path.into() }
    }

    /// Create an invalid source error
    pub fn invalid_source(path: impl Into<String>) -> Self {
        Self::InvalidSource { path: path.into() }
    }

    /// Create a malformed metadata error
    pub fn malformed_metadata(message: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            message: message.into(),
        }
    }

    /// Create an archive error from any displayable source
    pub fn archive(source: impl std::fmt::Display) -> Self {
        Self::Archive {
            message: source.to_string(),
        }
    }

    /// Create an unknown addon directory error
    pub fn unknown_addon_dir(name: impl Into<String>) -> Self {
        Self::UnknownAddonDir { name: name.into() }
    }
}
