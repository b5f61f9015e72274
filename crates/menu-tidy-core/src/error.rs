use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Layout file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid layout in {source_name}: {message}")]
    ConfigParse {
        source_name: String,
        message: String,
    },

    #[error("Cannot read shortcut {}: {reason}", .path.display())]
    MetadataRead { path: PathBuf, reason: String },

    #[error("{action} failed: {reason}")]
    FilesystemAction { action: String, reason: String },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("No root path configured and no platform default is available")]
    RootNotConfigured,

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigParse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn metadata(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MetadataRead {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
