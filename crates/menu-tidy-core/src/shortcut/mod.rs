pub mod shell_link;

pub use shell_link::ShellLinkFormat;

use crate::error::Error;
use crate::model::ItemMetadata;
use std::path::Path;

/// Reads recreation metadata from a shortcut file.
pub trait MetadataReader: Send + Sync {
    /// Fails with `Error::MetadataRead` when the file cannot be interpreted.
    fn read(&self, path: &Path) -> Result<ItemMetadata, Error>;
}

/// Creates a shortcut file from recreation metadata.
pub trait ShortcutWriter: Send + Sync {
    fn write(&self, path: &Path, metadata: &ItemMetadata) -> Result<(), Error>;
}
