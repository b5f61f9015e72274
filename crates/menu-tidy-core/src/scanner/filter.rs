use crate::config::AppConfig;
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::error;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Decides which directory entries are items and which are ignored.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    extensions: Vec<String>,
    ignore_patterns: Vec<Pattern>,
}

impl EntryFilter {
    pub fn new(extensions: &[String], ignore_globs: &[String]) -> Self {
        let ignore_patterns = ignore_globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();

        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            ignore_patterns,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.item_extensions, &config.ignore_patterns)
    }

    /// `relative` is the entry path relative to the tree root. Patterns are
    /// tried against the whole relative path and against the bare file name.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let file_name = relative.file_name().map(|n| n.to_string_lossy().into_owned());
        self.ignore_patterns.iter().any(|pattern| {
            pattern.matches_path_with(relative, MATCH_OPTIONS)
                || file_name
                    .as_deref()
                    .map(|name| pattern.matches_with(name, MATCH_OPTIONS))
                    .unwrap_or(false)
        })
    }

    pub fn is_item(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.extensions.iter().any(|ext| name.len() > ext.len() && name.ends_with(ext.as_str()))
    }
}
