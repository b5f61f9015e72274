use crate::error::Error;
use crate::model::FolderPath;
use crate::platform;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Tree to organize. Falls back to the platform Start Menu when unset.
    #[serde(default)]
    pub root_path: Option<PathBuf>,
    #[serde(default = "default_layout_path")]
    pub layout_path: PathBuf,
    #[serde(default = "default_quarantine_folder")]
    pub quarantine_folder: String,
    #[serde(default = "default_protected_folders")]
    pub protected_folders: Vec<String>,
    #[serde(default = "default_item_extensions")]
    pub item_extensions: Vec<String>,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_scan_workers")]
    pub scan_workers: usize,
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

fn default_layout_path() -> PathBuf {
    PathBuf::from("start_menu_layout.json")
}

fn default_quarantine_folder() -> String {
    "Unsorted".to_string()
}

fn default_protected_folders() -> Vec<String> {
    [
        "Startup",
        "Administrative Tools",
        "Accessibility",
        "Accessories",
        "Maintenance",
        "System Tools",
        "Windows Tools",
        "Windows PowerShell",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_item_extensions() -> Vec<String> {
    vec![".lnk".to_string()]
}

fn default_ignore_patterns() -> Vec<String> {
    vec!["desktop.ini".to_string()]
}

fn default_scan_workers() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_path: None,
            layout_path: default_layout_path(),
            quarantine_folder: default_quarantine_folder(),
            protected_folders: default_protected_folders(),
            item_extensions: default_item_extensions(),
            ignore_patterns: default_ignore_patterns(),
            scan_workers: default_scan_workers(),
            backup_dir: None,
        }
    }
}

impl AppConfig {
    /// Configured root, or the platform Start Menu.
    pub fn root(&self) -> Result<PathBuf, Error> {
        self.root_path
            .clone()
            .or_else(platform::default_start_menu_root)
            .ok_or(Error::RootNotConfigured)
    }

    pub fn quarantine(&self) -> Result<FolderPath, Error> {
        FolderPath::parse(&self.quarantine_folder)
            .map_err(|e| Error::Other(format!("invalid quarantine folder: {}", e)))
    }

    /// Protected folders that parse; invalid entries are dropped.
    pub fn protected(&self) -> Vec<FolderPath> {
        self.protected_folders
            .iter()
            .filter_map(|f| match FolderPath::parse(f) {
                Ok(folder) if !folder.is_root() => Some(folder),
                _ => {
                    tracing::warn!("Ignoring invalid protected folder '{}'", f);
                    None
                }
            })
            .collect()
    }
}

/// Read `MenuTidy.{toml,json,yaml}` from the working directory, if present,
/// then `MENU_TIDY_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("MenuTidy").required(false))
        .add_source(
            Environment::with_prefix("MENU_TIDY")
                .try_parsing(true)
                .list_separator(";")
                .with_list_parse_key("protected_folders")
                .with_list_parse_key("item_extensions")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.scan_workers, 5);
        assert_eq!(config.item_extensions, vec![".lnk"]);
        assert_eq!(config.quarantine().unwrap().to_string(), "Unsorted");
        assert!(config.protected().iter().any(|f| f.to_string() == "Startup"));
    }

    #[test]
    fn test_explicit_root_wins() {
        let config = AppConfig {
            root_path: Some(PathBuf::from("/tmp/menu")),
            ..AppConfig::default()
        };
        assert_eq!(config.root().unwrap(), PathBuf::from("/tmp/menu"));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("quarantine_folder", "Inbox")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.quarantine_folder, "Inbox");
        assert_eq!(config.layout_path, PathBuf::from("start_menu_layout.json"));
        assert!(config.backup_dir.is_none());
    }
}
