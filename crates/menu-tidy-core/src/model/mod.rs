pub mod diff;
pub mod folder;

pub use diff::{diff, LayoutDiff};
pub use folder::{FolderPath, ROOT_NAME};

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// What is needed to recreate a shortcut. Fields are declared alphabetically so
/// serialized layouts list metadata keys in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ItemMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
}

impl ItemMetadata {
    pub fn is_empty(&self) -> bool {
        self == &ItemMetadata::default()
    }

    /// A shortcut can only be recreated when it knows what it points at.
    pub fn can_recreate(&self) -> bool {
        self.target_path
            .as_deref()
            .map(|t| !t.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Desired layout: folder to items, each item with its recreation metadata.
///
/// Folders are ordered case-insensitively and items ordinally, so serializing
/// an unchanged tree always produces identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigModel {
    folders: BTreeMap<FolderPath, BTreeMap<String, ItemMetadata>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFolder {
    Names(Vec<String>),
    Items(BTreeMap<String, Option<ItemMetadata>>),
}

impl ConfigModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a folder; returns its item map. Existing folders keep their
    /// original casing.
    pub fn insert_folder(&mut self, folder: FolderPath) -> &mut BTreeMap<String, ItemMetadata> {
        self.folders.entry(folder).or_default()
    }

    pub fn insert_item(&mut self, folder: FolderPath, name: impl Into<String>, metadata: ItemMetadata) {
        self.insert_folder(folder).insert(name.into(), metadata);
    }

    pub fn contains_folder(&self, folder: &FolderPath) -> bool {
        self.folders.contains_key(folder)
    }

    pub fn folders(&self) -> impl Iterator<Item = (&FolderPath, &BTreeMap<String, ItemMetadata>)> {
        self.folders.iter()
    }

    pub fn items(&self) -> impl Iterator<Item = (&FolderPath, &String, &ItemMetadata)> {
        self.folders
            .iter()
            .flat_map(|(folder, items)| items.iter().map(move |(name, meta)| (folder, name, meta)))
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn item_count(&self) -> usize {
        self.folders.values().map(|items| items.len()).sum()
    }

    pub fn from_json_str(text: &str, source_name: &str) -> Result<Self, Error> {
        let raw: BTreeMap<String, RawFolder> = serde_json::from_str(text)
            .map_err(|e| Error::parse(source_name, e.to_string()))?;

        let mut model = ConfigModel::new();
        let mut seen: HashMap<FolderPath, String> = HashMap::new();

        for (key, value) in raw {
            let folder = FolderPath::parse(&key).map_err(|e| Error::parse(source_name, e))?;
            if let Some(previous) = seen.insert(folder.clone(), key.clone()) {
                return Err(Error::parse(
                    source_name,
                    format!("folders '{}' and '{}' differ only by case", previous, key),
                ));
            }

            let items: Vec<(String, ItemMetadata)> = match value {
                RawFolder::Names(names) => names.into_iter().map(|n| (n, ItemMetadata::default())).collect(),
                RawFolder::Items(map) => map
                    .into_iter()
                    .map(|(n, meta)| (n, meta.unwrap_or_default()))
                    .collect(),
            };

            let entry = model.insert_folder(folder);
            for (name, metadata) in items {
                validate_item_name(&name).map_err(|e| Error::parse(source_name, format!("{} in folder '{}'", e, key)))?;
                entry.insert(name, metadata);
            }
        }

        Ok(model)
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        let out: Vec<(String, &BTreeMap<String, ItemMetadata>)> = self
            .folders
            .iter()
            .map(|(folder, items)| (folder.to_string(), items))
            .collect();

        // serde_json::Map would re-sort keys ordinally; write the ordered pairs ourselves.
        let mut text = String::from("{\n");
        for (i, (folder, items)) in out.iter().enumerate() {
            let key = serde_json::to_string(folder).map_err(|e| Error::Other(e.to_string()))?;
            let body = serde_json::to_string_pretty(items).map_err(|e| Error::Other(e.to_string()))?;
            text.push_str("  ");
            text.push_str(&key);
            text.push_str(": ");
            text.push_str(&indent_continuation(&body, "  "));
            if i + 1 < out.len() {
                text.push(',');
            }
            text.push('\n');
        }
        text.push_str("}\n");
        Ok(text)
    }

    /// Load a saved layout. A missing file is `ConfigNotFound`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(Error::Io(e)),
        };
        let model = Self::from_json_str(&text, &path.display().to_string())?;
        debug!(
            "Loaded layout {}: {} folders, {} items",
            path.display(),
            model.folder_count(),
            model.item_count()
        );
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn validate_item_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("empty item name".to_string());
    }
    if name.contains(['\\', '/']) {
        return Err(format!("item name '{}' contains a path separator", name));
    }
    Ok(())
}

fn indent_continuation(body: &str, indent: &str) -> String {
    let mut lines = body.lines();
    let mut out = String::new();
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(indent);
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(text: &str) -> FolderPath {
        FolderPath::parse(text).unwrap()
    }

    #[test]
    fn test_parse_list_shape() {
        let json = r#"{"Programs": ["Chrome.lnk"], "Programs\\Dev": ["VSCode.lnk"]}"#;
        let model = ConfigModel::from_json_str(json, "test").unwrap();
        assert_eq!(model.folder_count(), 2);
        assert_eq!(model.item_count(), 2);
        assert!(model.contains_folder(&folder("programs\\dev")));
    }

    #[test]
    fn test_parse_object_shape_with_null_metadata() {
        let json = r#"{
            "Root": { "Notepad.lnk": null },
            "Tools": { "Git Bash.lnk": { "TargetPath": "C:\\Git\\git-bash.exe", "Arguments": "--cd-to-home" } }
        }"#;
        let model = ConfigModel::from_json_str(json, "test").unwrap();
        let items: Vec<_> = model.items().collect();
        assert_eq!(items.len(), 2);
        let (_, _, meta) = items
            .iter()
            .find(|(_, name, _)| name.as_str() == "Git Bash.lnk")
            .unwrap();
        assert_eq!(meta.arguments.as_deref(), Some("--cd-to-home"));
        assert!(meta.can_recreate());
    }

    #[test]
    fn test_parse_rejects_case_colliding_folders() {
        let json = r#"{"Games": [], "games": []}"#;
        let err = ConfigModel::from_json_str(json, "test").unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(matches!(
            ConfigModel::from_json_str(r#"{"Games": 42}"#, "test"),
            Err(Error::ConfigParse { .. })
        ));
        assert!(matches!(
            ConfigModel::from_json_str("not json", "test"),
            Err(Error::ConfigParse { .. })
        ));
        assert!(matches!(
            ConfigModel::from_json_str(r#"{"Games": ["a\\b.lnk"]}"#, "test"),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_serialization_is_sorted_and_stable() {
        let mut model = ConfigModel::new();
        model.insert_item(folder("zeta"), "b.lnk", ItemMetadata::default());
        model.insert_item(
            folder("Alpha"),
            "z.lnk",
            ItemMetadata {
                working_directory: Some("C:\\".into()),
                target_path: Some("C:\\z.exe".into()),
                ..Default::default()
            },
        );
        model.insert_item(folder("Alpha"), "a.lnk", ItemMetadata::default());

        let text = model.to_json_string().unwrap();
        let alpha = text.find("\"Alpha\"").unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
        assert!(text.find("a.lnk").unwrap() < text.find("z.lnk").unwrap());
        assert!(text.find("TargetPath").unwrap() < text.find("WorkingDirectory").unwrap());

        let reparsed = ConfigModel::from_json_str(&text, "test").unwrap();
        assert_eq!(reparsed, model);
        assert_eq!(reparsed.to_json_string().unwrap(), text);
    }

    #[test]
    fn test_load_missing_file_is_config_not_found() {
        let err = ConfigModel::load(Path::new("definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }
}
