use super::{ConfigModel, FolderPath};
use std::collections::{BTreeMap, BTreeSet};

/// Differences between two layouts, keyed by item name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LayoutDiff {
    pub added_items: Vec<(FolderPath, String)>,
    pub removed_items: Vec<(FolderPath, String)>,
    /// Item name, previous folder, current folder.
    pub moved_items: Vec<(String, FolderPath, FolderPath)>,
    pub added_folders: Vec<FolderPath>,
    pub removed_folders: Vec<FolderPath>,
}

impl LayoutDiff {
    pub fn is_empty(&self) -> bool {
        self.added_items.is_empty()
            && self.removed_items.is_empty()
            && self.moved_items.is_empty()
            && self.added_folders.is_empty()
            && self.removed_folders.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added_items.len()
            + self.removed_items.len()
            + self.moved_items.len()
            + self.added_folders.len()
            + self.removed_folders.len()
    }
}

fn locations(model: &ConfigModel) -> BTreeMap<&str, BTreeSet<&FolderPath>> {
    let mut map: BTreeMap<&str, BTreeSet<&FolderPath>> = BTreeMap::new();
    for (folder, name, _) in model.items() {
        map.entry(name.as_str()).or_default().insert(folder);
    }
    map
}

/// Compare two layouts. An item present under the same name in both but in
/// different folders is reported as moved rather than removed and added.
pub fn diff(previous: &ConfigModel, current: &ConfigModel) -> LayoutDiff {
    let mut result = LayoutDiff::default();

    let before = locations(previous);
    let after = locations(current);

    for (name, old_folders) in &before {
        match after.get(name) {
            None => {
                for folder in old_folders {
                    result.removed_items.push(((*folder).clone(), name.to_string()));
                }
            }
            Some(new_folders) => {
                let gone: Vec<&&FolderPath> = old_folders.difference(new_folders).collect();
                let arrived: Vec<&&FolderPath> = new_folders.difference(old_folders).collect();
                let paired = gone.len().min(arrived.len());
                for i in 0..paired {
                    result
                        .moved_items
                        .push((name.to_string(), (*gone[i]).clone(), (*arrived[i]).clone()));
                }
                for folder in &gone[paired..] {
                    result.removed_items.push(((**folder).clone(), name.to_string()));
                }
                for folder in &arrived[paired..] {
                    result.added_items.push(((**folder).clone(), name.to_string()));
                }
            }
        }
    }

    for (name, new_folders) in &after {
        if !before.contains_key(name) {
            for folder in new_folders {
                result.added_items.push(((*folder).clone(), name.to_string()));
            }
        }
    }

    for (folder, _) in current.folders() {
        if !previous.contains_folder(folder) {
            result.added_folders.push(folder.clone());
        }
    }
    for (folder, _) in previous.folders() {
        if !current.contains_folder(folder) {
            result.removed_folders.push(folder.clone());
        }
    }

    result.added_items.sort();
    result.removed_items.sort();
    result
}
