use super::EntryFilter;
use crate::error::Error;
use crate::model::{ConfigModel, FolderPath, ItemMetadata};
use crate::progress::ProgressReporter;
use crate::shortcut::MetadataReader;
use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One item found in the live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedItem {
    pub name: String,
    pub folder: FolderPath,
    pub path: PathBuf,
}

/// One directory found in the live tree (never the root itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedFolder {
    pub folder: FolderPath,
    /// Non-item files and ignored subdirectories; such folders are never empty.
    pub foreign_entries: usize,
}

/// Items and folders of the live tree in traversal order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub items: Vec<ObservedItem>,
    pub folders: Vec<ObservedFolder>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a folder and any missing ancestors.
    pub fn add_folder(&mut self, folder: FolderPath) {
        if folder.is_root() || self.folder(&folder).is_some() {
            return;
        }
        if let Some(parent) = folder.parent() {
            self.add_folder(parent);
        }
        self.folders.push(ObservedFolder {
            folder,
            foreign_entries: 0,
        });
    }

    /// Record an item; its path is relative to an unspecified root.
    pub fn add_item(&mut self, folder: FolderPath, name: &str) {
        self.add_folder(folder.clone());
        let path = folder.to_fs_path(Path::new("")).join(name);
        self.items.push(ObservedItem {
            name: name.to_string(),
            folder,
            path,
        });
    }

    pub fn folder(&self, folder: &FolderPath) -> Option<&ObservedFolder> {
        self.folders.iter().find(|f| &f.folder == folder)
    }

    /// Folder/item structure of the tree, without metadata.
    pub fn to_model(&self) -> ConfigModel {
        let mut model = ConfigModel::new();
        model.insert_folder(FolderPath::root());
        for folder in &self.folders {
            model.insert_folder(folder.folder.clone());
        }
        for item in &self.items {
            model.insert_item(item.folder.clone(), item.name.clone(), ItemMetadata::default());
        }
        model
    }
}

/// Walk `root` and list its items and folders. Entries are visited in file
/// name order; unreadable entries are skipped with a warning.
pub fn scan_actual(
    root: &Path,
    filter: &EntryFilter,
    reporter: &dyn ProgressReporter,
) -> Result<Snapshot, Error> {
    if !root.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("root directory {} does not exist", root.display()),
        )));
    }

    reporter.on_scan_start();
    let start = Instant::now();

    let mut snapshot = Snapshot::new();
    let mut folder_index: HashMap<FolderPath, usize> = HashMap::new();

    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => continue,
        };

        let parent = FolderPath::from_relative(relative.parent().unwrap_or(Path::new("")));

        if filter.is_ignored(&relative) {
            if entry.file_type().is_dir() {
                entries.skip_current_dir();
                // Only ignored files are disposable; an ignored subtree keeps its parent.
                if let Some(&index) = folder_index.get(&parent) {
                    snapshot.folders[index].foreign_entries += 1;
                }
            }
            continue;
        }

        if entry.file_type().is_dir() {
            let folder = FolderPath::from_relative(&relative);
            folder_index.insert(folder.clone(), snapshot.folders.len());
            snapshot.folders.push(ObservedFolder {
                folder,
                foreign_entries: 0,
            });
            continue;
        }

        if entry.file_type().is_file() && filter.is_item(entry.path()) {
            snapshot.items.push(ObservedItem {
                name: entry.file_name().to_string_lossy().into_owned(),
                folder: parent,
                path: entry.path().to_path_buf(),
            });
            if snapshot.items.len() % 100 == 0 {
                reporter.on_scan_progress(snapshot.items.len());
            }
        } else if let Some(&index) = folder_index.get(&parent) {
            debug!("Foreign entry {}", entry.path().display());
            snapshot.folders[index].foreign_entries += 1;
        }
    }

    let duration = start.elapsed().as_secs_f64();
    reporter.on_scan_complete(snapshot.items.len(), duration);
    debug!(
        "Scanned {} in {:.2}s: {} items, {} folders",
        root.display(),
        duration,
        snapshot.items.len(),
        snapshot.folders.len()
    );

    Ok(snapshot)
}

/// Result of scanning a tree into a layout.
#[derive(Debug)]
pub struct LayoutScan {
    pub model: ConfigModel,
    /// Items recorded without metadata because it could not be read.
    pub warnings: Vec<Error>,
}

/// Walk `root` and build a layout including every folder, reading item
/// metadata on a bounded pool of `workers` threads. Metadata failures are
/// recorded as warnings and the item is kept with empty metadata.
pub fn scan_layout(
    root: &Path,
    filter: &EntryFilter,
    reader: &dyn MetadataReader,
    workers: usize,
    reporter: &dyn ProgressReporter,
) -> Result<LayoutScan, Error> {
    let snapshot = scan_actual(root, filter, reporter)?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| Error::Other(format!("cannot start metadata workers: {}", e)))?;

    reporter.on_metadata_start(snapshot.items.len());
    let start = Instant::now();

    let by_folder: DashMap<FolderPath, Vec<(String, ItemMetadata)>> = DashMap::new();
    let read_count = AtomicUsize::new(0);

    let warnings: Vec<Error> = pool.install(|| {
        snapshot
            .items
            .par_iter()
            .filter_map(|item| {
                let (metadata, failure) = match reader.read(&item.path) {
                    Ok(metadata) => (metadata, None),
                    Err(err) => {
                        warn!("{}; recording it without metadata", err);
                        (ItemMetadata::default(), Some(err))
                    }
                };
                by_folder
                    .entry(item.folder.clone())
                    .or_default()
                    .push((item.name.clone(), metadata));
                reporter.on_metadata_progress(read_count.fetch_add(1, Ordering::Relaxed) + 1);
                failure
            })
            .collect()
    });

    reporter.on_metadata_complete(warnings.len(), start.elapsed().as_secs_f64());

    let mut model = ConfigModel::new();
    model.insert_folder(FolderPath::root());
    for folder in &snapshot.folders {
        model.insert_folder(folder.folder.clone());
    }
    for (folder, items) in by_folder.into_iter() {
        for (name, metadata) in items {
            model.insert_item(folder.clone(), name, metadata);
        }
    }

    info!(
        "Scanned layout: {} folders, {} items, {} without metadata",
        model.folder_count(),
        model.item_count(),
        warnings.len()
    );

    Ok(LayoutScan { model, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_item_registers_ancestors() {
        let mut snapshot = Snapshot::new();
        snapshot.add_item(FolderPath::parse("A\\B").unwrap(), "x.lnk");
        let folders: Vec<String> = snapshot.folders.iter().map(|f| f.folder.to_string()).collect();
        assert_eq!(folders, vec!["A", "A\\B"]);
        assert_eq!(snapshot.items[0].path, PathBuf::from("A").join("B").join("x.lnk"));
    }

    #[test]
    fn test_to_model_keeps_empty_folders() {
        let mut snapshot = Snapshot::new();
        snapshot.add_folder(FolderPath::parse("Empty").unwrap());
        snapshot.add_item(FolderPath::root(), "a.lnk");
        let model = snapshot.to_model();
        assert!(model.contains_folder(&FolderPath::parse("Empty").unwrap()));
        assert_eq!(model.item_count(), 1);
    }
}
