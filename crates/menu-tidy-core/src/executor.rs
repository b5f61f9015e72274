use crate::error::Error;
use crate::model::FolderPath;
use crate::progress::ProgressReporter;
use crate::reconcile::{Action, Plan};
use crate::scanner::EntryFilter;
use crate::shortcut::ShortcutWriter;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ActionResult {
    pub action: Action,
    pub outcome: Result<(), String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<ActionResult>,
}

/// Applies a plan to the tree, one action at a time. A failed action is
/// logged and counted; it never stops the rest of the batch.
pub struct Executor {
    root: PathBuf,
    writer: Arc<dyn ShortcutWriter>,
    filter: EntryFilter,
    created_folders: HashSet<PathBuf>,
}

impl Executor {
    pub fn new(root: impl Into<PathBuf>, writer: Arc<dyn ShortcutWriter>, filter: EntryFilter) -> Self {
        Self {
            root: root.into(),
            writer,
            filter,
            created_folders: HashSet::new(),
        }
    }

    /// Phases run in plan order: moves, recreations, quarantines, duplicate
    /// deletes, then empty folder deletes.
    pub fn execute(&mut self, plan: &Plan, reporter: &dyn ProgressReporter) -> ExecutionReport {
        let total = plan.len();
        let start = Instant::now();
        reporter.on_execute_start(total);

        let mut report = ExecutionReport::default();
        for (index, action) in plan.actions().enumerate() {
            let outcome = match self.apply(action) {
                Ok(()) => {
                    info!("Done: {}", action);
                    report.success_count += 1;
                    Ok(())
                }
                Err(err) => {
                    error!("Failed to {}: {}", action, err);
                    report.error_count += 1;
                    Err(err.to_string())
                }
            };
            report.results.push(ActionResult {
                action: action.clone(),
                outcome,
            });
            reporter.on_action_complete(index + 1, total);
        }

        let duration = start.elapsed().as_secs_f64();
        reporter.on_execute_complete(report.success_count, report.error_count, duration);
        info!(
            "Execution finished: {} succeeded, {} failed",
            report.success_count, report.error_count
        );
        report
    }

    fn apply(&mut self, action: &Action) -> Result<(), Error> {
        let fail = |reason: String| Error::FilesystemAction {
            action: action.to_string(),
            reason,
        };

        match action {
            Action::Move { item, from, to } => {
                let source = from.to_fs_path(&self.root).join(item);
                self.relocate(&source, to, item).map_err(fail)
            }
            Action::Quarantine {
                item,
                from,
                to,
                rename_to,
            } => {
                let source = from.to_fs_path(&self.root).join(item);
                let name = rename_to.as_deref().unwrap_or(item);
                self.relocate(&source, to, name).map_err(fail)
            }
            Action::Recreate {
                item,
                folder,
                metadata,
            } => {
                let path = folder.to_fs_path(&self.root).join(item);
                if path.exists() {
                    return Err(fail(format!("{} already exists", path.display())));
                }
                self.ensure_folder(folder)?;
                self.writer.write(&path, metadata)
            }
            Action::DeleteDuplicate { item, folder } => {
                let path = folder.to_fs_path(&self.root).join(item);
                fs::remove_file(&path).map_err(|e| fail(format!("{}: {}", path.display(), e)))
            }
            Action::DeleteEmptyFolder { folder } => {
                let path = folder.to_fs_path(&self.root);
                self.remove_empty_folder(&path).map_err(fail)?;
                self.created_folders.remove(&path);
                Ok(())
            }
        }
    }

    /// Create a folder once per run; later calls are answered from memory.
    fn ensure_folder(&mut self, folder: &FolderPath) -> Result<PathBuf, Error> {
        let path = folder.to_fs_path(&self.root);
        if !self.created_folders.contains(&path) {
            fs::create_dir_all(&path)?;
            self.created_folders.insert(path.clone());
        }
        Ok(path)
    }

    /// Move `source` into `to` as `name`. The destination folder is only
    /// created once the source is known to exist.
    fn relocate(&mut self, source: &Path, to: &FolderPath, name: &str) -> Result<(), String> {
        if !source.exists() {
            return Err(format!("{} no longer exists", source.display()));
        }
        let destination = self
            .ensure_folder(to)
            .map_err(|e| e.to_string())?
            .join(name);
        if destination.exists() {
            return Err(format!("{} already exists", destination.display()));
        }
        fs::rename(source, &destination).map_err(|e| {
            format!(
                "cannot move {} to {}: {}",
                source.display(),
                destination.display(),
                e
            )
        })
    }

    /// Remove a folder holding nothing but ignored files.
    fn remove_empty_folder(&self, path: &Path) -> Result<(), String> {
        let entries = fs::read_dir(path).map_err(|e| format!("{}: {}", path.display(), e))?;

        let mut disposable = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| e.to_string())?;
            let entry_path = entry.path();
            let relative = entry_path.strip_prefix(&self.root).unwrap_or(&entry_path);
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if is_file && self.filter.is_ignored(relative) {
                disposable.push(entry_path);
            } else {
                return Err(format!(
                    "{} is not empty: contains {}",
                    path.display(),
                    entry.file_name().to_string_lossy()
                ));
            }
        }

        for file in disposable {
            fs::remove_file(&file).map_err(|e| format!("{}: {}", file.display(), e))?;
        }
        fs::remove_dir(path).map_err(|e| format!("{}: {}", path.display(), e))
    }
}
