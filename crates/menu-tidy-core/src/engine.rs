use crate::archive;
use crate::config::AppConfig;
use crate::error::Error;
use crate::executor::{ExecutionReport, Executor};
use crate::model::{self, ConfigModel, LayoutDiff};
use crate::normalize::NameNormalizer;
use crate::progress::ProgressReporter;
use crate::reconcile::{Plan, ReconcileOptions, Reconciler};
use crate::scanner::{self, EntryFilter, Snapshot};
use crate::shortcut::{MetadataReader, ShellLinkFormat, ShortcutWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Ties settings, scanner, reconciler and executor together for the three
/// modes: save, display and enforce.
pub struct Engine {
    config: AppConfig,
    reader: Arc<dyn MetadataReader>,
    writer: Arc<dyn ShortcutWriter>,
}

#[derive(Debug)]
pub struct SaveResult {
    pub model: ConfigModel,
    pub layout_path: PathBuf,
    /// Changes against the previously saved layout, when there was one.
    pub diff: Option<LayoutDiff>,
    pub archive_path: Option<PathBuf>,
    /// Items saved without metadata.
    pub metadata_failures: usize,
    pub scan_duration: Duration,
}

#[derive(Debug)]
pub struct EnforcePlan {
    pub root: PathBuf,
    pub plan: Plan,
    pub observed_items: usize,
}

impl Engine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            reader: Arc::new(ShellLinkFormat),
            writer: Arc::new(ShellLinkFormat),
        }
    }

    pub fn with_shortcut_io(mut self, reader: Arc<dyn MetadataReader>, writer: Arc<dyn ShortcutWriter>) -> Self {
        self.reader = reader;
        self.writer = writer;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn filter(&self) -> EntryFilter {
        EntryFilter::from_config(&self.config)
    }

    pub fn load_layout(&self) -> Result<ConfigModel, Error> {
        ConfigModel::load(&self.config.layout_path)
    }

    /// Scan the tree and write it as the new layout. The previous layout, if
    /// any, is diffed against the new one and an archive is written when a
    /// backup directory is configured and `with_archive` is set.
    pub fn save(&self, with_archive: bool, reporter: &dyn ProgressReporter) -> Result<SaveResult, Error> {
        let root = self.config.root()?;
        info!("Saving layout of {}", root.display());

        let start = Instant::now();
        let scan = scanner::scan_layout(
            &root,
            &self.filter(),
            self.reader.as_ref(),
            self.config.scan_workers,
            reporter,
        )?;
        let scan_duration = start.elapsed();

        let diff = match ConfigModel::load(&self.config.layout_path) {
            Ok(previous) => Some(model::diff(&previous, &scan.model)),
            Err(Error::ConfigNotFound(_)) => None,
            Err(err) => {
                tracing::warn!("Previous layout unreadable, not diffing: {}", err);
                None
            }
        };

        scan.model.save(&self.config.layout_path)?;
        info!(
            "Layout written to {} ({} folders, {} items)",
            self.config.layout_path.display(),
            scan.model.folder_count(),
            scan.model.item_count()
        );

        let archive_path = match (&self.config.backup_dir, with_archive) {
            (Some(dir), true) => Some(archive::create_archive(&root, dir)?),
            _ => None,
        };

        Ok(SaveResult {
            model: scan.model,
            layout_path: self.config.layout_path.clone(),
            diff,
            archive_path,
            metadata_failures: scan.warnings.len(),
            scan_duration,
        })
    }

    /// Live tree structure, without metadata.
    pub fn snapshot(&self, reporter: &dyn ProgressReporter) -> Result<Snapshot, Error> {
        let root = self.config.root()?;
        scanner::scan_actual(&root, &self.filter(), reporter)
    }

    /// Compare the live tree with the saved layout.
    pub fn diff_live(&self, reporter: &dyn ProgressReporter) -> Result<LayoutDiff, Error> {
        let layout = self.load_layout()?;
        let snapshot = self.snapshot(reporter)?;
        Ok(model::diff(&layout, &snapshot.to_model()))
    }

    pub fn reconciler(&self) -> Result<Reconciler, Error> {
        let options = ReconcileOptions {
            quarantine_folder: self.config.quarantine()?,
            protected_folders: self.config.protected(),
        };
        let normalizer = NameNormalizer::new(&self.config.item_extensions);
        Ok(Reconciler::new(normalizer, options))
    }

    /// Everything up to the confirmation point: load, scan, reconcile. No
    /// filesystem changes happen here.
    pub fn plan(&self, reporter: &dyn ProgressReporter) -> Result<EnforcePlan, Error> {
        let layout = self.load_layout()?;
        let root = self.config.root()?;
        let snapshot = scanner::scan_actual(&root, &self.filter(), reporter)?;
        debug!(
            "Reconciling {} observed items against {} configured",
            snapshot.items.len(),
            layout.item_count()
        );
        let plan = self.reconciler()?.reconcile(&layout, &snapshot);
        Ok(EnforcePlan {
            root,
            plan,
            observed_items: snapshot.items.len(),
        })
    }

    pub fn execute(&self, planned: &EnforcePlan, reporter: &dyn ProgressReporter) -> ExecutionReport {
        let mut executor = Executor::new(planned.root.clone(), self.writer.clone(), self.filter());
        executor.execute(&planned.plan, reporter)
    }
}
