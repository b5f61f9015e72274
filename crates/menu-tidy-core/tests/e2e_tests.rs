use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use menu_tidy_core::shortcut::{shell_link, MetadataReader, ShellLinkFormat, ShortcutWriter};
use menu_tidy_core::scanner::EntryFilter;
use menu_tidy_core::{
    Action, AppConfig, ConfigModel, Engine, Error, Executor, FolderPath, ItemMetadata, Plan,
    SilentReporter,
};
use tempfile::TempDir;

fn folder(text: &str) -> FolderPath {
    FolderPath::parse(text).unwrap()
}

fn target(path: &str) -> ItemMetadata {
    ItemMetadata {
        target_path: Some(path.to_string()),
        ..Default::default()
    }
}

fn write_link(path: &Path, target_path: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, shell_link::encode(&target(target_path))).unwrap();
}

/// Creates a small menu tree:
/// ```text
/// menu/
/// ├── Chrome v120.lnk
/// ├── desktop.ini
/// ├── Junk/
/// │   └── VSCode 2.lnk
/// ├── Old/
/// │   ├── desktop.ini
/// │   └── Stranger.lnk
/// └── Programs/
///     └── Dev/
///         └── VSCode.lnk
/// ```
fn create_test_tree(tmp: &TempDir) -> PathBuf {
    let root = tmp.path().join("menu");
    write_link(&root.join("Chrome v120.lnk"), "C:\\Chrome\\chrome.exe");
    fs::write(root.join("desktop.ini"), b"[.ShellClassInfo]").unwrap();
    write_link(&root.join("Junk").join("VSCode 2.lnk"), "C:\\VSCode\\code.exe");
    write_link(&root.join("Old").join("Stranger.lnk"), "C:\\Stranger\\s.exe");
    fs::write(root.join("Old").join("desktop.ini"), b"[.ShellClassInfo]").unwrap();
    write_link(
        &root.join("Programs").join("Dev").join("VSCode.lnk"),
        "C:\\VSCode\\code.exe",
    );
    root
}

fn engine_for(tmp: &TempDir, root: &Path) -> Engine {
    Engine::new(AppConfig {
        root_path: Some(root.to_path_buf()),
        layout_path: tmp.path().join("layout.json"),
        ..AppConfig::default()
    })
}

fn desired_layout() -> ConfigModel {
    let mut layout = ConfigModel::new();
    layout.insert_folder(FolderPath::root());
    layout.insert_folder(folder("Games"));
    layout.insert_item(folder("Programs"), "Chrome.lnk", target("C:\\Chrome\\chrome.exe"));
    layout.insert_item(folder("Programs\\Dev"), "VSCode.lnk", target("C:\\VSCode\\code.exe"));
    layout.insert_item(folder("Tools"), "Notepad.lnk", target("C:\\Windows\\notepad.exe"));
    layout
}

#[test]
fn test_save_records_structure_and_metadata() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    let engine = engine_for(&tmp, &root);

    let saved = engine.save(true, &SilentReporter).unwrap();
    assert!(saved.diff.is_none());
    assert!(saved.archive_path.is_none());
    assert_eq!(saved.metadata_failures, 0);

    let loaded = engine.load_layout().unwrap();
    assert_eq!(loaded, saved.model);
    assert_eq!(loaded.item_count(), 4);
    // Folders holding only ignored files are still recorded.
    assert!(loaded.contains_folder(&folder("Old")));
    assert!(loaded.contains_folder(&folder("Programs")));

    let chrome = loaded
        .items()
        .find(|(_, name, _)| name.as_str() == "Chrome v120.lnk")
        .unwrap();
    assert!(chrome.0.is_root());
    assert_eq!(chrome.2.target_path.as_deref(), Some("C:\\Chrome\\chrome.exe"));

    // Display of the saved layout matches the live structure.
    let live = engine.snapshot(&SilentReporter).unwrap().to_model();
    assert!(menu_tidy_core::model::diff(&loaded, &live).is_empty());
}

#[test]
fn test_save_keeps_unreadable_items_without_metadata() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    fs::write(root.join("Broken.lnk"), b"definitely not a link").unwrap();
    let engine = engine_for(&tmp, &root);

    let saved = engine.save(false, &SilentReporter).unwrap();

    assert_eq!(saved.metadata_failures, 1);
    let broken = saved
        .model
        .items()
        .find(|(_, name, _)| name.as_str() == "Broken.lnk")
        .unwrap();
    assert!(broken.2.is_empty());
}

#[test]
fn test_second_save_reports_moves_and_writes_archive() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    let backups = tmp.path().join("backups");
    let engine = Engine::new(AppConfig {
        root_path: Some(root.clone()),
        layout_path: tmp.path().join("layout.json"),
        backup_dir: Some(backups.clone()),
        ..AppConfig::default()
    });

    engine.save(false, &SilentReporter).unwrap();
    fs::rename(root.join("Chrome v120.lnk"), root.join("Programs").join("Chrome v120.lnk")).unwrap();
    let second = engine.save(true, &SilentReporter).unwrap();

    let diff = second.diff.unwrap();
    assert_eq!(
        diff.moved_items,
        vec![("Chrome v120.lnk".to_string(), FolderPath::root(), folder("Programs"))]
    );
    let archive = second.archive_path.unwrap();
    assert!(archive.starts_with(&backups));
    assert!(archive.is_file());
}

#[test]
fn test_enforce_converges_and_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    let engine = engine_for(&tmp, &root);
    desired_layout().save(&tmp.path().join("layout.json")).unwrap();

    let planned = engine.plan(&SilentReporter).unwrap();
    assert_eq!(planned.observed_items, 4);
    let plan = &planned.plan;
    assert_eq!(
        plan.moves,
        vec![Action::Move {
            item: "Chrome v120.lnk".to_string(),
            from: FolderPath::root(),
            to: folder("Programs"),
        }]
    );
    assert_eq!(plan.recreations.len(), 1);
    assert_eq!(plan.quarantines.len(), 1);
    assert_eq!(
        plan.duplicate_deletes,
        vec![Action::DeleteDuplicate {
            item: "VSCode 2.lnk".to_string(),
            folder: folder("Junk"),
        }]
    );
    assert_eq!(
        plan.empty_folder_deletes,
        vec![
            Action::DeleteEmptyFolder { folder: folder("Junk") },
            Action::DeleteEmptyFolder { folder: folder("Old") },
        ]
    );

    let report = engine.execute(&planned, &SilentReporter);
    assert_eq!(report.error_count, 0, "{:?}", report.results);
    assert_eq!(report.success_count, plan.len());

    assert!(root.join("Programs").join("Chrome v120.lnk").is_file());
    assert!(root.join("Unsorted").join("Stranger.lnk").is_file());
    assert!(!root.join("Junk").exists());
    assert!(!root.join("Old").exists());
    assert!(root.join("desktop.ini").is_file());

    let recreated = ShellLinkFormat
        .read(&root.join("Tools").join("Notepad.lnk"))
        .unwrap();
    assert_eq!(recreated.target_path.as_deref(), Some("C:\\Windows\\notepad.exe"));

    let again = engine.plan(&SilentReporter).unwrap();
    assert!(again.plan.is_empty(), "second run planned {:?}", again.plan);
}

#[test]
fn test_plan_without_layout_fails() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    let engine = engine_for(&tmp, &root);

    match engine.plan(&SilentReporter) {
        Err(Error::ConfigNotFound(path)) => assert_eq!(path, tmp.path().join("layout.json")),
        other => panic!("expected ConfigNotFound, got {:?}", other),
    }
}

#[test]
fn test_diff_live_lists_changes_since_save() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    let engine = engine_for(&tmp, &root);
    engine.save(false, &SilentReporter).unwrap();

    write_link(&root.join("Games").join("Solitaire.lnk"), "C:\\Games\\sol.exe");
    fs::remove_file(root.join("Old").join("Stranger.lnk")).unwrap();

    let diff = engine.diff_live(&SilentReporter).unwrap();
    assert_eq!(diff.added_items, vec![(folder("Games"), "Solitaire.lnk".to_string())]);
    assert_eq!(diff.removed_items, vec![(folder("Old"), "Stranger.lnk".to_string())]);
    assert_eq!(diff.added_folders, vec![folder("Games")]);
}

struct RefusingWriter;

impl ShortcutWriter for RefusingWriter {
    fn write(&self, path: &Path, _metadata: &ItemMetadata) -> Result<(), Error> {
        Err(Error::FilesystemAction {
            action: "write shortcut".to_string(),
            reason: format!("{} is read-only", path.display()),
        })
    }
}

#[test]
fn test_failed_actions_do_not_stop_the_batch() {
    let tmp = TempDir::new().unwrap();
    let root = create_test_tree(&tmp);
    let engine = engine_for(&tmp, &root)
        .with_shortcut_io(Arc::new(ShellLinkFormat), Arc::new(RefusingWriter));
    desired_layout().save(&tmp.path().join("layout.json")).unwrap();

    let planned = engine.plan(&SilentReporter).unwrap();
    // A stale action whose source vanished after planning.
    fs::remove_file(root.join("Old").join("Stranger.lnk")).unwrap();

    let report = engine.execute(&planned, &SilentReporter);

    // The recreation and the quarantine fail; everything else still runs.
    assert_eq!(report.error_count, 2);
    assert_eq!(report.success_count, planned.plan.len() - 2);
    assert!(root.join("Programs").join("Chrome v120.lnk").is_file());
    assert!(!root.join("Junk").exists());
    // The failed quarantine left no destination folder behind.
    assert!(!root.join("Unsorted").exists());

    let failed: Vec<&str> = report
        .results
        .iter()
        .filter(|r| r.outcome.is_err())
        .map(|r| r.action.kind())
        .collect();
    assert_eq!(failed, vec!["Recreate", "Quarantine"]);
}

#[test]
fn test_ignored_subdirectory_keeps_its_parent() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("menu");
    fs::create_dir_all(root.join("Old").join("Cache")).unwrap();
    fs::write(root.join("Old").join("Cache").join("state.bin"), b"state").unwrap();
    fs::create_dir_all(root.join("Empty")).unwrap();

    let engine = Engine::new(AppConfig {
        root_path: Some(root.clone()),
        layout_path: tmp.path().join("layout.json"),
        ignore_patterns: vec!["desktop.ini".to_string(), "Cache".to_string()],
        ..AppConfig::default()
    });
    let mut layout = ConfigModel::new();
    layout.insert_folder(FolderPath::root());
    layout.save(&tmp.path().join("layout.json")).unwrap();

    let planned = engine.plan(&SilentReporter).unwrap();
    assert_eq!(
        planned.plan.empty_folder_deletes,
        vec![Action::DeleteEmptyFolder { folder: folder("Empty") }]
    );
    let report = engine.execute(&planned, &SilentReporter);
    assert_eq!(report.error_count, 0, "{:?}", report.results);

    let again = engine.plan(&SilentReporter).unwrap();
    assert!(again.plan.is_empty(), "second run planned {:?}", again.plan);
    assert!(root.join("Old").join("Cache").join("state.bin").is_file());
}

#[test]
fn test_move_with_vanished_source_creates_no_folder() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("menu");
    fs::create_dir_all(&root).unwrap();

    let plan = Plan {
        moves: vec![Action::Move {
            item: "Gone.lnk".to_string(),
            from: FolderPath::root(),
            to: folder("Games\\Arcade"),
        }],
        ..Plan::default()
    };
    let filter = EntryFilter::from_config(&AppConfig::default());
    let mut executor = Executor::new(&root, Arc::new(ShellLinkFormat), filter);

    let report = executor.execute(&plan, &SilentReporter);

    assert_eq!(report.error_count, 1);
    assert_eq!(report.success_count, 0);
    assert!(!root.join("Games").exists());
}
