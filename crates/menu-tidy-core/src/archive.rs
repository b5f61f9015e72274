use crate::error::Error;
use chrono::Local;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip the whole tree under `root` into `backup_dir`, named after the current
/// local time. Returns the archive path.
pub fn create_archive(root: &Path, backup_dir: &Path) -> Result<PathBuf, Error> {
    fs::create_dir_all(backup_dir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let archive_path = backup_dir.join(format!("start_menu_{}.zip", stamp));

    let file = File::create(&archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0usize;
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Not archiving unreadable entry: {}", err);
                continue;
            }
        };
        let relative = match entry.path().strip_prefix(root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let name = archive_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            let mut source = match File::open(entry.path()) {
                Ok(source) => source,
                Err(err) => {
                    warn!("Not archiving {}: {}", entry.path().display(), err);
                    continue;
                }
            };
            zip.start_file(name, options)?;
            io::copy(&mut source, &mut zip)?;
            files += 1;
        }
    }

    zip.finish()?;
    info!("Archived {} files to {}", files, archive_path.display());
    Ok(archive_path)
}

/// Zip entry names always use forward slashes.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_archive_contains_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("menu");
        fs::create_dir_all(root.join("Programs").join("Empty")).unwrap();
        fs::write(root.join("Programs").join("Chrome.lnk"), b"link").unwrap();

        let archive = create_archive(&root, &tmp.path().join("backups")).unwrap();
        assert!(archive.file_name().unwrap().to_string_lossy().starts_with("start_menu_"));

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut content = String::new();
        zip.by_name("Programs/Chrome.lnk")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "link");
        assert!(zip.file_names().any(|n| n.trim_end_matches('/') == "Programs/Empty"));
    }
}
