#[cfg(target_os = "windows")]
pub mod windows;

use std::path::PathBuf;

/// Per-user Start Menu `Programs` directory.
#[cfg(target_os = "windows")]
pub fn default_start_menu_root() -> Option<PathBuf> {
    windows::user_start_menu_programs()
}

#[cfg(not(target_os = "windows"))]
pub fn default_start_menu_root() -> Option<PathBuf> {
    None
}

