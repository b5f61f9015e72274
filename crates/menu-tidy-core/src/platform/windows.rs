use std::env;
use std::path::PathBuf;

pub fn user_start_menu_programs() -> Option<PathBuf> {
    let app_data = env::var_os("APPDATA")?;
    let mut path = PathBuf::from(app_data);
    for segment in ["Microsoft", "Windows", "Start Menu", "Programs"] {
        path.push(segment);
    }
    Some(path)
}
