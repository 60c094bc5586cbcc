//! Module for searching for joypart profile files

use std::{
    fs::{self, DirEntry},
    path::PathBuf,
};

/// Base system fallback path to use if one cannot be found with XDG
const FALLBACK_BASE_PATH: &str = "/usr/share/joypart";

/// Returns the base path for profile data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("joypart") else {
        log::warn!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::warn!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns a list of directories in load order to find device profiles.
/// E.g. ["/etc/joypart/profiles.d", "/usr/share/joypart/profiles"]
pub fn get_profiles_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./rootfs/usr/share/joypart/profiles"),
        PathBuf::from("/etc/joypart/profiles.d"),
        get_base_path().join("profiles"),
    ]
}

/// Returns a list of file paths for the given directories sorted by filename across
/// all given directories. The filter argument is a closure that should return
/// `true` for any files that should be included in the final results. When the
/// same filename exists in several directories, the one from the earlier
/// directory sorts first.
pub fn get_multidir_sorted_files<F>(paths: &[PathBuf], filter: F) -> Vec<PathBuf>
where
    F: Fn(&DirEntry) -> bool,
{
    let mut file_entries: Vec<DirEntry> = paths
        .iter()
        .flat_map(|path| {
            log::trace!("Checking {path:?} for files");
            let files = match fs::read_dir(path) {
                Ok(files) => files,
                Err(e) => {
                    log::debug!("Unable to read directory: {path:?}: {e}");
                    return vec![];
                }
            };
            files
                .filter_map(|r| {
                    let Ok(entry) = r else { return None };
                    filter(&entry).then_some(entry)
                })
                .collect()
        })
        .collect();

    file_entries.sort_by(|a, b| {
        let file_name_a = a.file_name();
        let file_name_b = b.file_name();
        if file_name_a != file_name_b {
            return file_name_a.cmp(&file_name_b);
        }

        // If the filenames match, use the path order
        let priority = |entry: &DirEntry| {
            let path = entry.path();
            path.parent()
                .and_then(|dir| {
                    paths
                        .iter()
                        .position(|base_path| base_path.as_os_str() == dir.as_os_str())
                })
                .unwrap_or(paths.len())
        };
        priority(a).cmp(&priority(b))
    });
    log::trace!("Got sorted entries: {file_entries:?}");

    file_entries.into_iter().map(|entry| entry.path()).collect()
}
