use std::path::PathBuf;

/// Remove directories that are subdirectories of other directories in
/// the list, so one run never scans the same file twice.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        // A parent listed later displaces any children already kept.
        result.retain(|kept| !kept.starts_with(&dir));
        result.push(dir);
    }

    result
}
