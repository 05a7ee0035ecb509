use dashmap::DashMap;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

use super::hash;
use super::status::{StatusMessage, StatusSender};
use crate::model::{DedupeSummary, DuplicateGroup};

/// Finds files under `root` with byte-identical content and removes all
/// but one representative per group.
///
/// Three narrowing passes keep hashing cheap: group by size, then by a
/// 1 KiB partial hash, and only fingerprint the whole file where both
/// still collide. The first member in scan order is kept; each deletion
/// is independent and a failed one never blocks the rest. Running twice
/// with no concurrent modification removes nothing the second time.
pub fn deduplicate(
    root: &Path,
    cancelled: &AtomicBool,
    tx_status: &StatusSender,
) -> DedupeSummary {
    tx_status(StatusMessage::DedupeBegin);

    let groups = find_duplicate_groups(root, cancelled);
    let mut summary = DedupeSummary {
        kept: groups.len(),
        ..DedupeSummary::default()
    };

    'groups: for group in &groups {
        for path in group.paths.iter().skip(1) {
            if cancelled.load(Ordering::Relaxed) {
                break 'groups;
            }
            match fs::remove_file(path) {
                Ok(()) => {
                    debug!("Removed duplicate {}", path.display());
                    tx_status(StatusMessage::DedupeRemove { path: path.clone() });
                    summary.removed += 1;
                }
                Err(err) => {
                    error!("Error removing {}: {}", path.display(), err);
                    summary
                        .removal_errors
                        .push((path.clone(), err.to_string()));
                }
            }
        }
    }

    tx_status(StatusMessage::DedupeEnd {
        removed: summary.removed,
    });
    summary
}

/// Groups files under `root` by content fingerprint; only groups with
/// more than one member are returned, members in scan order.
///
/// The cancellation flag is checked before each file in every pass. A
/// cancelled call returns only the groups whose every member was fully
/// fingerprinted before the flag was seen, so a partial result never
/// names a duplicate that was not verified.
pub fn find_duplicate_groups(root: &Path, cancelled: &AtomicBool) -> Vec<DuplicateGroup> {
    // Sequential, name-sorted walk so "first in scan order" is stable.
    let mut files: Vec<(usize, PathBuf, u64)> = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        if cancelled.load(Ordering::Relaxed) {
            return Vec::new();
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(err) => {
                warn!("Skipping {}: {}", entry.path().display(), err);
                continue;
            }
        };
        // 0-byte files are all trivially identical; leave them alone.
        if size == 0 {
            continue;
        }
        files.push((files.len(), entry.path().to_path_buf(), size));
    }

    // Pass 1: bucket on size. Unique sizes cannot be duplicates.
    let mut size_groups: HashMap<u64, Vec<(usize, PathBuf)>> = HashMap::new();
    for (index, path, size) in files {
        size_groups.entry(size).or_default().push((index, path));
    }
    size_groups.retain(|_, group| group.len() > 1);

    // Pass 2: partial hash on the survivors.
    let partial_groups: DashMap<(u64, u64), Vec<(usize, PathBuf)>> = DashMap::new();
    size_groups
        .into_par_iter()
        .for_each(|(size, group)| {
            group.into_par_iter().for_each(|(index, path)| {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                match hash::partial_hash(&path) {
                    Ok(partial) => {
                        partial_groups
                            .entry((size, partial))
                            .or_default()
                            .push((index, path));
                    }
                    Err(err) => {
                        error!("Error hashing {}: {}", path.display(), err);
                    }
                }
            });
        });

    // Pass 3: full fingerprint where size and prefix still collide.
    let fingerprint_groups: DashMap<String, Vec<(usize, PathBuf)>> = DashMap::new();
    partial_groups
        .into_iter()
        .par_bridge()
        .for_each(|(_, group)| {
            if group.len() < 2 {
                return;
            }
            group.into_par_iter().for_each(|(index, path)| {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                match hash::fingerprint_file(&path) {
                    Ok(fingerprint) => {
                        fingerprint_groups
                            .entry(fingerprint)
                            .or_default()
                            .push((index, path));
                    }
                    Err(err) => {
                        error!("Error hashing {}: {}", path.display(), err);
                    }
                }
            });
        });

    let mut groups: Vec<DuplicateGroup> = fingerprint_groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(fingerprint, mut members)| {
            members.sort_by_key(|(index, _)| *index);
            DuplicateGroup {
                fingerprint,
                paths: members.into_iter().map(|(_, path)| path).collect(),
            }
        })
        .collect();

    // Stable output order across runs.
    groups.sort_by(|a, b| a.paths[0].cmp(&b.paths[0]));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organize::status::null_status;
    use tempfile::tempdir;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn removes_all_but_first_in_scan_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "same content").unwrap();
        fs::write(dir.path().join("b.txt"), "same content").unwrap();
        fs::write(dir.path().join("c.txt"), "same content").unwrap();
        fs::write(dir.path().join("unique.txt"), "different").unwrap();

        let summary = deduplicate(dir.path(), &no_cancel(), &null_status());

        assert_eq!(summary.kept, 1);
        assert_eq!(summary.removed, 2);
        assert!(summary.removal_errors.is_empty());
        assert!(dir.path().join("a.txt").exists());
        assert!(!dir.path().join("b.txt").exists());
        assert!(!dir.path().join("c.txt").exists());
        assert!(dir.path().join("unique.txt").exists());
    }

    #[test]
    fn second_pass_removes_nothing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "same content").unwrap();
        fs::write(dir.path().join("b.txt"), "same content").unwrap();

        let first = deduplicate(dir.path(), &no_cancel(), &null_status());
        assert_eq!(first.removed, 1);

        let second = deduplicate(dir.path(), &no_cancel(), &null_status());
        assert_eq!(second.removed, 0);
        assert_eq!(second.kept, 0);
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn same_size_different_content_kept() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.bin"), "content one!").unwrap();
        fs::write(dir.path().join("b.bin"), "content two!").unwrap();

        let summary = deduplicate(dir.path(), &no_cancel(), &null_status());
        assert_eq!(summary.removed, 0);
        assert!(dir.path().join("a.bin").exists());
        assert!(dir.path().join("b.bin").exists());
    }

    #[test]
    fn same_prefix_different_tail_kept() {
        let dir = tempdir().unwrap();
        let mut content = vec![0x11u8; hash::PARTIAL_HASH_LENGTH + 64];
        fs::write(dir.path().join("a.bin"), &content).unwrap();
        content[hash::PARTIAL_HASH_LENGTH + 10] = 0xEE;
        fs::write(dir.path().join("b.bin"), &content).unwrap();

        let summary = deduplicate(dir.path(), &no_cancel(), &null_status());
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn zero_byte_files_are_left_alone() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.empty"), "").unwrap();
        fs::write(dir.path().join("b.empty"), "").unwrap();

        let summary = deduplicate(dir.path(), &no_cancel(), &null_status());
        assert_eq!(summary.removed, 0);
        assert!(dir.path().join("a.empty").exists());
        assert!(dir.path().join("b.empty").exists());
    }

    #[test]
    fn duplicates_across_subdirectories() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("nested");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("a.txt"), "shared bytes").unwrap();
        fs::write(sub.join("copy.txt"), "shared bytes").unwrap();

        let groups = find_duplicate_groups(dir.path(), &no_cancel());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths.len(), 2);
    }

    #[test]
    fn cancel_before_grouping_hashes_nothing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "same content").unwrap();
        fs::write(dir.path().join("b.txt"), "same content").unwrap();

        let cancelled = AtomicBool::new(true);
        let groups = find_duplicate_groups(dir.path(), &cancelled);
        assert!(groups.is_empty());

        let summary = deduplicate(dir.path(), &cancelled, &null_status());
        assert_eq!(summary.kept, 0);
        assert_eq!(summary.removed, 0);
        assert!(dir.path().join("a.txt").exists());
        assert!(dir.path().join("b.txt").exists());
    }
}
