use glob::Pattern;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, warn};
use walkdir::WalkDir;

use super::category::ExtensionTable;
use super::status::{ScanAddFileStatusMessage, StatusMessage, StatusSender};
use crate::model::FileDescriptor;

/// What to do with files whose extension maps to no category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownExtensions {
    /// File under the `other` category.
    Other,
    /// Leave the file out of the run entirely.
    Exclude,
}

pub fn compile_ignore_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

/// Recursively enumerates regular files under `roots` in a stable
/// (name-sorted) order, classifying each one. Unreadable directories
/// and entries are logged and skipped, never fatal. Symlinks are only
/// followed when enabled; a visited (device, inode) set then keeps
/// link cycles and aliased subtrees from yielding a file twice.
///
/// The full tree is walked before the transfer stage starts, so the
/// descriptor count is exact by the time transfers are dispatched.
pub fn scan_sources(
    roots: &[PathBuf],
    table: &ExtensionTable,
    follow_symlinks: bool,
    ignore_patterns: &[Pattern],
    unknown_extensions: UnknownExtensions,
    cancelled: &AtomicBool,
    tx_status: &StatusSender,
) -> Vec<FileDescriptor> {
    let mut descriptors: Vec<FileDescriptor> = Vec::new();
    let mut visited: HashSet<(u64, u64)> = HashSet::new();

    tx_status(StatusMessage::ScanBegin);

    'roots: for root in roots {
        let walker = WalkDir::new(root)
            .follow_links(follow_symlinks)
            .sort_by_file_name();

        for entry in walker {
            if cancelled.load(Ordering::Relaxed) {
                break 'roots;
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

            let path = entry.path();
            if ignore_patterns
                .iter()
                .any(|pattern| pattern.matches_path(path))
            {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };

            if follow_symlinks && !mark_visited(&mut visited, &metadata) {
                continue;
            }

            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name,
                None => {
                    warn!("Skipping {}: unrepresentable file name", path.display());
                    continue;
                }
            };

            let category = match table.lookup(file_name) {
                Some(category) => category,
                None => match unknown_extensions {
                    UnknownExtensions::Other => super::category::Category::Other,
                    UnknownExtensions::Exclude => continue,
                },
            };

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(err) => {
                    warn!("Skipping {}: {}", path.display(), err);
                    continue;
                }
            };

            let descriptor = FileDescriptor {
                path: path.to_path_buf(),
                size: metadata.len(),
                modified,
                category,
            };

            tx_status(StatusMessage::ScanAddFile(ScanAddFileStatusMessage {
                file_path: descriptor.path.clone(),
                file_size: descriptor.size,
            }));
            descriptors.push(descriptor);
        }
    }

    tx_status(StatusMessage::ScanEnd {
        discovered: descriptors.len(),
    });
    descriptors
}

#[cfg(unix)]
fn mark_visited(visited: &mut HashSet<(u64, u64)>, metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    visited.insert((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn mark_visited(_visited: &mut HashSet<(u64, u64)>, _metadata: &std::fs::Metadata) -> bool {
    // walkdir's own ancestor loop check is the only guard here.
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organize::category::Category;
    use crate::organize::status::null_status;
    use std::fs;
    use tempfile::tempdir;

    fn scan_plain(root: &std::path::Path) -> Vec<FileDescriptor> {
        scan_sources(
            &[root.to_path_buf()],
            &ExtensionTable::builtin(),
            false,
            &[],
            UnknownExtensions::Other,
            &AtomicBool::new(false),
            &null_status(),
        )
    }

    #[test]
    fn finds_and_classifies_nested_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), "img").unwrap();
        let sub = dir.path().join("deep");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("song.mp3"), "audio").unwrap();
        fs::write(sub.join("notes"), "text").unwrap();

        let descriptors = scan_plain(dir.path());
        assert_eq!(descriptors.len(), 3);

        let by_name = |name: &str| {
            descriptors
                .iter()
                .find(|d| d.path.file_name().unwrap() == name)
                .unwrap()
        };
        assert_eq!(by_name("photo.jpg").category, Category::Images);
        assert_eq!(by_name("song.mp3").category, Category::Audio);
        assert_eq!(by_name("notes").category, Category::Other);
    }

    #[test]
    fn excludes_unknown_extensions_when_configured() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), "img").unwrap();
        fs::write(dir.path().join("mystery.qqq"), "???").unwrap();

        let descriptors = scan_sources(
            &[dir.path().to_path_buf()],
            &ExtensionTable::builtin(),
            false,
            &[],
            UnknownExtensions::Exclude,
            &AtomicBool::new(false),
            &null_status(),
        );
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].path.file_name().unwrap(), "photo.jpg");
    }

    #[test]
    fn ignore_patterns_filter_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("keep.jpg"), "img").unwrap();
        fs::write(dir.path().join("skip.tmp"), "tmp").unwrap();

        let patterns = compile_ignore_patterns(&["*.tmp".to_string()]);
        let descriptors = scan_sources(
            &[dir.path().to_path_buf()],
            &ExtensionTable::builtin(),
            false,
            &patterns,
            UnknownExtensions::Other,
            &AtomicBool::new(false),
            &null_status(),
        );
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].path.file_name().unwrap(), "keep.jpg");
    }

    #[test]
    fn symlinks_not_followed_by_default() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("real");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("photo.jpg"), "img").unwrap();

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&target, dir.path().join("alias")).unwrap();
            let descriptors = scan_plain(dir.path());
            // only the real file, not the aliased copy
            assert_eq!(descriptors.len(), 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn followed_symlink_yields_each_inode_once() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("real");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("photo.jpg"), "img").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("alias")).unwrap();

        let descriptors = scan_sources(
            &[dir.path().to_path_buf()],
            &ExtensionTable::builtin(),
            true,
            &[],
            UnknownExtensions::Other,
            &AtomicBool::new(false),
            &null_status(),
        );
        assert_eq!(descriptors.len(), 1);
    }
}
