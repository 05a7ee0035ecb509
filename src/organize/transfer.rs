use filetime::FileTime;
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::conflict::NameAllocator;
use super::hash;
use super::paths;
use crate::error::{Error, Result};
use crate::model::{FileDescriptor, TransferAction, TransferOutcome, TransferRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Copy,
    Move,
}

pub struct TransferContext<'a> {
    pub destination_root: &'a Path,
    pub mode: TransferMode,
    pub dry_run: bool,
    /// On a name collision, fingerprint both sides first and skip the
    /// transfer entirely when the content is byte-identical.
    pub skip_identical: bool,
    pub allocator: &'a NameAllocator,
}

impl TransferContext<'_> {
    fn action(&self) -> TransferAction {
        match (self.dry_run, self.mode) {
            (true, TransferMode::Copy) => TransferAction::WouldCopy,
            (true, TransferMode::Move) => TransferAction::WouldMove,
            (false, TransferMode::Copy) => TransferAction::Copied,
            (false, TransferMode::Move) => TransferAction::Moved,
        }
    }
}

fn error_record(
    descriptor: &FileDescriptor,
    destination: Option<PathBuf>,
    action: TransferAction,
    message: String,
) -> TransferRecord {
    TransferRecord {
        source: descriptor.path.clone(),
        destination,
        category: descriptor.category,
        action,
        outcome: TransferOutcome::Error(message),
    }
}

/// Moves or copies one scanned file into `<destination_root>/<category>/`,
/// resolving a collision-free name through the shared allocator.
///
/// Per-file failures are converted into an error record and never
/// propagate; the only `Err` this returns is the fatal
/// `NameResolutionExhausted`, which aborts the whole run.
pub fn transfer(descriptor: &FileDescriptor, ctx: &TransferContext) -> Result<TransferRecord> {
    let action = ctx.action();

    let file_name = match descriptor.path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_string(),
        None => {
            return Ok(error_record(
                descriptor,
                None,
                action,
                "unrepresentable file name".to_string(),
            ));
        }
    };

    let dest_dir = ctx.destination_root.join(descriptor.category.dir_name());

    // Scanned names feed destination paths, so run them through the
    // same guard the external callers get.
    if let Err(err) = paths::resolve_under_root(&dest_dir, &file_name) {
        return Ok(error_record(descriptor, None, action, err.to_string()));
    }

    if !ctx.dry_run {
        if let Err(err) = fs::create_dir_all(&dest_dir) {
            return Ok(error_record(
                descriptor,
                None,
                action,
                format!("creating {}: {}", dest_dir.display(), err),
            ));
        }
    }

    if ctx.skip_identical {
        let existing = dest_dir.join(&file_name);
        if existing.exists() {
            match (
                hash::fingerprint_file(&descriptor.path),
                hash::fingerprint_file(&existing),
            ) {
                (Ok(source_print), Ok(dest_print)) if source_print == dest_print => {
                    debug!(
                        "Skipping {}: identical content already at {}",
                        descriptor.path.display(),
                        existing.display()
                    );
                    return Ok(TransferRecord {
                        source: descriptor.path.clone(),
                        destination: Some(existing),
                        category: descriptor.category,
                        action: TransferAction::SkippedIdentical,
                        outcome: TransferOutcome::Ok,
                    });
                }
                (Ok(_), Ok(_)) => {}
                (source_result, dest_result) => {
                    if let Err(err) = source_result.and(dest_result) {
                        warn!(
                            "Identity check failed for {}, falling back to rename: {}",
                            descriptor.path.display(),
                            err
                        );
                    }
                }
            }
        }
    }

    let final_name = match ctx.allocator.reserve(&dest_dir, &file_name) {
        Ok(name) => name,
        Err(err @ Error::NameResolutionExhausted { .. }) => return Err(err),
        Err(err) => {
            return Ok(error_record(descriptor, None, action, err.to_string()));
        }
    };
    let destination = dest_dir.join(&final_name);

    if ctx.dry_run {
        return Ok(TransferRecord {
            source: descriptor.path.clone(),
            destination: Some(destination),
            category: descriptor.category,
            action,
            outcome: TransferOutcome::Ok,
        });
    }

    let outcome = match ctx.mode {
        TransferMode::Copy => copy_preserving(descriptor, &destination),
        TransferMode::Move => move_file(descriptor, &destination),
    };

    Ok(match outcome {
        Ok(()) => TransferRecord {
            source: descriptor.path.clone(),
            destination: Some(destination),
            category: descriptor.category,
            action,
            outcome: TransferOutcome::Ok,
        },
        Err(message) => error_record(descriptor, Some(destination), action, message),
    })
}

/// Copy with permissions and mtime carried over, fsynced before the
/// call returns so a following source deletion can trust the copy.
fn copy_preserving(descriptor: &FileDescriptor, destination: &Path) -> std::result::Result<(), String> {
    let write = || -> io::Result<()> {
        let metadata = fs::metadata(&descriptor.path)?;
        let mut reader = File::open(&descriptor.path)?;
        let mut writer = File::create(destination)?;
        io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;
        drop(writer);

        fs::set_permissions(destination, metadata.permissions())?;
        filetime::set_file_mtime(destination, FileTime::from_system_time(descriptor.modified))?;
        Ok(())
    };

    write().map_err(|err| {
        // Never leave a half-written destination behind.
        let _ = fs::remove_file(destination);
        format!("copying to {}: {}", destination.display(), err)
    })
}

/// Rename when source and destination share a volume; otherwise copy,
/// confirm durability, then delete the source. The source is only ever
/// removed after the destination write has been fsynced, and is left
/// intact when that deletion fails.
fn move_file(descriptor: &FileDescriptor, destination: &Path) -> std::result::Result<(), String> {
    if fs::rename(&descriptor.path, destination).is_ok() {
        return Ok(());
    }

    copy_preserving(descriptor, destination)?;

    fs::remove_file(&descriptor.path).map_err(|err| {
        format!(
            "destination {} written but source could not be removed: {}",
            destination.display(),
            err
        )
    })
}
