use crate::organize::category::Category;
use std::path::PathBuf;
use std::time::SystemTime;

/// One regular file found by the scanner. Immutable after the scan
/// produces it; consumed exactly once by the transfer stage.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    pub category: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Copied,
    Moved,
    SkippedIdentical,
    WouldCopy,
    WouldMove,
}

impl TransferAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferAction::Copied => "copied",
            TransferAction::Moved => "moved",
            TransferAction::SkippedIdentical => "skipped-identical",
            TransferAction::WouldCopy => "would-copy",
            TransferAction::WouldMove => "would-move",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Ok,
    Error(String),
}

impl TransferOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TransferOutcome::Ok)
    }
}

/// Record of a single file through the transfer stage. Never mutated
/// after creation; the controller owns the full sequence for the run.
#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub source: PathBuf,
    /// Resolved destination. `None` when the transfer failed before a
    /// destination name could be resolved.
    pub destination: Option<PathBuf>,
    pub category: Category,
    pub action: TransferAction,
    pub outcome: TransferOutcome,
}

/// Files sharing one content fingerprint. Computed fresh each dedupe
/// pass; the first path in scan order is the kept representative.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub fingerprint: String,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct DedupeSummary {
    /// Duplicate groups found; one representative kept per group.
    pub kept: usize,
    pub removed: usize,
    pub removal_errors: Vec<(PathBuf, String)>,
}
