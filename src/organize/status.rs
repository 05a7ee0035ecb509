use std::path::PathBuf;
use std::sync::Arc;

use crate::model::TransferAction;

#[derive(Debug, Clone)]
pub struct ScanAddFileStatusMessage {
    pub file_path: PathBuf,
    pub file_size: u64,
}

#[derive(Debug, Clone)]
pub struct TransferProcStatusMessage {
    pub source: PathBuf,
    pub action: TransferAction,
    pub ok: bool,
}

#[derive(Debug, Clone)]
pub enum StatusMessage {
    RunBegin { sources: Vec<PathBuf> },
    ScanBegin,
    ScanAddFile(ScanAddFileStatusMessage),
    ScanEnd { discovered: usize },
    TransferBegin { total: usize },
    TransferProc(TransferProcStatusMessage),
    TransferEnd,
    DedupeBegin,
    DedupeRemove { path: PathBuf },
    DedupeEnd { removed: usize },
    RunEnd,
}

/// Progress/log sink handed to the pipeline stages. The CLI wires this
/// to an mpsc channel feeding the progress-bar handler; messages arrive
/// on the consumer side in emission order.
pub type StatusSender = Arc<dyn Fn(StatusMessage) + Send + Sync>;

/// Sink that drops every message, for embedding and tests.
pub fn null_status() -> StatusSender {
    Arc::new(|_| {})
}
