use colored::*;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app_config::AppConfig;
use crate::error::{Error, Result};
use crate::model::{DedupeSummary, TransferAction, TransferRecord};
use crate::organize::category::ExtensionTable;
use crate::organize::conflict::{ConflictStrategy, NameAllocator};
use crate::organize::scan::{self, UnknownExtensions};
use crate::organize::status::{StatusMessage, StatusSender, TransferProcStatusMessage};
use crate::organize::transfer::{self, TransferContext, TransferMode};
use crate::organize::dedupe;
use crate::report;
use crate::utils;

/// Phases of one run. `Completed` and `Stopped` are terminal; a new run
/// always starts from a fresh `RunState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunPhase {
    Idle = 0,
    Scanning,
    Transferring,
    Deduplicating,
    Cancelling,
    Completed,
    Stopped,
}

impl RunPhase {
    fn from_u8(value: u8) -> RunPhase {
        match value {
            1 => RunPhase::Scanning,
            2 => RunPhase::Transferring,
            3 => RunPhase::Deduplicating,
            4 => RunPhase::Cancelling,
            5 => RunPhase::Completed,
            6 => RunPhase::Stopped,
            _ => RunPhase::Idle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Scanning => "scanning",
            RunPhase::Transferring => "transferring",
            RunPhase::Deduplicating => "deduplicating",
            RunPhase::Cancelling => "cancelling",
            RunPhase::Completed => "completed",
            RunPhase::Stopped => "stopped",
        }
    }
}

/// Per-invocation counters shared between the controller thread, the
/// workers and any poller. The only cross-worker mutable state in a
/// run; everything here is atomic.
#[derive(Debug)]
pub struct RunState {
    discovered: AtomicUsize,
    processed: AtomicUsize,
    errors: AtomicUsize,
    cancelled: AtomicBool,
    phase: AtomicU8,
}

impl RunState {
    fn new() -> RunState {
        RunState {
            discovered: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            phase: AtomicU8::new(RunPhase::Idle as u8),
        }
    }

    pub fn phase(&self) -> RunPhase {
        RunPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Idempotent; a no-op once the run has reached a terminal phase.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if !self.phase().is_terminal() {
            self.phase
                .store(RunPhase::Cancelling as u8, Ordering::Release);
        }
    }

    /// Moves to the next active phase unless cancellation already put
    /// the run into `Cancelling`.
    fn advance(&self, next: RunPhase) {
        if !self.is_cancelled() {
            self.phase.store(next as u8, Ordering::Release);
        }
    }

    fn finish(&self, terminal: RunPhase) {
        self.phase.store(terminal as u8, Ordering::Release);
    }
}

/// Snapshot returned by progress polling; safe to read while the run
/// is in flight.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub discovered: usize,
    pub processed: usize,
    pub errors: usize,
    pub phase: RunPhase,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: TransferMode,
    pub follow_symlinks: bool,
    pub dry_run: bool,
    pub remove_duplicates_after: bool,
    pub conflict_strategy: ConflictStrategy,
    pub skip_identical: bool,
    pub unknown_extensions: UnknownExtensions,
    pub ignore_patterns: Vec<String>,
    /// Write the per-file transfer log here as CSV when set.
    pub report_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            mode: TransferMode::Copy,
            follow_symlinks: false,
            dry_run: false,
            remove_duplicates_after: false,
            conflict_strategy: ConflictStrategy::Numbered,
            skip_identical: true,
            unknown_extensions: UnknownExtensions::Other,
            ignore_patterns: Vec::new(),
            report_path: None,
        }
    }
}

/// Aggregate result of one finished run.
#[derive(Debug)]
pub struct RunReport {
    pub records: Vec<TransferRecord>,
    pub discovered: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub dedupe: Option<DedupeSummary>,
    pub final_phase: RunPhase,
}

/// Orchestrates Scan → Classify → Transfer → (optional) Deduplicate.
/// Holds only run-independent pieces: the validated extension table and
/// the conflict-probe cap. All per-run state lives in `RunState`.
pub struct Engine {
    table: ExtensionTable,
    max_name_attempts: u32,
}

impl Engine {
    pub fn new(config: &AppConfig) -> Result<Engine> {
        Ok(Engine {
            table: ExtensionTable::with_overrides(&config.categories)?,
            max_name_attempts: config.max_name_attempts,
        })
    }

    pub fn with_defaults() -> Engine {
        Engine {
            table: ExtensionTable::builtin(),
            max_name_attempts: 10_000,
        }
    }

    /// Spawns the controller thread and returns immediately. Progress
    /// is polled and cancellation requested through the handle.
    pub fn start(
        self: &Arc<Self>,
        sources: Vec<PathBuf>,
        destination: PathBuf,
        options: RunOptions,
        tx_status: StatusSender,
    ) -> RunHandle {
        let state = Arc::new(RunState::new());
        let engine = Arc::clone(self);
        let thread_state = Arc::clone(&state);

        let join = thread::spawn(move || {
            engine.run_with_state(sources, destination, options, thread_state, &tx_status)
        });

        RunHandle { state, join }
    }

    /// Synchronous entry point; blocks the caller for the whole run.
    pub fn run(
        &self,
        sources: Vec<PathBuf>,
        destination: PathBuf,
        options: RunOptions,
        tx_status: &StatusSender,
    ) -> Result<RunReport> {
        let state = Arc::new(RunState::new());
        self.run_with_state(sources, destination, options, state, tx_status)
    }

    fn run_with_state(
        &self,
        sources: Vec<PathBuf>,
        destination: PathBuf,
        options: RunOptions,
        state: Arc<RunState>,
        tx_status: &StatusSender,
    ) -> Result<RunReport> {
        let sources = self.validate_inputs(&sources, &destination, &options)?;
        tx_status(StatusMessage::RunBegin {
            sources: sources.clone(),
        });

        // Phase 1: scan and classify.
        state.advance(RunPhase::Scanning);
        info!("Scanning {} source root(s)...", sources.len());
        let scan_start = Instant::now();
        let ignore = scan::compile_ignore_patterns(&options.ignore_patterns);

        // Mirror the discovered count into the shared state as files
        // are found, so polling sees totals grow during the scan
        // instead of jumping at the end.
        let counting_tx: StatusSender = {
            let state = Arc::clone(&state);
            let forward = Arc::clone(tx_status);
            Arc::new(move |message: StatusMessage| {
                if matches!(message, StatusMessage::ScanAddFile(_)) {
                    state.discovered.fetch_add(1, Ordering::Relaxed);
                }
                forward(message);
            })
        };
        let descriptors = scan::scan_sources(
            &sources,
            &self.table,
            options.follow_symlinks,
            &ignore,
            options.unknown_extensions,
            &state.cancelled,
            &counting_tx,
        );
        let scan_duration = scan_start.elapsed();
        debug!(
            "Scan completed in {} seconds, {} files discovered",
            format!("{:.2}", scan_duration.as_secs_f64()).green(),
            descriptors.len(),
        );

        if state.is_cancelled() {
            return Ok(self.finish_run(Vec::new(), None, &state, &options, tx_status));
        }

        // Phase 2: transfer across the worker pool.
        state.advance(RunPhase::Transferring);
        info!("Transferring {} file(s)...", descriptors.len());
        tx_status(StatusMessage::TransferBegin {
            total: descriptors.len(),
        });
        let transfer_start = Instant::now();
        let allocator = NameAllocator::new(options.conflict_strategy, self.max_name_attempts);
        let context = TransferContext {
            destination_root: &destination,
            mode: options.mode,
            dry_run: options.dry_run,
            skip_identical: options.skip_identical,
            allocator: &allocator,
        };

        let records: Mutex<Vec<TransferRecord>> = Mutex::new(Vec::new());
        let fatal: Mutex<Option<Error>> = Mutex::new(None);

        descriptors.par_iter().for_each(|descriptor| {
            // Cancellation stops dispatch; in-flight transfers finish.
            if state.is_cancelled() || fatal.lock().unwrap().is_some() {
                return;
            }

            match transfer::transfer(descriptor, &context) {
                Ok(record) => {
                    state.processed.fetch_add(1, Ordering::Relaxed);
                    if !record.outcome.is_ok() {
                        state.errors.fetch_add(1, Ordering::Relaxed);
                    }
                    tx_status(StatusMessage::TransferProc(TransferProcStatusMessage {
                        source: record.source.clone(),
                        action: record.action,
                        ok: record.outcome.is_ok(),
                    }));
                    records.lock().unwrap().push(record);
                }
                Err(err) => {
                    error!("Fatal transfer error: {}", err);
                    *fatal.lock().unwrap() = Some(err);
                }
            }
        });
        tx_status(StatusMessage::TransferEnd);

        if let Some(err) = fatal.into_inner().unwrap() {
            state.finish(RunPhase::Stopped);
            tx_status(StatusMessage::RunEnd);
            return Err(err);
        }

        let records = records.into_inner().unwrap();
        let transfer_duration = transfer_start.elapsed();
        debug!(
            "Transfer completed in {} seconds, {} records",
            format!("{:.2}", transfer_duration.as_secs_f64()).green(),
            records.len(),
        );

        // Phase 3 (optional): dedupe the destination.
        let mut dedupe_summary = None;
        if options.remove_duplicates_after && !options.dry_run && !state.is_cancelled() {
            state.advance(RunPhase::Deduplicating);
            info!("Removing duplicates under {}...", destination.display());
            let dedupe_start = Instant::now();
            let summary = dedupe::deduplicate(&destination, &state.cancelled, tx_status);
            state
                .errors
                .fetch_add(summary.removal_errors.len(), Ordering::Relaxed);
            debug!(
                "Dedupe completed in {} seconds, {} removed",
                format!("{:.2}", dedupe_start.elapsed().as_secs_f64()).green(),
                summary.removed,
            );
            dedupe_summary = Some(summary);
        }

        Ok(self.finish_run(records, dedupe_summary, &state, &options, tx_status))
    }

    fn finish_run(
        &self,
        records: Vec<TransferRecord>,
        dedupe: Option<DedupeSummary>,
        state: &RunState,
        options: &RunOptions,
        tx_status: &StatusSender,
    ) -> RunReport {
        if let Some(path) = &options.report_path {
            if let Err(err) = report::write_transfer_log(path, &records) {
                error!("Error writing transfer log {}: {}", path.display(), err);
            }
        }

        let final_phase = if state.is_cancelled() {
            warn!("Run stopped by request");
            RunPhase::Stopped
        } else {
            RunPhase::Completed
        };
        state.finish(final_phase);
        tx_status(StatusMessage::RunEnd);

        let skipped = records
            .iter()
            .filter(|r| r.action == TransferAction::SkippedIdentical)
            .count();

        RunReport {
            discovered: state.discovered.load(Ordering::Relaxed),
            processed: state.processed.load(Ordering::Relaxed),
            errors: state.errors.load(Ordering::Relaxed),
            skipped,
            records,
            dedupe,
            final_phase,
        }
    }

    /// Run-level validation; any failure here is fatal and nothing has
    /// been touched yet. Overlapping source roots are reduced to their
    /// outermost directories.
    fn validate_inputs(
        &self,
        sources: &[PathBuf],
        destination: &Path,
        options: &RunOptions,
    ) -> Result<Vec<PathBuf>> {
        if sources.is_empty() {
            return Err(Error::Config("no source directories given".to_string()));
        }
        for source in sources {
            if !source.is_dir() {
                return Err(Error::Config(format!(
                    "source '{}' is not a directory",
                    source.display()
                )));
            }
        }

        if !options.dry_run {
            fs::create_dir_all(destination).map_err(|err| {
                Error::Config(format!(
                    "destination '{}' is not creatable: {}",
                    destination.display(),
                    err
                ))
            })?;
        }

        Ok(utils::non_overlapping_directories(sources.to_vec()))
    }
}

pub struct RunHandle {
    state: Arc<RunState>,
    join: JoinHandle<Result<RunReport>>,
}

impl RunHandle {
    /// Idempotent; safe to call repeatedly or after completion.
    pub fn cancel(&self) {
        self.state.request_cancel();
    }

    /// Safe to call concurrently with the run.
    pub fn progress(&self) -> Progress {
        Progress {
            discovered: self.state.discovered.load(Ordering::Relaxed),
            processed: self.state.processed.load(Ordering::Relaxed),
            errors: self.state.errors.load(Ordering::Relaxed),
            phase: self.state.phase(),
        }
    }

    pub fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    /// Blocks until the controller thread finishes and returns its
    /// report.
    pub fn wait(self) -> Result<RunReport> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Config("controller thread panicked".to_string())),
        }
    }
}
