use console::{style, Term};
use indicatif::{HumanBytes, HumanCount, HumanDuration, MultiProgress, ProgressBar, ProgressStyle};
use std::sync::mpsc;

use tidy_duper::model::TransferAction;
use tidy_duper::organize::status::StatusMessage;

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner} {prefix:.bold.dim} {wide_msg}";
const BAR_TEMPLATE: &str = "[{elapsed_precise}] {prefix:.bold}▕{bar:.blue}▏{pos}/{len} {wide_msg}";
const FINISH_TEMPLATE: &str = "[{elapsed_precise}] {msg}";

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap()
            .tick_strings(&[".  ", ".. ", "...", " ..", "  .", "   "]),
    );
    pb
}

fn new_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::with_template(BAR_TEMPLATE).unwrap());
    pb
}

fn finish(pb: &ProgressBar, message: String) {
    pb.set_style(ProgressStyle::with_template(FINISH_TEMPLATE).unwrap());
    pb.finish_with_message(message);
}

/// Drains engine status messages into terminal progress bars. Runs on
/// its own thread; exits when the sending side hangs up.
pub fn handle_status(rx: mpsc::Receiver<StatusMessage>) {
    let multi = MultiProgress::new();
    let scan_bar = multi.add(new_spinner());
    let transfer_bar = multi.add(new_bar());
    let dedupe_bar = multi.add(new_spinner());

    let term = Term::stdout();

    let mut scanned_files: u64 = 0;
    let mut scanned_bytes: u64 = 0;
    let mut transfer_errors: u64 = 0;
    let mut skipped: u64 = 0;
    let mut removed: u64 = 0;

    for message in rx {
        match message {
            StatusMessage::RunBegin { .. } => {
                let _ = term.hide_cursor();
            }
            StatusMessage::ScanBegin => {
                scan_bar.set_prefix("Scanning:");
                scan_bar.enable_steady_tick(std::time::Duration::from_millis(100));
            }
            StatusMessage::ScanAddFile(msg) => {
                scanned_files += 1;
                scanned_bytes += msg.file_size;
                scan_bar.set_message(format!(
                    "Scanned {} files, total size {} ({})",
                    style(HumanCount(scanned_files)).bold().green(),
                    style(HumanBytes(scanned_bytes)).bold().green(),
                    msg.file_path.display()
                ));
            }
            StatusMessage::ScanEnd { discovered } => {
                finish(
                    &scan_bar,
                    format!(
                        "Scanned {} files, total size {} in {}",
                        style(HumanCount(discovered as u64)).bold().green(),
                        style(HumanBytes(scanned_bytes)).bold().green(),
                        HumanDuration(scan_bar.elapsed())
                    ),
                );
            }
            StatusMessage::TransferBegin { total } => {
                transfer_bar.set_length(total as u64);
                transfer_bar.set_prefix("Organizing:");
            }
            StatusMessage::TransferProc(msg) => {
                transfer_bar.inc(1);
                if !msg.ok {
                    transfer_errors += 1;
                }
                if msg.action == TransferAction::SkippedIdentical {
                    skipped += 1;
                }
                transfer_bar.set_message(format!(
                    "{} ({} skipped, {} errors)",
                    msg.source.display(),
                    skipped,
                    style(transfer_errors).red()
                ));
            }
            StatusMessage::TransferEnd => {
                finish(
                    &transfer_bar,
                    format!(
                        "Organized {} files ({} skipped, {} errors) in {}",
                        style(HumanCount(transfer_bar.position())).bold().green(),
                        skipped,
                        transfer_errors,
                        HumanDuration(transfer_bar.elapsed())
                    ),
                );
            }
            StatusMessage::DedupeBegin => {
                dedupe_bar.set_prefix("Deduping:");
                dedupe_bar.enable_steady_tick(std::time::Duration::from_millis(100));
            }
            StatusMessage::DedupeRemove { path } => {
                removed += 1;
                dedupe_bar.set_message(format!(
                    "Removed {} duplicates ({})",
                    style(HumanCount(removed)).bold().green(),
                    path.display()
                ));
            }
            StatusMessage::DedupeEnd { removed } => {
                finish(
                    &dedupe_bar,
                    format!(
                        "Removed {} duplicate files in {}",
                        style(HumanCount(removed as u64)).bold().green(),
                        HumanDuration(dedupe_bar.elapsed())
                    ),
                );
            }
            StatusMessage::RunEnd => {
                let _ = term.show_cursor();
            }
        }
    }
}
