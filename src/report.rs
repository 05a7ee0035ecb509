use chrono::Local;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{TransferOutcome, TransferRecord};

/// Default transfer-log file name, stamped with the local start time.
pub fn default_log_name() -> PathBuf {
    PathBuf::from(format!(
        "transfer-log-{}.csv",
        Local::now().format("%Y%m%d-%H%M%S")
    ))
}

/// Writes one CSV row per transfer record: source, destination,
/// category, action, outcome. The format is a collaborator convenience;
/// nothing in the engine reads it back.
pub fn write_transfer_log(path: &Path, records: &[TransferRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(io_from_csv)?;

    writer
        .write_record(["source", "destination", "category", "action", "outcome"])
        .map_err(io_from_csv)?;

    for record in records {
        let destination = record
            .destination
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let outcome = match &record.outcome {
            TransferOutcome::Ok => "ok".to_string(),
            TransferOutcome::Error(message) => format!("error: {}", message),
        };
        writer
            .write_record([
                record.source.to_string_lossy().as_ref(),
                destination.as_str(),
                record.category.dir_name(),
                record.action.as_str(),
                outcome.as_str(),
            ])
            .map_err(io_from_csv)?;
    }

    writer.flush()?;
    Ok(())
}

fn io_from_csv(err: csv::Error) -> crate::error::Error {
    crate::error::Error::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}
