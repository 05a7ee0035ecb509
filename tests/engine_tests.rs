use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

use tidy_duper::engine::{Engine, RunOptions, RunPhase};
use tidy_duper::organize::status::null_status;

#[test]
fn background_run_reports_progress_and_completes() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    for i in 0..20 {
        fs::write(src.path().join(format!("file{i}.jpg")), format!("bytes {i}")).unwrap();
    }

    let engine = Arc::new(Engine::with_defaults());
    let handle = engine.start(
        vec![src.path().to_path_buf()],
        dst.path().to_path_buf(),
        RunOptions::default(),
        null_status(),
    );

    // Polling while the run is in flight must never panic or observe
    // processed ahead of discovered.
    loop {
        let progress = handle.progress();
        assert!(progress.processed <= progress.discovered || progress.discovered == 0);
        if progress.phase.is_terminal() {
            break;
        }
        std::thread::yield_now();
    }

    let report = handle.wait().unwrap();
    assert_eq!(report.final_phase, RunPhase::Completed);
    assert_eq!(report.discovered, 20);
    assert_eq!(report.processed, 20);
}

#[test]
fn cancel_stops_the_run_with_partial_results() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    for i in 0..200 {
        fs::write(src.path().join(format!("file{i}.jpg")), format!("bytes {i}")).unwrap();
    }

    let engine = Arc::new(Engine::with_defaults());
    let handle = engine.start(
        vec![src.path().to_path_buf()],
        dst.path().to_path_buf(),
        RunOptions::default(),
        null_status(),
    );

    handle.cancel();
    handle.cancel(); // idempotent

    let report = handle.wait().unwrap();
    // Depending on timing the run either stopped early or had already
    // finished; both are acceptable terminal states.
    assert!(matches!(
        report.final_phase,
        RunPhase::Stopped | RunPhase::Completed
    ));
    assert!(report.processed <= report.discovered);
    // Every processed file produced a record.
    assert_eq!(report.records.len(), report.processed);
}

#[test]
fn report_path_writes_csv_log() {
    let src = tempdir().unwrap();
    let dst = tempdir().unwrap();
    let log_dir = tempdir().unwrap();
    fs::write(src.path().join("photo.jpg"), "bytes").unwrap();
    fs::write(src.path().join("notes.txt"), "text").unwrap();

    let log_path = log_dir.path().join("transfers.csv");
    let engine = Engine::with_defaults();
    let options = RunOptions {
        report_path: Some(log_path.clone()),
        ..RunOptions::default()
    };
    engine
        .run(
            vec![src.path().to_path_buf()],
            dst.path().to_path_buf(),
            options,
            &null_status(),
        )
        .unwrap();

    let contents = fs::read_to_string(&log_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(
        lines.next().unwrap(),
        "source,destination,category,action,outcome"
    );
    let rows: Vec<_> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.contains("photo.jpg") && r.contains("images")));
    assert!(rows.iter().any(|r| r.contains("notes.txt") && r.contains("documents")));
}

#[test]
fn missing_source_fails_before_any_work() {
    let dst = tempdir().unwrap();
    let engine = Engine::with_defaults();
    let result = engine.run(
        vec!["/no/such/source".into()],
        dst.path().to_path_buf(),
        RunOptions::default(),
        &null_status(),
    );
    assert!(result.is_err());
}
