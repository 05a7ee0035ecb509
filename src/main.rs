mod cli;
mod status_ui;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, DedupeArgs, OrganizeArgs};
use dotenv::dotenv;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use tracing::{error, info};

use tidy_duper::app_config::{self, AppConfig};
use tidy_duper::engine::{Engine, RunOptions, RunPhase};
use tidy_duper::organize::dedupe;
use tidy_duper::organize::scan::UnknownExtensions;
use tidy_duper::organize::status::{StatusMessage, StatusSender};
use tidy_duper::organize::transfer::TransferMode;
use tidy_duper::report;

fn main() {
    dotenv().ok();

    let _guard = tidy_duper::logging::init_logger();

    let args = Cli::parse();

    let result = match args.command {
        Commands::Organize(organize_args) => run_organize(organize_args),
        Commands::Dedupe(dedupe_args) => run_dedupe(dedupe_args),
        Commands::PrintConfig => print_config(),
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn load_config() -> anyhow::Result<AppConfig> {
    app_config::load_configuration().context("loading configuration")
}

fn run_organize(args: OrganizeArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    let engine = Arc::new(Engine::new(&config)?);

    let options = RunOptions {
        mode: if args.move_files {
            TransferMode::Move
        } else {
            TransferMode::Copy
        },
        follow_symlinks: args.follow_symlinks,
        dry_run: args.dry_run,
        remove_duplicates_after: args.dedupe,
        conflict_strategy: args.strategy,
        skip_identical: !args.no_skip_identical,
        unknown_extensions: if args.exclude_unknown {
            UnknownExtensions::Exclude
        } else {
            UnknownExtensions::Other
        },
        ignore_patterns: config.ignore_patterns.clone(),
        report_path: args.report.or_else(|| {
            args.dry_run.then(report::default_log_name)
        }),
    };

    let (tx, rx) = mpsc::channel::<StatusMessage>();
    let tx_status: StatusSender = Arc::new(move |message| {
        let _ = tx.send(message);
    });
    let ui = std::thread::spawn(move || status_ui::handle_status(rx));

    let handle = engine.start(args.sources, args.dest, options, tx_status);

    // Ctrl-C requests a cooperative stop; in-flight transfers finish.
    {
        let state = handle.state();
        let _ = ctrlc::set_handler(move || {
            info!("Stop requested, letting in-flight transfers finish...");
            state.request_cancel();
        });
    }

    let report = handle.wait()?;
    let _ = ui.join();

    println!(
        "{}: {} discovered, {} processed, {} skipped, {} errors",
        report.final_phase.as_str(),
        report.discovered,
        report.processed,
        report.skipped,
        report.errors,
    );
    if let Some(summary) = &report.dedupe {
        println!(
            "dedupe: {} groups, {} removed, {} removal errors",
            summary.kept,
            summary.removed,
            summary.removal_errors.len(),
        );
    }
    if report.final_phase == RunPhase::Stopped {
        println!("stopped by request; results above are partial");
    }

    Ok(())
}

fn run_dedupe(args: DedupeArgs) -> anyhow::Result<()> {
    if !args.dir.is_dir() {
        anyhow::bail!("'{}' is not a directory", args.dir.display());
    }

    let (tx, rx) = mpsc::channel::<StatusMessage>();
    let tx_status: StatusSender = Arc::new(move |message| {
        let _ = tx.send(message);
    });
    let ui = std::thread::spawn(move || status_ui::handle_status(rx));

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        let _ = ctrlc::set_handler(move || {
            cancelled.store(true, std::sync::atomic::Ordering::Relaxed);
        });
    }

    let summary = dedupe::deduplicate(&args.dir, &cancelled, &tx_status);
    drop(tx_status);
    let _ = ui.join();

    println!(
        "{} duplicate groups, {} files removed, {} removal errors",
        summary.kept,
        summary.removed,
        summary.removal_errors.len(),
    );
    for (path, message) in &summary.removal_errors {
        println!("  failed to remove {}: {}", path.display(), message);
    }

    Ok(())
}

fn print_config() -> anyhow::Result<()> {
    let config = load_config()?;
    println!("{:#?}", config);
    Ok(())
}
