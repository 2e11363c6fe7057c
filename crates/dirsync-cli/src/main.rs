mod cli;
mod scheduler;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use dirsync_core::sync::SyncReporter;
use dirsync_core::{ChangeSink, LogReporter, SyncConfig, SyncEngine};
use scheduler::Scheduler;

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "dirsync=warn,dirsync_core=warn",
        1 => "dirsync=info,dirsync_core=info",
        2 => "dirsync=debug,dirsync_core=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Ctrl+C only raises the flag: a pass in progress is allowed to finish.
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to set Ctrl+C handler")?;

    let config = SyncConfig::resolve(&cli.source, &cli.destination)
        .context("Failed to resolve source and destination paths")?
        .with_dry_run(cli.dry_run);
    config.validate().context("Invalid source or destination")?;

    let log_path = dirsync_core::config::resolve_path(&cli.log_file)
        .context("Failed to resolve log file path")?;
    if log_path.starts_with(&config.dest_root) {
        anyhow::bail!(
            "Log file must not be inside the destination directory: {}",
            log_path.display()
        );
    }

    let mut reporter = if cli.dry_run {
        LogReporter::console_only()
    } else {
        LogReporter::open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?
    };

    tracing::info!(
        source = %config.source_root.display(),
        dest = %config.dest_root.display(),
        log = %log_path.display(),
        schedule = ?cli.schedule(),
        "starting"
    );

    let engine = SyncEngine::new(config);
    let scheduler = Scheduler::new(cli.schedule(), Arc::clone(&shutdown));

    let outcome = scheduler.run(|| {
        let sink: &mut dyn ChangeSink = &mut reporter;
        let result = engine.synchronize(sink)?;
        if cli.verbose > 0 {
            eprintln!("{}", SyncReporter::generate_summary(&result));
        }
        Ok(())
    });

    if shutdown.load(Ordering::SeqCst) {
        println!("Ending dirsync");
    }

    outcome.context("Sync operation failed")?;
    Ok(())
}
