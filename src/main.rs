#![warn(
    // clippy::pedantic,
    clippy::complexity,
    clippy::correctness,
    clippy::perf
)]
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use indicatif::ProgressBar;
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use reclaim::cli::Cli;
use reclaim::config::{self, Config, TargetCatalog};
use reclaim::{format_bytes, progress, Engine, ProgressEvent, TargetSet, Verbosity};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::load().await?;

    if cli.list {
        for name in TargetCatalog::GROUP_NAMES {
            println!("{name}");
            if let Some(paths) = config.targets.group(name) {
                for path in paths {
                    println!("  {path}");
                }
            }
        }
        return Ok(());
    }

    let profile = dirs::home_dir().expect("Could not determine home directory");
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);

    // Pick the group to operate on; the default is the whole catalog.
    let (group_label, raw_targets) = match &cli.group {
        Some(name) => {
            let paths = config
                .targets
                .group(name)
                .ok_or_else(|| eyre!("unknown catalog group: {name} (see --list)"))?;
            (name.clone(), paths.to_vec())
        }
        None => ("all categories".to_string(), config.targets.all()),
    };
    let targets = TargetSet::new(config::resolve_profile(&raw_targets, &profile))?;

    // A full sweep is the destructive default, so it asks first.
    if !cli.measure && cli.group.is_none() && !cli.yes {
        print!(
            "Do you really want to delete the contents of all {} configured folders? [y/N]: ",
            targets.len()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let (sink, events) = progress::channel(config.progress_buffer);
    let engine = Arc::new(Engine::new(sink));

    // Set up Ctrl+C handler: first press requests a cooperative cancel, the
    // run then winds down at its next per-item check.
    let engine_for_signal = Arc::clone(&engine);
    let shutdown_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\nInterrupted! Letting in-flight deletions finish...");
                engine_for_signal.request_cancel();
            }
            Err(err) => {
                eprintln!("Failed to listen for Ctrl+C signal: {err}");
            }
        }
    });

    let printer = spawn_printer(events, verbosity, cli.measure);

    if cli.measure {
        let run = engine.start_measure_all(&targets).await;
        shutdown_handle.abort();
        drop(engine);
        printer.await.ok();

        let total = run?;
        println!("Total size: {}", format_bytes(total));
    } else {
        if verbosity.shows_progress() {
            println!("Cleaning {group_label} started...");
        }
        let run = engine.start_sweep(&group_label, &targets).await;
        shutdown_handle.abort();
        drop(engine);
        printer.await.ok();

        let result = run?;
        if result.cancelled {
            println!(
                "Cleaning {group_label} was cancelled. Reclaimed {} so far ({} deleted).",
                format_bytes(result.reclaimed),
                format_bytes(result.deleted_bytes),
            );
        } else {
            println!(
                "Cleaning {group_label} finished. Reclaimed {} ({} deleted).",
                format_bytes(result.reclaimed),
                format_bytes(result.deleted_bytes),
            );
        }
    }

    Ok(())
}

/// Drains the progress channel until every producer is gone.
///
/// In measure mode a spinner shows a running total instead of one line per
/// target; during a sweep, warnings and per-target sizes print at normal
/// verbosity and per-item deletions only with `--verbose`.
fn spawn_printer(
    mut events: Receiver<ProgressEvent>,
    verbosity: Verbosity,
    measure_mode: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = if measure_mode && verbosity.shows_progress() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message("Measuring configured folders.");
            spinner.enable_steady_tick(Duration::from_millis(100));
            Some(spinner)
        } else {
            None
        };

        let mut measured = 0u64;
        while let Some(event) = events.recv().await {
            match &event {
                ProgressEvent::Measured { bytes, .. } => {
                    measured += bytes;
                    if let Some(spinner) = &spinner {
                        spinner.set_message(format!("Measured {} so far", format_bytes(measured)));
                    } else if verbosity.shows_progress() {
                        println!("{event}");
                    }
                }
                ProgressEvent::Warning { .. } => {
                    if verbosity.shows_progress() {
                        match &spinner {
                            Some(spinner) => spinner.println(event.to_string()),
                            None => println!("{event}"),
                        }
                    }
                }
                ProgressEvent::DeletedFile { .. } | ProgressEvent::DeletedEmptyDir { .. } => {
                    if verbosity.shows_items() {
                        println!("{event}");
                    }
                }
            }
        }

        // close down the spinner and clear it from the screen
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
    })
}
