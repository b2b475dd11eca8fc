mod command;

use std::{env::current_dir, path::Path};

use clap::Parser;
use command::Args;
use consolex::{
    config::Config,
    project::{process_project, CancelFlag, FileStatus, ProjectOptions, ProjectReport},
};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let root = match &args.path {
        Some(path) => path.clone(),
        None => current_dir()?,
    };
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(&root)?,
    };
    let config = args.apply(config);

    println!("Starting console removal...");
    println!("Path: {}", root.display());
    println!("Types: {}", config.types.join(", "));
    println!("Extensions: {}", config.extensions.join(", "));
    println!("Dry run: {}", if config.dry_run { "Yes" } else { "No" });
    println!();

    let options = ProjectOptions {
        root: root.clone(),
        config,
    };
    let report = process_project(&options, &CancelFlag::default())?;
    print_report(&root, &report);

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_report(root: &Path, report: &ProjectReport) {
    for outcome in &report.outcomes {
        let rel = outcome.path.strip_prefix(root).unwrap_or(&outcome.path);
        match &outcome.status {
            FileStatus::Modified { removed } if report.dry_run => println!(
                "[DRY RUN] {}: {removed} console statements would be removed",
                rel.display()
            ),
            FileStatus::Modified { removed } => {
                println!("✓ {}: {removed} console statements removed", rel.display())
            }
            FileStatus::Failed { reason } => {
                println!("Skipped {}: {reason}", outcome.path.display())
            }
            FileStatus::Unchanged | FileStatus::Cancelled => {}
        }
    }

    if report.files_processed() == 0 {
        println!("No files found to process");
        return;
    }
    println!("Processed {} files", report.files_processed());
    println!("Removed {} console statements", report.calls_removed());
    if report.dry_run {
        println!(
            "\nDry run completed. Use without --dry-run to actually remove console statements."
        );
    }
}
