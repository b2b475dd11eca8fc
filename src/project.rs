//! Runs the transformation over every source file of a project.
//!
//! Files are independent: each one is read, transformed and written on its own, in parallel, and a
//! failure in one file is recorded in its outcome without stopping the others.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    dialect::Dialect,
    engine::{EngineError, Transformer},
    searcher::{FileSearcher, Search, SearcherError, Target},
};

#[derive(Debug, Clone, Default)]
/// Raised to stop starting new files. Files already in flight finish.
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct ProjectOptions {
    pub root: PathBuf,
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Modified { removed: usize },
    Unchanged,
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Cannot collect source files: {0}")]
    Search(#[from] SearcherError),
}

#[derive(Debug, Error)]
enum FileError {
    #[error("cannot read file: {0}")]
    Read(#[source] std::io::Error),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("cannot write file: {0}")]
    Write(#[source] std::io::Error),
}

#[derive(Debug, Clone, Default)]
/// Outcomes of a run, ordered by path.
pub struct ProjectReport {
    pub outcomes: Vec<FileOutcome>,
    pub dry_run: bool,
}

impl ProjectReport {
    /// Number of files with at least one removed call.
    pub fn files_processed(&self) -> usize {
        self.modified().count()
    }

    pub fn calls_removed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|outcome| match outcome.status {
                FileStatus::Modified { removed } => removed,
                _ => 0,
            })
            .sum()
    }

    pub fn modified_files(&self) -> Vec<&Path> {
        self.modified().map(|outcome| outcome.path.as_path()).collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                FileStatus::Failed { reason } => Some((outcome.path.as_path(), reason.as_str())),
                _ => None,
            })
    }

    pub fn cancelled(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == FileStatus::Cancelled)
            .count()
    }

    fn modified(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, FileStatus::Modified { .. }))
    }
}

pub fn process_project(
    options: &ProjectOptions,
    cancel: &CancelFlag,
) -> Result<ProjectReport, ProjectError> {
    let config = &options.config;
    let files = FileSearcher::new(
        Target::Path(&options.root),
        &config.extensions,
        &config.exclude,
    )
    .search()?;
    debug!(files = files.len(), root = %options.root.display(), "collected source files");

    let transformer = Transformer::new(config.receiver.clone(), config.targets())
        .with_verification(config.verify_output);

    let mut outcomes: Vec<FileOutcome> = files
        .par_iter()
        .map(|path| process_file(path, &transformer, config.dry_run, cancel))
        .collect();
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(ProjectReport {
        outcomes,
        dry_run: config.dry_run,
    })
}

fn process_file(
    path: &Path,
    transformer: &Transformer,
    dry_run: bool,
    cancel: &CancelFlag,
) -> FileOutcome {
    if cancel.is_cancelled() {
        return FileOutcome {
            path: path.to_path_buf(),
            status: FileStatus::Cancelled,
        };
    }

    let status = match transform_file(path, transformer, dry_run) {
        Ok(0) => FileStatus::Unchanged,
        Ok(removed) => FileStatus::Modified { removed },
        Err(err) => {
            warn!(path = %path.display(), "skipped: {err}");
            FileStatus::Failed {
                reason: err.to_string(),
            }
        }
    };
    FileOutcome {
        path: path.to_path_buf(),
        status,
    }
}

/// Returns the number of removed calls.
fn transform_file(path: &Path, transformer: &Transformer, dry_run: bool) -> Result<usize, FileError> {
    let text = std::fs::read_to_string(path).map_err(FileError::Read)?;
    let result = transformer.transform(&text, Dialect::from_path(path))?;
    if !result.modified {
        return Ok(0);
    }
    if !dry_run {
        std::fs::write(path, &result.output).map_err(FileError::Write)?;
    }
    info!(path = %path.display(), removed = result.removed_count, dry_run, "transformed");
    Ok(result.removed_count)
}
