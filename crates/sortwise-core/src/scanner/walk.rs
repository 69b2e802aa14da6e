use crate::config::ScanOptions;
use crate::error::Error;
use crate::hasher::fingerprint_file;
use crate::metadata::MetadataProvider;
use crate::model::FileRecord;
use crate::progress::{CancelToken, Phase, ProgressEvent, ProgressReporter};
use chrono::{DateTime, Local};
use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Records collected by one walk plus what was skipped along the way.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub root: PathBuf,
    pub records: Vec<FileRecord>,
    /// Files dropped because of a per-file error.
    pub skipped_files: usize,
    /// Directories whose contents could not be listed.
    pub unreadable_dirs: usize,
    pub hit_max_files: bool,
    pub cancelled: bool,
}

/// Make sure the source root is usable before any work starts.
pub fn validate_root(root: &Path) -> Result<PathBuf, Error> {
    if !root.exists() {
        return Err(Error::SourceNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    Ok(fs::canonicalize(root)?)
}

/// Depth-first walk of `root`, building one `FileRecord` per eligible file.
///
/// Hidden entries (leading `.`) and entries matching an ignore glob are
/// skipped, directories together with their subtree. Unreadable directories
/// and unreadable files are logged and skipped. Stops early at
/// `max_files` or when `cancel` is set; whatever was collected is returned.
pub fn scan_tree(
    root: &Path,
    options: &ScanOptions,
    metadata: &dyn MetadataProvider,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> Result<ScanOutcome, Error> {
    let root = validate_root(root)?;

    let ignore_patterns: Vec<Pattern> = options
        .ignore_patterns
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let mut walker = WalkDir::new(&root).min_depth(1).follow_links(false);
    if !options.include_subfolders {
        walker = walker.max_depth(1);
    }
    if options.stable_order {
        walker = walker.sort_by_file_name();
    }

    let mut outcome = ScanOutcome {
        root: root.clone(),
        ..ScanOutcome::default()
    };

    let entries = walker
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_skip(entry, &ignore_patterns));

    for entry_result in entries {
        if cancel.is_cancelled() {
            debug!("Scan cancelled after {} files", outcome.records.len());
            outcome.cancelled = true;
            break;
        }
        if outcome.records.len() >= options.max_files {
            debug!("Scan reached max_files limit ({})", options.max_files);
            outcome.hit_max_files = true;
            break;
        }

        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                // Without link following, walk errors come from listing a
                // directory; only a path that is still a file counts as one.
                let is_dir = err.path().map(|p| !p.is_file()).unwrap_or(false);
                if is_dir {
                    warn!("Skipping unreadable directory: {}", err);
                    outcome.unreadable_dirs += 1;
                } else {
                    warn!("Skipping unreadable entry: {}", err);
                    outcome.skipped_files += 1;
                }
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match build_record(entry.path(), options, metadata) {
            Ok(record) => {
                trace!("Scanned {}", record.path.display());
                let name = record.name.clone();
                outcome.records.push(record);
                reporter.report(ProgressEvent::new(
                    Phase::Scan,
                    outcome.records.len(),
                    options.max_files,
                    name,
                ));
            }
            Err(err) => {
                warn!("Skipping file {}: {}", entry.path().display(), err);
                outcome.skipped_files += 1;
            }
        }
    }

    Ok(outcome)
}

fn should_skip(entry: &DirEntry, ignore_patterns: &[Pattern]) -> bool {
    let hidden = entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false);

    hidden
        || ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(entry.path()))
}

fn build_record(
    path: &Path,
    options: &ScanOptions,
    metadata: &dyn MetadataProvider,
) -> io::Result<FileRecord> {
    let stat = fs::metadata(path)?;
    let modified: DateTime<Local> = stat.modified()?.into();
    let mut record = FileRecord::new(path.to_path_buf(), stat.len(), modified);

    if options.detect_duplicates {
        record.fingerprint = Some(fingerprint_file(path)?);
    }

    if options.read_metadata {
        match metadata.read(path, options.metadata_timeout()) {
            Ok(meta) => {
                record.keywords = meta.keywords;
                record.description = meta.description;
            }
            Err(e) => {
                debug!("No metadata for {}: {}", path.display(), e);
            }
        }
    }

    Ok(record)
}
