use crate::config::ExecuteOptions;
use crate::error::Error;
use crate::plan::{MoveRecord, OrganizationPlan, PlanAction};
use crate::progress::{CancelToken, Phase, ProgressEvent, ProgressReporter};
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, trace};

/// Outcome of applying a plan. `errors` holds at most `error_cap` messages
/// plus a trailing "... and N more errors" note.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

struct ErrorLog {
    cap: usize,
    messages: Vec<String>,
    overflow: usize,
}

impl ErrorLog {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            messages: Vec::new(),
            overflow: 0,
        }
    }

    fn push(&mut self, message: String) {
        if self.messages.len() < self.cap {
            self.messages.push(message);
        } else {
            self.overflow += 1;
        }
    }

    fn finish(mut self) -> Vec<String> {
        if self.overflow > 0 {
            self.messages
                .push(format!("... and {} more errors", self.overflow));
        }
        self.messages
    }
}

/// Apply `plan` to the filesystem. The plan is validated first; after that
/// individual failures are recorded and the remaining moves still run.
/// Nothing is rolled back on cancellation.
pub fn execute(
    plan: &OrganizationPlan,
    options: &ExecuteOptions,
    cancel: &CancelToken,
    reporter: &dyn ProgressReporter,
) -> Result<ExecutionReport, Error> {
    plan.validate()?;

    let start = Instant::now();
    let target = plan.target_path();
    let mut errors = ErrorLog::new(options.error_cap);
    let mut report = ExecutionReport::default();

    info!(
        "Executing plan: {} {} files into {}",
        plan.action,
        plan.moves.len(),
        target.display()
    );

    if let Err(e) = fs::create_dir_all(&target) {
        errors.push(format!("Could not create {}: {}", target.display(), e));
    }
    for folder in &plan.folders {
        let dir = target.join(folder);
        if let Err(e) = fs::create_dir_all(&dir) {
            error!("Failed to create folder '{}': {}", dir.display(), e);
            errors.push(format!("Could not create {}: {}", dir.display(), e));
        }
    }

    let total = plan.moves.len();
    for (index, mv) in plan.moves.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("Execution cancelled after {}/{} files", index, total);
            report.cancelled = true;
            break;
        }

        match apply_move(mv, &target, plan.action) {
            Ok(placed) => {
                trace!("{} -> {}", mv.source, placed.display());
                report.succeeded += 1;
            }
            Err(e) => {
                error!("Failed to place '{}': {}", mv.source, e);
                errors.push(format!("{}: {}", mv.filename, e));
                report.failed += 1;
            }
        }

        reporter.report(ProgressEvent::new(
            Phase::Execute,
            index + 1,
            total,
            mv.filename.clone(),
        ));
    }

    report.errors = errors.finish();
    debug!("Execution took {:?}", start.elapsed());
    info!(
        "Plan executed: {} succeeded, {} failed",
        report.succeeded, report.failed
    );
    Ok(report)
}

fn apply_move(mv: &MoveRecord, target: &Path, action: PlanAction) -> io::Result<PathBuf> {
    let source = Path::new(&mv.source);
    let requested = target.join(&mv.destination);

    if let Some(parent) = requested.parent() {
        fs::create_dir_all(parent)?;
    }
    let destination = unique_destination(&requested);

    match action {
        PlanAction::Move => move_file(source, &destination)?,
        _ => copy_file(source, &destination)?,
    }
    Ok(destination)
}

/// First free path among `name.ext`, `name_1.ext`, `name_2.ext`, ...
pub fn unique_destination(path: &Path) -> PathBuf {
    if !occupied(path) {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1usize;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, extension));
        if !occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Copy contents and restore the source's access and modification times.
fn copy_file(source: &Path, destination: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    fs::copy(source, destination)?;
    filetime::set_file_times(
        destination,
        FileTime::from_last_access_time(&metadata),
        FileTime::from_last_modification_time(&metadata),
    )
}

fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            debug!(
                "Cross-device move for '{}', copying instead",
                source.display()
            );
            copy_file(source, destination)?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(e: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    e.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_e: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_destination_free_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        assert_eq!(unique_destination(&path), path);
    }

    #[test]
    fn test_unique_destination_counts_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("report.txt"), "a").unwrap();
        fs::write(dir.path().join("report_1.txt"), "b").unwrap();

        assert_eq!(
            unique_destination(&dir.path().join("report.txt")),
            dir.path().join("report_2.txt")
        );
    }

    #[test]
    fn test_unique_destination_without_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Makefile"), "all:").unwrap();
        assert_eq!(
            unique_destination(&dir.path().join("Makefile")),
            dir.path().join("Makefile_1")
        );
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("old.txt");
        let dst = dir.path().join("new.txt");
        fs::write(&src, "content").unwrap();
        let stamp = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, stamp).unwrap();

        copy_file(&src, &dst).unwrap();

        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), stamp);
        assert!(src.exists());
    }

    #[test]
    fn test_error_log_caps_messages() {
        let mut log = ErrorLog::new(2);
        for i in 0..5 {
            log.push(format!("e{}", i));
        }
        assert_eq!(log.finish(), vec!["e0", "e1", "... and 3 more errors"]);
    }
}
