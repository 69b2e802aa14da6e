use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;
use tempfile::tempdir;

use sortwise_core::metadata::{FileMetadata, MetadataError, MetadataProvider};
use sortwise_core::{
    AppConfig, CancelToken, ClassificationSource, Confidence, Error, OrganizeEngine, Phase,
    PlanAction, ProgressEvent, ProgressReporter, SilentReporter,
};

fn local_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.scan.read_metadata = false;
    config.scan.stable_order = true;
    config
}

fn set_year(path: &Path, year: i32) {
    let date = chrono::NaiveDate::from_ymd_opt(year, 6, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let stamp = filetime::FileTime::from_unix_time(date.and_utc().timestamp(), 0);
    filetime::set_file_mtime(path, stamp).unwrap();
}

/// Hands out fixed keywords for files whose name starts with `tagged`.
struct TaggedMetadata;

impl MetadataProvider for TaggedMetadata {
    fn read(&self, path: &Path, _timeout: Duration) -> Result<FileMetadata, MetadataError> {
        let name = path.file_name().unwrap().to_string_lossy();
        if name.starts_with("tagged") {
            Ok(FileMetadata {
                keywords: vec!["Bald Eagle".to_string(), "sky".to_string()],
                description: "Eagle in flight".to_string(),
            })
        } else {
            Ok(FileMetadata::default())
        }
    }

    fn name(&self) -> &'static str {
        "tagged"
    }
}

#[test]
fn test_identical_photos_flag_second_as_duplicate() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("photos");
    fs::create_dir_all(&root).unwrap();
    let bytes: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(root.join("photo1.jpg"), &bytes).unwrap();
    fs::write(root.join("photo1_copy.jpg"), &bytes).unwrap();

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();

    assert_eq!(analysis.records.len(), 2);
    assert_eq!(analysis.duplicates, 1);

    let original = analysis
        .records
        .iter()
        .find(|r| r.name == "photo1.jpg")
        .unwrap();
    let copy = analysis
        .records
        .iter()
        .find(|r| r.name == "photo1_copy.jpg")
        .unwrap();

    assert!(!original.is_duplicate());
    assert!(copy.is_duplicate());
    assert_eq!(copy.destination(), "_Duplicates");
    assert_eq!(copy.classification.confidence(), Confidence::High);
    assert_eq!(copy.classification.source(), ClassificationSource::Hash);
    assert_eq!(
        copy.duplicate_of.as_deref(),
        Some(original.path.to_string_lossy().as_ref())
    );
}

#[test]
fn test_pdf_from_2023_goes_to_dated_folder() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("inbox");
    fs::create_dir_all(&root).unwrap();
    let pdf = root.join("invoice.pdf");
    fs::write(&pdf, "%PDF-1.4 test").unwrap();
    set_year(&pdf, 2023);

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();

    assert_eq!(analysis.records.len(), 1);
    let record = &analysis.records[0];
    assert_eq!(record.destination(), "Documents/PDF/2023");
    assert_eq!(record.classification.confidence(), Confidence::High);
    assert_eq!(record.classification.source(), ClassificationSource::Rule);
}

#[test]
fn test_embedded_keywords_pick_photo_category() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("shoot");
    fs::create_dir_all(&root).unwrap();
    let tagged = root.join("tagged_001.jpg");
    fs::write(&tagged, "raw bytes a").unwrap();
    set_year(&tagged, 2022);
    fs::write(root.join("plain.jpg"), "raw bytes b").unwrap();

    let mut config = local_config();
    config.scan.read_metadata = true;
    let engine = OrganizeEngine::new(config)
        .unwrap()
        .with_metadata_provider(Box::new(TaggedMetadata));
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();

    let record = analysis
        .records
        .iter()
        .find(|r| r.name == "tagged_001.jpg")
        .unwrap();
    assert_eq!(record.destination(), "Photos/Wildlife/2022");
    assert_eq!(record.description, "Eagle in flight");
    assert_eq!(record.classification.source(), ClassificationSource::Keywords);
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("mixed");
    let locked = root.join("locked");
    fs::create_dir_all(&locked).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("b.txt"), "b").unwrap();
    fs::write(root.join("c.txt"), "c").unwrap();
    fs::write(locked.join("secret.txt"), "s").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Running as root ignores permission bits. The listing failure itself is
    // covered by the scanner's unit tests.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        eprintln!("skipping: permission bits are not enforced for this user");
        return;
    }

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let result = engine.analyze(&root, &SilentReporter);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let analysis = result.unwrap();
    assert_eq!(analysis.records.len(), 3);
    assert_eq!(analysis.unreadable_dirs, 1);
}

#[test]
fn test_hidden_and_ignored_entries_are_skipped() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tree");
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("build")).unwrap();
    fs::write(root.join(".DS_Store"), "x").unwrap();
    fs::write(root.join(".git").join("HEAD"), "ref").unwrap();
    fs::write(root.join("build").join("out.o"), "obj").unwrap();
    fs::write(root.join("debug.log"), "log").unwrap();
    fs::write(root.join("notes.md"), "# notes").unwrap();

    let mut config = local_config();
    config.scan.ignore_patterns = vec!["*.log".to_string(), "*/build".to_string()];
    let engine = OrganizeEngine::new(config).unwrap();
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();

    let names: Vec<&str> = analysis.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["notes.md"]);
}

#[test]
fn test_subfolders_can_be_excluded() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("flat");
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(root.join("top.txt"), "t").unwrap();
    fs::write(root.join("nested").join("deep.txt"), "d").unwrap();

    let mut config = local_config();
    config.scan.include_subfolders = false;
    let engine = OrganizeEngine::new(config).unwrap();
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();

    assert_eq!(analysis.records.len(), 1);
    assert_eq!(analysis.records[0].name, "top.txt");
}

#[test]
fn test_max_files_stops_scan() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("many");
    fs::create_dir_all(&root).unwrap();
    for i in 0..10 {
        fs::write(root.join(format!("f{:02}.txt", i)), format!("{}", i)).unwrap();
    }

    let mut config = local_config();
    config.scan.max_files = 4;
    let engine = OrganizeEngine::new(config).unwrap();
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();

    assert_eq!(analysis.records.len(), 4);
    assert!(analysis.hit_max_files);
}

#[test]
fn test_missing_source_is_rejected() {
    let tmp = tempdir().unwrap();
    let engine = OrganizeEngine::new(local_config()).unwrap();

    let missing = engine.analyze(&tmp.path().join("nope"), &SilentReporter);
    assert!(matches!(missing, Err(Error::SourceNotFound(_))));

    let file = tmp.path().join("file.txt");
    fs::write(&file, "x").unwrap();
    let not_dir = engine.analyze(&file, &SilentReporter);
    assert!(matches!(not_dir, Err(Error::NotADirectory(_))));
}

#[test]
fn test_cancelled_run_returns_partial_analysis() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("src");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let analysis = engine
        .analyze_with_cancel(&root, &cancel, &SilentReporter)
        .unwrap();

    assert!(analysis.cancelled);
    assert!(analysis.records.is_empty());
}

#[test]
fn test_engine_runs_again_after_a_cancelled_run() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("src");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("b.txt"), "b").unwrap();

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let first = engine
        .analyze_with_cancel(&root, &cancel, &SilentReporter)
        .unwrap();
    assert!(first.cancelled);

    let second = engine.analyze(&root, &SilentReporter).unwrap();
    assert!(!second.cancelled);
    assert_eq!(second.records.len(), 2);

    let target = tmp.path().join("out");
    let plan = engine.build_plan(&second, Some(&target), PlanAction::Copy);
    let report = engine.execute(&plan, &SilentReporter).unwrap();
    assert!(!report.cancelled);
    assert_eq!(report.succeeded, 2);
}

/// Stops the run as soon as classification starts.
struct CancelOnClassify {
    cancel: CancelToken,
}

impl ProgressReporter for CancelOnClassify {
    fn report(&self, event: ProgressEvent) {
        if event.phase == Phase::Classify {
            self.cancel.cancel();
        }
    }
}

#[test]
fn test_duplicates_stay_quarantined_when_classification_is_cancelled() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("photos");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.jpg"), "same bytes").unwrap();
    fs::write(root.join("b.jpg"), "same bytes").unwrap();

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let cancel = CancelToken::new();
    let reporter = CancelOnClassify {
        cancel: cancel.clone(),
    };
    let analysis = engine.analyze_with_cancel(&root, &cancel, &reporter).unwrap();
    assert!(analysis.cancelled);
    assert_eq!(analysis.duplicates, 1);

    let plan = engine.build_plan(&analysis, None, PlanAction::Copy);
    let copy = plan.moves.iter().find(|m| m.filename == "b.jpg").unwrap();
    assert!(copy.is_duplicate);
    assert_eq!(copy.destination, "_Duplicates/b.jpg");
    assert_eq!(copy.classification_source, ClassificationSource::Hash);
}

#[test]
fn test_progress_events_flow_through_channel() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("src");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.txt"), "a").unwrap();
    fs::write(root.join("b.txt"), "b").unwrap();

    let (tx, rx) = mpsc::channel();
    let engine = OrganizeEngine::new(local_config()).unwrap();
    engine.analyze(&root, &tx).unwrap();
    drop(tx);

    let events: Vec<_> = rx.iter().collect();
    assert_eq!(events.iter().filter(|e| e.phase == Phase::Scan).count(), 2);
    let classify: Vec<_> = events.iter().filter(|e| e.phase == Phase::Classify).collect();
    assert_eq!(classify.len(), 2);
    assert_eq!(classify[1].current, 2);
    assert_eq!(classify[1].total, 2);
}

#[test]
fn test_full_organize_copy_run() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("Downloads");
    fs::create_dir_all(&root).unwrap();
    let pdf = root.join("statement.pdf");
    fs::write(&pdf, "pdf").unwrap();
    set_year(&pdf, 2021);
    fs::write(root.join("song.mp3"), "mp3").unwrap();
    fs::write(root.join("mystery.qqq"), "???").unwrap();

    let engine = OrganizeEngine::new(local_config()).unwrap();
    let analysis = engine.analyze(&root, &SilentReporter).unwrap();
    let plan = engine.build_plan(&analysis, None, PlanAction::Copy);

    let target = analysis.source_root.with_file_name("Downloads_Organized");
    assert_eq!(plan.target_root, target.to_string_lossy());

    let report = engine.execute(&plan, &SilentReporter).unwrap();
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert!(target.join("Documents/PDF/2021/statement.pdf").is_file());
    let mystery = analysis
        .records
        .iter()
        .find(|r| r.name == "mystery.qqq")
        .unwrap();
    assert!(mystery.destination().starts_with("Unsorted/"));
    assert!(target.join(mystery.destination()).join("mystery.qqq").is_file());
    // Copy leaves the sources in place.
    assert!(pdf.is_file());
}
