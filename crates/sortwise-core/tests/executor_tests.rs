use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use chrono::Local;
use sortwise_core::config::ExecuteOptions;
use sortwise_core::executor::execute;
use sortwise_core::model::{Classification, FileRecord};
use sortwise_core::plan::{build_plan, OrganizationPlan, PlanAction};
use sortwise_core::{CancelToken, Error, SilentReporter};

fn record(path: &Path, destination: &str) -> FileRecord {
    let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let mut record = FileRecord::new(path.to_path_buf(), size, Local::now());
    record.classification = Classification::Rule {
        destination: destination.to_string(),
        rule: "Test".to_string(),
    };
    record
}

fn plan_for(records: &[FileRecord], source: &Path, target: &Path, action: PlanAction) -> OrganizationPlan {
    build_plan(records, source, Some(target), action)
}

fn run(plan: &OrganizationPlan) -> sortwise_core::ExecutionReport {
    execute(plan, &ExecuteOptions::default(), &CancelToken::new(), &SilentReporter).unwrap()
}

#[test]
fn test_existing_file_is_not_overwritten() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(target.join("Docs")).unwrap();
    fs::write(source.join("report.txt"), "new").unwrap();
    fs::write(target.join("Docs/report.txt"), "original").unwrap();

    let records = vec![record(&source.join("report.txt"), "Docs")];
    let report = run(&plan_for(&records, &source, &target, PlanAction::Copy));

    assert_eq!(report.succeeded, 1);
    assert_eq!(fs::read_to_string(target.join("Docs/report.txt")).unwrap(), "original");
    assert_eq!(fs::read_to_string(target.join("Docs/report_1.txt")).unwrap(), "new");
    assert!(source.join("report.txt").exists());
}

#[test]
fn test_two_sources_same_destination() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(source.join("a")).unwrap();
    fs::create_dir_all(source.join("b")).unwrap();
    fs::write(source.join("a/notes.md"), "from a").unwrap();
    fs::write(source.join("b/notes.md"), "from b").unwrap();

    let records = vec![
        record(&source.join("a/notes.md"), "Documents/Text"),
        record(&source.join("b/notes.md"), "Documents/Text"),
    ];
    let report = run(&plan_for(&records, &source, &target, PlanAction::Copy));

    assert_eq!(report.succeeded, 2);
    let dir = target.join("Documents/Text");
    assert_eq!(fs::read_to_string(dir.join("notes.md")).unwrap(), "from a");
    assert_eq!(fs::read_to_string(dir.join("notes_1.md")).unwrap(), "from b");
}

#[test]
fn test_move_removes_source() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("clip.mp4"), "video").unwrap();

    let records = vec![record(&source.join("clip.mp4"), "Videos/2024")];
    let report = run(&plan_for(&records, &source, &target, PlanAction::Move));

    assert_eq!(report.succeeded, 1);
    assert!(!source.join("clip.mp4").exists());
    assert!(target.join("Videos/2024/clip.mp4").is_file());
}

#[test]
fn test_failure_does_not_stop_batch() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("here.txt"), "here").unwrap();

    let records = vec![
        record(&source.join("gone.txt"), "Docs"),
        record(&source.join("here.txt"), "Docs"),
    ];
    let report = run(&plan_for(&records, &source, &target, PlanAction::Copy));

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("gone.txt:"));
    assert!(target.join("Docs/here.txt").is_file());
}

#[test]
fn test_error_list_is_capped() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");

    let records: Vec<FileRecord> = (0..5)
        .map(|i| record(&source.join(format!("missing{}.txt", i)), "Docs"))
        .collect();
    let plan = plan_for(&records, &source, &target, PlanAction::Copy);
    let report = execute(
        &plan,
        &ExecuteOptions { error_cap: 2 },
        &CancelToken::new(),
        &SilentReporter,
    )
    .unwrap();

    assert_eq!(report.failed, 5);
    assert_eq!(report.errors.len(), 3);
    assert_eq!(report.errors[2], "... and 3 more errors");
}

#[test]
fn test_invalid_plan_touches_nothing() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    let mut plan = plan_for(
        &[record(&source.join("a.txt"), "Docs")],
        &source,
        &target,
        PlanAction::Copy,
    );
    plan.moves[0].destination = "../../escape.txt".to_string();

    let result = execute(&plan, &ExecuteOptions::default(), &CancelToken::new(), &SilentReporter);
    assert!(matches!(result, Err(Error::InvalidPlan(_))));
    assert!(!target.exists());
}

#[test]
fn test_cancel_before_start_places_nothing() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    let plan = plan_for(
        &[record(&source.join("a.txt"), "Docs")],
        &source,
        &target,
        PlanAction::Copy,
    );
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = execute(&plan, &ExecuteOptions::default(), &cancel, &SilentReporter).unwrap();

    assert!(report.cancelled);
    assert_eq!(report.succeeded, 0);
    assert!(!target.join("Docs/a.txt").exists());
}

#[test]
fn test_plan_loaded_from_disk_executes() {
    let tmp = tempdir().unwrap();
    let source = tmp.path().join("in");
    let target = tmp.path().join("out");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("a.txt"), "a").unwrap();

    let plan = plan_for(
        &[record(&source.join("a.txt"), "Docs")],
        &source,
        &target,
        PlanAction::Copy,
    );
    let plan_path: PathBuf = tmp.path().join("plan.json");
    sortwise_core::plan::write_plan(&plan, sortwise_core::ExportFormat::Json, &plan_path).unwrap();

    let loaded = sortwise_core::plan::load_plan(&plan_path).unwrap();
    let report = run(&loaded);
    assert_eq!(report.succeeded, 1);
    assert!(target.join("Docs/a.txt").is_file());
}
