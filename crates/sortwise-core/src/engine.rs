use crate::classify::Classifier;
use crate::config::AppConfig;
use crate::error::Error;
use crate::executor::{self, ExecutionReport};
use crate::metadata::{self, MetadataProvider};
use crate::model::FileRecord;
use crate::plan::{self, OrganizationPlan, PlanAction};
use crate::progress::{CancelToken, ProgressReporter};
use crate::remote::{ClassificationService, RemoteClassifier, RemoteOutcome};
use crate::scanner;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Runs Scanner → Classifier (→ RemoteClassifier) → PlanBuilder → Executor.
///
/// External capabilities (metadata tool, remote service) are resolved once
/// at construction and reused by every run. Cancellation belongs to a run:
/// pass a `CancelToken` to [`OrganizeEngine::analyze_with_cancel`] or
/// [`OrganizeEngine::execute_with_cancel`] and keep a clone to stop it from
/// another thread.
pub struct OrganizeEngine {
    config: AppConfig,
    metadata: Box<dyn MetadataProvider>,
    classifier: Classifier,
    remote: Option<RemoteClassifier>,
}

/// Everything one analysis run produced.
#[derive(Debug)]
pub struct Analysis {
    pub source_root: PathBuf,
    pub records: Vec<FileRecord>,
    pub skipped_files: usize,
    pub unreadable_dirs: usize,
    pub hit_max_files: bool,
    pub duplicates: usize,
    /// `None` when no remote pass ran.
    pub remote: Option<RemoteOutcome>,
    pub cancelled: bool,
    pub scan_duration: Duration,
    pub classify_duration: Duration,
    pub remote_duration: Duration,
}

impl OrganizeEngine {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let metadata = metadata::resolve_provider(config.scan.read_metadata, &config.metadata);
        let remote = if config.remote.enabled {
            Some(RemoteClassifier::new(config.remote.clone())?)
        } else {
            None
        };
        let classifier = Classifier::new(config.classify.clone())?
            .with_remote_fallback(config.classify.remote_fallback || remote.is_some());

        Ok(Self {
            config,
            metadata,
            classifier,
            remote,
        })
    }

    pub fn with_metadata_provider(mut self, provider: Box<dyn MetadataProvider>) -> Self {
        self.metadata = provider;
        self
    }

    /// Route remote classification through `service`, enabling the remote
    /// pass regardless of configuration.
    pub fn with_remote_service(mut self, service: Box<dyn ClassificationService>) -> Self {
        self.remote = Some(RemoteClassifier::with_service(
            self.config.remote.clone(),
            service,
        ));
        self.classifier = self.classifier.with_remote_fallback(true);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metadata_provider_name(&self) -> &'static str {
        self.metadata.name()
    }

    /// Scan and classify `source` without a way to stop the run.
    pub fn analyze(&self, source: &Path, reporter: &dyn ProgressReporter) -> Result<Analysis, Error> {
        self.analyze_with_cancel(source, &CancelToken::new(), reporter)
    }

    /// Scan and classify `source`. Stops after the phase in which `cancel`
    /// was observed.
    pub fn analyze_with_cancel(
        &self,
        source: &Path,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<Analysis, Error> {
        info!("Scanning {}...", source.display());
        let scan_start = Instant::now();
        let scan = scanner::scan_tree(
            source,
            &self.config.scan,
            self.metadata.as_ref(),
            cancel,
            reporter,
        )?;
        let scan_duration = scan_start.elapsed();
        debug!(
            "Scan completed in {:.2}s: {} files, {} skipped, {} unreadable directories",
            scan_duration.as_secs_f64(),
            scan.records.len(),
            scan.skipped_files,
            scan.unreadable_dirs,
        );

        let mut analysis = Analysis {
            source_root: scan.root,
            records: scan.records,
            skipped_files: scan.skipped_files,
            unreadable_dirs: scan.unreadable_dirs,
            hit_max_files: scan.hit_max_files,
            duplicates: 0,
            remote: None,
            cancelled: scan.cancelled,
            scan_duration,
            classify_duration: Duration::ZERO,
            remote_duration: Duration::ZERO,
        };
        if analysis.cancelled {
            return Ok(analysis);
        }

        info!("Classifying {} files...", analysis.records.len());
        let classify_start = Instant::now();
        let records = std::mem::take(&mut analysis.records);
        let outcome = self.classifier.classify(records, cancel, reporter);
        analysis.classify_duration = classify_start.elapsed();
        analysis.records = outcome.records;
        analysis.duplicates = outcome.duplicates;
        analysis.cancelled = outcome.cancelled;
        debug!(
            "Classification completed in {:.2}s: {} duplicates, {} unresolved",
            analysis.classify_duration.as_secs_f64(),
            outcome.duplicates,
            outcome.unresolved.len(),
        );
        if analysis.cancelled {
            return Ok(analysis);
        }

        if let Some(remote) = &self.remote {
            if !outcome.unresolved.is_empty() {
                info!(
                    "Asking remote classifier about {} files...",
                    outcome.unresolved.len()
                );
                let remote_start = Instant::now();
                let result = remote.classify_unresolved(
                    &mut analysis.records,
                    &outcome.unresolved,
                    cancel,
                    reporter,
                );
                analysis.remote_duration = remote_start.elapsed();
                debug!(
                    "Remote pass completed in {:.2}s: {} classified, {} failed batches",
                    analysis.remote_duration.as_secs_f64(),
                    result.classified,
                    result.failed_batches,
                );
                analysis.cancelled = result.cancelled;
                analysis.remote = Some(result);
            }
        }

        Ok(analysis)
    }

    pub fn build_plan(
        &self,
        analysis: &Analysis,
        target_root: Option<&Path>,
        action: PlanAction,
    ) -> OrganizationPlan {
        plan::build_plan(&analysis.records, &analysis.source_root, target_root, action)
    }

    pub fn execute(
        &self,
        plan: &OrganizationPlan,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport, Error> {
        self.execute_with_cancel(plan, &CancelToken::new(), reporter)
    }

    pub fn execute_with_cancel(
        &self,
        plan: &OrganizationPlan,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExecutionReport, Error> {
        executor::execute(plan, &self.config.execute, cancel, reporter)
    }
}
