//! Batch classification of unresolved records by an external chat
//! completion service.
//!
//! Any failure leaves the local fallback classification of the affected
//! records untouched; the run never aborts because of the remote side.

pub mod client;
pub mod parse;
pub mod prompt;

pub use client::{normalize_endpoint, probe, ClassificationService, HttpService};
pub use parse::{parse_verdicts, ParseError, RemoteVerdict};

use crate::config::RemoteOptions;
use crate::model::{Classification, FileRecord};
use crate::progress::{CancelToken, Phase, ProgressEvent, ProgressReporter};
use ahash::AHashMap;
use prompt::BatchItem;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response contained no message content")]
    EmptyResponse,

    #[error("Could not build request: {0}")]
    Request(#[from] serde_json::Error),

    #[error("Unusable response: {0}")]
    Parse(#[from] ParseError),

    #[error("No classification server reachable at {0}")]
    Unreachable(String),
}

/// Totals for one remote pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoteOutcome {
    pub batches: usize,
    pub failed_batches: usize,
    /// Records whose classification was replaced by a remote verdict.
    pub classified: usize,
    /// Entries in replies dropped as malformed or naming unknown files.
    pub rejected: usize,
    pub cancelled: bool,
}

pub struct RemoteClassifier {
    service: Box<dyn ClassificationService>,
    options: RemoteOptions,
    preference: String,
}

impl RemoteClassifier {
    pub fn new(options: RemoteOptions) -> Result<Self, RemoteError> {
        let service = HttpService::new(&options.endpoint, options.timeout())?;
        Ok(Self::with_service(options, Box::new(service)))
    }

    pub fn with_service(options: RemoteOptions, service: Box<dyn ClassificationService>) -> Self {
        let preference = options.effective_preference();
        Self {
            service,
            options,
            preference,
        }
    }

    /// Classify `records[i]` for every `i` in `unresolved`, in batches of at
    /// most the configured size. Cancellation is honoured between batches.
    pub fn classify_unresolved(
        &self,
        records: &mut [FileRecord],
        unresolved: &[usize],
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> RemoteOutcome {
        let mut outcome = RemoteOutcome::default();
        let total = unresolved.len();
        let mut done = 0;

        info!(
            "Sending {} files to {} in batches of {}",
            total,
            self.options.endpoint,
            self.options.batch_size()
        );

        for batch in unresolved.chunks(self.options.batch_size()) {
            if cancel.is_cancelled() {
                info!("Remote classification cancelled after {} batches", outcome.batches);
                outcome.cancelled = true;
                break;
            }

            outcome.batches += 1;
            match self.classify_batch(records, batch) {
                Ok((classified, rejected)) => {
                    outcome.classified += classified;
                    outcome.rejected += rejected;
                }
                Err(e) => {
                    warn!(
                        "Batch {} ({} files) failed, keeping local results: {}",
                        outcome.batches,
                        batch.len(),
                        e
                    );
                    outcome.failed_batches += 1;
                }
            }

            done += batch.len();
            let last = batch
                .last()
                .and_then(|&i| records.get(i))
                .map(|r| r.name.clone())
                .unwrap_or_default();
            reporter.report(ProgressEvent::new(Phase::Remote, done, total, last));
        }

        outcome
    }

    /// Send one batch and merge the reply. Returns `(classified, rejected)`.
    /// Records the reply omits keep their current classification.
    pub fn classify_batch(
        &self,
        records: &mut [FileRecord],
        batch: &[usize],
    ) -> Result<(usize, usize), RemoteError> {
        let items: Vec<BatchItem> = batch
            .iter()
            .filter_map(|&i| records.get(i))
            .map(BatchItem::from)
            .collect();

        let request = prompt::build_request(
            &self.options.model,
            &self.preference,
            &items,
            self.options.temperature,
            self.options.max_tokens,
        )?;

        let content = self.service.complete(&request)?;
        let reply = parse_verdicts(&content)?;

        let mut by_name: AHashMap<&str, &RemoteVerdict> = AHashMap::new();
        for verdict in &reply.verdicts {
            by_name.entry(verdict.filename.as_str()).or_insert(verdict);
        }

        let mut classified = 0;
        let mut matched = 0;
        for &index in batch {
            let Some(record) = records.get_mut(index) else {
                continue;
            };
            if let Some(verdict) = by_name.get(record.name.as_str()) {
                record.classification = Classification::Remote {
                    destination: verdict.destination.clone(),
                    confidence: verdict.confidence,
                    reasoning: verdict.reasoning.clone(),
                };
                classified += 1;
            }
        }
        for verdict in &reply.verdicts {
            if batch
                .iter()
                .filter_map(|&i| records.get(i))
                .any(|r| r.name == verdict.filename)
            {
                matched += 1;
            }
        }

        let unknown = reply.verdicts.len() - matched;
        if classified < batch.len() {
            debug!(
                "Reply covered {}/{} files; the rest keep local results",
                classified,
                batch.len()
            );
        }

        Ok((classified, reply.rejected + unknown))
    }
}
