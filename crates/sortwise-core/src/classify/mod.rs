pub mod duplicates;
pub mod rules;
pub mod taxonomy;

use crate::config::{ClassifyOptions, TrustLevel};
use crate::error::Error;
use crate::model::{Classification, FileRecord};
use crate::progress::{CancelToken, Phase, ProgressEvent, ProgressReporter};
use rules::RuleTable;
use tracing::{debug, info};

const SCREENSHOT_MARKERS: &[&str] = &["screenshot", "screen shot", "screen_shot"];

/// Classified records plus the indices of those left for the remote
/// classifier.
#[derive(Debug, Default)]
pub struct ClassifyOutcome {
    pub records: Vec<FileRecord>,
    pub unresolved: Vec<usize>,
    pub duplicates: usize,
    pub cancelled: bool,
}

/// Local, deterministic classification pipeline.
pub struct Classifier {
    options: ClassifyOptions,
    rules: RuleTable,
}

impl Classifier {
    pub fn new(options: ClassifyOptions) -> Result<Self, Error> {
        let rules = RuleTable::from_config(&options.rules)?;
        Ok(Self { options, rules })
    }

    /// Whether weak fallbacks are reported as unresolved.
    pub fn with_remote_fallback(mut self, enabled: bool) -> Self {
        self.options.remote_fallback = enabled;
        self
    }

    /// Run the duplicate pre-pass over the complete record set, then
    /// classify each record in order. The pre-pass always finishes, so
    /// duplicates are quarantined even on cancellation; the remaining
    /// records stay `Unclassified`.
    pub fn classify(
        &self,
        mut records: Vec<FileRecord>,
        cancel: &CancelToken,
        reporter: &dyn ProgressReporter,
    ) -> ClassifyOutcome {
        let duplicates = duplicates::mark_duplicates(&mut records);
        debug!("Duplicate pre-pass marked {} records", duplicates);

        let total = records.len();
        let mut unresolved = Vec::new();
        let mut cancelled = false;

        for (index, record) in records.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                info!("Classification cancelled at {}/{}", index, total);
                cancelled = true;
                break;
            }

            let (classification, needs_remote) = self.classify_record(record);
            record.classification = classification;
            if needs_remote && self.options.remote_fallback {
                unresolved.push(index);
            }

            reporter.report(ProgressEvent::new(
                Phase::Classify,
                index + 1,
                total,
                record.name.clone(),
            ));
        }

        ClassifyOutcome {
            records,
            unresolved,
            duplicates,
            cancelled,
        }
    }

    /// First matching stage wins. The flag tells whether the result is a
    /// weak fallback the remote classifier may improve on.
    pub fn classify_record(&self, record: &FileRecord) -> (Classification, bool) {
        let year = record.year();

        if let Some(of) = &record.duplicate_of {
            return (Classification::Duplicate { of: of.clone() }, false);
        }

        if !record.keywords.is_empty() && self.options.trust_level == TrustLevel::Trust {
            let category = taxonomy::match_category(&record.keywords);
            let folder = category.unwrap_or(taxonomy::GENERAL_CATEGORY);
            return (
                Classification::Keywords {
                    destination: format!("Photos/{}/{}", folder, year),
                    category: category.map(str::to_string),
                    keywords: record.keywords.clone(),
                },
                false,
            );
        }

        if let Some(matched) = self.rules.find(record) {
            return (
                Classification::Rule {
                    destination: matched.destination,
                    rule: matched.rule,
                },
                false,
            );
        }

        if record.is_photo && self.options.photo_mode {
            let name = record.name.to_lowercase();
            if SCREENSHOT_MARKERS.iter().any(|m| name.contains(m)) {
                return (
                    Classification::Screenshot {
                        destination: format!("Photos/Screenshots/{}", year),
                    },
                    false,
                );
            }
            return (
                Classification::UncategorizedPhoto {
                    destination: format!("Photos/Uncategorized/{}", year),
                },
                true,
            );
        }

        (
            Classification::Fallback {
                destination: format!("Unsorted/{}", year),
            },
            true,
        )
    }
}
