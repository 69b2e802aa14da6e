use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Fixed destination bucket for detected duplicates.
pub const DUPLICATES_FOLDER: &str = "_Duplicates";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }

    /// Lenient parse used for remote responses.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline stage produced a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Keywords,
    Rule,
    PhotoHeuristic,
    RemoteModel,
    Hash,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Keywords => "keywords",
            ClassificationSource::Rule => "rule",
            ClassificationSource::PhotoHeuristic => "photo_heuristic",
            ClassificationSource::RemoteModel => "remote_model",
            ClassificationSource::Hash => "hash",
        }
    }
}

impl fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one file. Destination, confidence, source and
/// reasoning are all derived from the variant so they cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Classification {
    #[default]
    Unclassified,
    /// `of` is the canonical record's path.
    Duplicate { of: String },
    /// `category` is `None` when keywords exist but match no taxonomy entry.
    Keywords {
        destination: String,
        category: Option<String>,
        keywords: Vec<String>,
    },
    Rule { destination: String, rule: String },
    Screenshot { destination: String },
    UncategorizedPhoto { destination: String },
    Fallback { destination: String },
    Remote {
        destination: String,
        confidence: Confidence,
        reasoning: String,
    },
}

impl Classification {
    pub fn destination(&self) -> &str {
        match self {
            Classification::Unclassified => "",
            Classification::Duplicate { .. } => DUPLICATES_FOLDER,
            Classification::Keywords { destination, .. }
            | Classification::Rule { destination, .. }
            | Classification::Screenshot { destination }
            | Classification::UncategorizedPhoto { destination }
            | Classification::Fallback { destination }
            | Classification::Remote { destination, .. } => destination,
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            Classification::Duplicate { .. }
            | Classification::Rule { .. }
            | Classification::Screenshot { .. } => Confidence::High,
            Classification::Keywords { category, .. } => match category {
                Some(_) => Confidence::High,
                None => Confidence::Medium,
            },
            Classification::Unclassified
            | Classification::UncategorizedPhoto { .. }
            | Classification::Fallback { .. } => Confidence::Low,
            Classification::Remote { confidence, .. } => *confidence,
        }
    }

    pub fn source(&self) -> ClassificationSource {
        match self {
            Classification::Duplicate { .. } => ClassificationSource::Hash,
            Classification::Keywords { .. } => ClassificationSource::Keywords,
            Classification::Unclassified
            | Classification::Rule { .. }
            | Classification::Fallback { .. } => ClassificationSource::Rule,
            Classification::Screenshot { .. } | Classification::UncategorizedPhoto { .. } => {
                ClassificationSource::PhotoHeuristic
            }
            Classification::Remote { .. } => ClassificationSource::RemoteModel,
        }
    }

    pub fn reasoning(&self) -> String {
        match self {
            Classification::Unclassified => String::new(),
            Classification::Duplicate { of } => {
                let name = Path::new(of)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unknown".to_string());
                format!("Duplicate of {}", name)
            }
            Classification::Keywords {
                category, keywords, ..
            } => match category {
                Some(_) => format!("From keywords: {}", keywords.join(", ")),
                None => format!("Has keywords: {}", keywords.join(", ")),
            },
            Classification::Rule { rule, .. } => format!("Matched rule '{}'", rule),
            Classification::Screenshot { .. } => "Filename indicates screenshot".to_string(),
            Classification::UncategorizedPhoto { .. } => {
                "Photo file with no content classification".to_string()
            }
            Classification::Fallback { .. } => "No matching rule found".to_string(),
            Classification::Remote { reasoning, .. } => reasoning.clone(),
        }
    }

    pub fn is_classified(&self) -> bool {
        !matches!(self, Classification::Unclassified)
    }
}

/// One scanned file and, once classified, where it should go.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    /// Lower-case with leading dot, empty when the file has none.
    pub extension: String,
    pub modified: DateTime<Local>,
    /// Partial content fingerprint; `None` when duplicate detection is off.
    /// A file that cannot be fingerprinted produces no record at all.
    pub fingerprint: Option<String>,
    pub keywords: Vec<String>,
    pub description: String,
    pub is_photo: bool,
    /// Path of the canonical record this one duplicates.
    pub duplicate_of: Option<String>,
    pub classification: Classification,
}

impl FileRecord {
    pub fn new(path: PathBuf, size: u64, modified: DateTime<Local>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = extension_of(&path);
        let is_photo = is_photo_extension(&extension);

        Self {
            path,
            name,
            size,
            extension,
            modified,
            fingerprint: None,
            keywords: Vec::new(),
            description: String::new(),
            is_photo,
            duplicate_of: None,
            classification: Classification::Unclassified,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }

    pub fn year(&self) -> String {
        self.modified.year().to_string()
    }

    pub fn destination(&self) -> &str {
        self.classification.destination()
    }
}

const PHOTO_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".raw", ".cr2", ".cr3", ".nef",
    ".arw", ".dng", ".orf", ".rw2", ".pef", ".srw", ".heic", ".heif",
];

pub fn is_photo_extension(extension: &str) -> bool {
    PHOTO_EXTENSIONS.contains(&extension)
}

pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
