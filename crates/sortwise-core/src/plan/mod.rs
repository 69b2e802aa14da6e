//! The organization plan: a serializable description of every folder to
//! create and every file to place, built once from classified records.

pub mod export;

pub use export::{load_plan, write_plan, ExportFormat};

use crate::error::Error;
use crate::model::{ClassificationSource, Confidence, FileRecord};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub const PLAN_VERSION: &str = "1.0";
pub const CREATED_BY: &str = "sortwise";
const TARGET_SUFFIX: &str = "_Organized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    #[default]
    Copy,
    Move,
    /// Plan is only written out, never executed.
    Export,
}

impl PlanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanAction::Copy => "copy",
            PlanAction::Move => "move",
            PlanAction::Export => "export",
        }
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub source: String,
    /// `<folder>/<filename>`, relative to the target root.
    pub destination: String,
    pub filename: String,
    pub size_bytes: u64,
    pub confidence: Confidence,
    pub classification_source: ClassificationSource,
    pub reasoning: String,
    pub is_duplicate: bool,
    pub duplicate_of: Option<String>,
}

impl From<&FileRecord> for MoveRecord {
    fn from(record: &FileRecord) -> Self {
        let folder = record.destination();
        let destination = if folder.is_empty() {
            record.name.clone()
        } else {
            format!("{}/{}", folder, record.name)
        };

        Self {
            source: record.path.to_string_lossy().into_owned(),
            destination,
            filename: record.name.clone(),
            size_bytes: record.size,
            confidence: record.classification.confidence(),
            classification_source: record.classification.source(),
            reasoning: record.classification.reasoning(),
            is_duplicate: record.is_duplicate(),
            duplicate_of: record.duplicate_of.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStatistics {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub folders_to_create: usize,
    pub duplicates_flagged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub handle_duplicates: String,
    pub create_folders: bool,
    pub on_conflict: String,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            handle_duplicates: "move_to_duplicates_folder".to_string(),
            create_folders: true,
            on_conflict: "rename".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub plan_version: String,
    pub created_by: String,
    pub created_at: String,
    pub tool_version: String,
    pub source_root: String,
    pub target_root: String,
    pub action: PlanAction,
    pub statistics: PlanStatistics,
    pub folders: Vec<String>,
    pub moves: Vec<MoveRecord>,
    pub options: PlanOptions,
}

/// `<source>_Organized`, next to the source folder.
pub fn default_target_root(source_root: &Path) -> PathBuf {
    let mut target = source_root.as_os_str().to_os_string();
    target.push(TARGET_SUFFIX);
    PathBuf::from(target)
}

pub fn build_plan(
    records: &[FileRecord],
    source_root: &Path,
    target_root: Option<&Path>,
    action: PlanAction,
) -> OrganizationPlan {
    let target_root = target_root
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_target_root(source_root));

    let folders: Vec<String> = records
        .iter()
        .map(FileRecord::destination)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let moves: Vec<MoveRecord> = records.iter().map(MoveRecord::from).collect();

    let statistics = PlanStatistics {
        total_files: records.len(),
        total_size_bytes: records.iter().map(|r| r.size).sum(),
        folders_to_create: folders.len(),
        duplicates_flagged: records.iter().filter(|r| r.is_duplicate()).count(),
    };

    OrganizationPlan {
        plan_version: PLAN_VERSION.to_string(),
        created_by: CREATED_BY.to_string(),
        created_at: Local::now().to_rfc3339(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        source_root: source_root.to_string_lossy().into_owned(),
        target_root: target_root.to_string_lossy().into_owned(),
        action,
        statistics,
        folders,
        moves,
        options: PlanOptions::default(),
    }
}

impl OrganizationPlan {
    /// Check everything that must hold before a single file is touched.
    pub fn validate(&self) -> Result<(), Error> {
        if self.action == PlanAction::Export {
            return Err(Error::InvalidPlan(
                "plan was created for export only and cannot be executed".to_string(),
            ));
        }
        if self.target_root.trim().is_empty() {
            return Err(Error::InvalidPlan("target root is empty".to_string()));
        }

        for folder in &self.folders {
            check_relative(folder, "folder")?;
        }
        for (index, mv) in self.moves.iter().enumerate() {
            if mv.source.trim().is_empty() {
                return Err(Error::InvalidPlan(format!("move {} has an empty source", index)));
            }
            check_relative(&mv.destination, "destination")?;
        }
        Ok(())
    }

    pub fn target_path(&self) -> PathBuf {
        PathBuf::from(&self.target_root)
    }
}

fn check_relative(path: &str, what: &str) -> Result<(), Error> {
    if path.trim().is_empty() {
        return Err(Error::InvalidPlan(format!("empty {}", what)));
    }
    let p = Path::new(path);
    let escapes = p.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || path.starts_with('/') || path.starts_with('\\') {
        return Err(Error::InvalidPlan(format!(
            "{} '{}' must be relative and stay inside the target",
            what, path
        )));
    }
    Ok(())
}
