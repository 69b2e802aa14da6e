use super::{OrganizationPlan, PlanAction, PLAN_VERSION};
use crate::error::Error;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const SUMMARY_MOVE_LIMIT: usize = 50;
const CSV_HEADER: [&str; 8] = [
    "Source",
    "Destination",
    "Filename",
    "Size",
    "Confidence",
    "Classification",
    "Reason",
    "IsDuplicate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
    Sh,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
            ExportFormat::Sh => "sh",
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("organization_plan.{}", self.extension())
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "txt" | "text" => Ok(ExportFormat::Txt),
            "sh" | "shell" => Ok(ExportFormat::Sh),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

pub fn to_json(plan: &OrganizationPlan) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(plan)?)
}

/// Parse a plan document. Only the current `plan_version` is accepted.
pub fn from_json(text: &str) -> Result<OrganizationPlan, Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    match value.get("plan_version").and_then(|v| v.as_str()) {
        Some(PLAN_VERSION) => Ok(serde_json::from_value(value)?),
        Some(other) => Err(Error::InvalidPlan(format!(
            "unsupported plan version '{}' (expected '{}')",
            other, PLAN_VERSION
        ))),
        None => Err(Error::InvalidPlan("missing plan_version".to_string())),
    }
}

pub fn load_plan(path: &Path) -> Result<OrganizationPlan, Error> {
    from_json(&fs::read_to_string(path)?)
}

pub fn to_csv(plan: &OrganizationPlan) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for mv in &plan.moves {
        let size = mv.size_bytes.to_string();
        writer.write_record([
            mv.source.as_str(),
            mv.destination.as_str(),
            mv.filename.as_str(),
            size.as_str(),
            mv.confidence.as_str(),
            mv.classification_source.as_str(),
            mv.reasoning.as_str(),
            if mv.is_duplicate { "true" } else { "false" },
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn to_summary(plan: &OrganizationPlan) -> String {
    let stats = &plan.statistics;
    let mut out = String::new();

    let _ = writeln!(out, "sortwise - Organization Plan");
    let _ = writeln!(out, "Generated: {}", plan.created_at);
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(out);
    let _ = writeln!(out, "Source: {}", plan.source_root);
    let _ = writeln!(out, "Target: {}", plan.target_root);
    let _ = writeln!(out, "Action: {}", plan.action.as_str().to_uppercase());
    let _ = writeln!(out);
    let _ = writeln!(out, "STATISTICS");
    let _ = writeln!(out, "  Files: {}", group_thousands(stats.total_files as u64));
    let _ = writeln!(out, "  Size: {}", format_size(stats.total_size_bytes));
    let _ = writeln!(out, "  Folders to create: {}", stats.folders_to_create);
    let _ = writeln!(out, "  Duplicates found: {}", stats.duplicates_flagged);
    let _ = writeln!(out);
    let _ = writeln!(out, "FOLDER STRUCTURE");

    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for mv in &plan.moves {
        let top = match mv.destination.split_once('/') {
            Some((top, _)) => top,
            None => ".",
        };
        *tally.entry(top).or_default() += 1;
    }
    for (folder, count) in &tally {
        let _ = writeln!(out, "  {}/ ({} files)", folder, count);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "FILE MOVES (first {})", SUMMARY_MOVE_LIMIT);
    let _ = writeln!(out);
    for mv in plan.moves.iter().take(SUMMARY_MOVE_LIMIT) {
        let _ = writeln!(out, "  {} -> {}", mv.filename, mv.destination);
    }
    if plan.moves.len() > SUMMARY_MOVE_LIMIT {
        let _ = writeln!(
            out,
            "  ... and {} more files",
            plan.moves.len() - SUMMARY_MOVE_LIMIT
        );
    }

    out
}

pub fn to_shell_script(plan: &OrganizationPlan) -> String {
    let target = plan.target_root.trim_end_matches('/');
    let (command, verb) = match plan.action {
        PlanAction::Move => ("mv", "Move"),
        _ => ("cp -p", "Copy"),
    };

    let mut out = String::new();
    let _ = writeln!(out, "#!/bin/bash");
    let _ = writeln!(out, "# sortwise organization script");
    let _ = writeln!(out, "# Generated: {}", plan.created_at);
    let _ = writeln!(out, "# Source: {}", plan.source_root);
    let _ = writeln!(out, "# Target: {}", plan.target_root);
    let _ = writeln!(out, "# Action: {}", plan.action);
    let _ = writeln!(out);
    let _ = writeln!(out, "set -e");
    let _ = writeln!(out);
    let _ = writeln!(out, "# Create folders");
    for folder in &plan.folders {
        let _ = writeln!(out, "mkdir -p {}", shell_quote(&format!("{}/{}", target, folder)));
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "# {} files", verb);
    for mv in &plan.moves {
        let _ = writeln!(
            out,
            "{} {} {}",
            command,
            shell_quote(&mv.source),
            shell_quote(&format!("{}/{}", target, mv.destination))
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "echo \"Done! Processed {} files.\"", plan.moves.len());

    out
}

pub fn render(plan: &OrganizationPlan, format: ExportFormat) -> Result<String, Error> {
    match format {
        ExportFormat::Json => to_json(plan),
        ExportFormat::Csv => to_csv(plan),
        ExportFormat::Txt => Ok(to_summary(plan)),
        ExportFormat::Sh => Ok(to_shell_script(plan)),
    }
}

pub fn write_plan(plan: &OrganizationPlan, format: ExportFormat, path: &Path) -> Result<(), Error> {
    let content = render(plan, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if format == ExportFormat::Sh {
            fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
        }
    }

    info!(
        "Exported plan ({} moves) as {} to {}",
        plan.moves.len(),
        format.extension(),
        path.display()
    );
    Ok(())
}

/// Wrap in single quotes; embedded quotes become `'\''`.
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
