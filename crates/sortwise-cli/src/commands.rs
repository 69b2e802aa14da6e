use clap::{Args, Parser, Subcommand, ValueEnum};
use sortwise_core::config::{AppConfig, TrustLevel};
use sortwise_core::{ExportFormat, PlanAction};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sortwise")]
#[command(about = "Sort a messy folder into an organized tree", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan and classify a folder, print the plan and optionally export it
    Analyze {
        /// Folder to organize
        #[arg(short, long)]
        source: PathBuf,
        /// Where the organized tree goes (default: <source>_Organized)
        #[arg(short, long)]
        target: Option<PathBuf>,
        /// Action recorded in the plan
        #[arg(long, value_enum, default_value_t = ActionArg::Copy)]
        action: ActionArg,
        /// Write the plan to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
        /// Export format (default: from the file extension, else json)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
        #[command(flatten)]
        classify: ClassifyArgs,
    },
    /// Analyze a folder, confirm, then copy or move every file into place
    Organize {
        #[arg(short, long)]
        source: PathBuf,
        #[arg(short, long)]
        target: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ActionArg::Copy)]
        action: ActionArg,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        #[command(flatten)]
        classify: ClassifyArgs,
    },
    /// Execute a previously exported JSON plan
    Execute {
        #[arg(short, long)]
        plan: PathBuf,
        #[arg(short, long)]
        yes: bool,
    },
    /// Check whether the remote classification server is reachable
    CheckEndpoint {
        /// Overrides the configured endpoint
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Print the effective configuration as TOML
    PrintConfig,
    /// List the organization preference presets
    Presets,
}

/// Classification overrides shared by `analyze` and `organize`.
#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Ask the remote classifier about files no local rule matched
    #[arg(long)]
    pub remote: bool,
    #[arg(long)]
    pub endpoint: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    /// Free-text organization preference sent to the remote classifier
    #[arg(long)]
    pub preference: Option<String>,
    /// Numbered preference preset (see `sortwise presets`)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub preset: Option<u8>,
    /// Sort photos without keywords into Screenshots/Uncategorized
    #[arg(long)]
    pub photo_mode: bool,
    #[arg(long, value_enum)]
    pub trust_level: Option<TrustArg>,
    /// Do not look for duplicates
    #[arg(long)]
    pub no_duplicates: bool,
    /// Do not read embedded keywords
    #[arg(long)]
    pub no_metadata: bool,
}

impl ClassifyArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if self.remote {
            config.remote.enabled = true;
        }
        if let Some(endpoint) = &self.endpoint {
            config.remote.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.remote.model = model.clone();
        }
        if self.preference.is_some() {
            config.remote.preference = self.preference.clone();
        }
        if self.preset.is_some() {
            config.remote.preset = self.preset;
        }
        if self.photo_mode {
            config.classify.photo_mode = true;
        }
        if let Some(level) = self.trust_level {
            config.classify.trust_level = level.into();
        }
        if self.no_duplicates {
            config.scan.detect_duplicates = false;
        }
        if self.no_metadata {
            config.scan.read_metadata = false;
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Copy,
    Move,
    Export,
}

impl From<ActionArg> for PlanAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Copy => PlanAction::Copy,
            ActionArg::Move => PlanAction::Move,
            ActionArg::Export => PlanAction::Export,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Json,
    Csv,
    Txt,
    Sh,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Txt => ExportFormat::Txt,
            FormatArg::Sh => ExportFormat::Sh,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TrustArg {
    Trust,
    Verify,
    Ignore,
}

impl From<TrustArg> for TrustLevel {
    fn from(level: TrustArg) -> Self {
        match level {
            TrustArg::Trust => TrustLevel::Trust,
            TrustArg::Verify => TrustLevel::Verify,
            TrustArg::Ignore => TrustLevel::Ignore,
        }
    }
}
