use crate::classify::rules::RuleSpec;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Largest batch the remote classifier will ever send.
pub const MAX_REMOTE_BATCH: usize = 20;

/// Full configuration bundle. Built once, then handed by value to the engine;
/// each phase receives its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scan: ScanOptions,
    pub classify: ClassifyOptions,
    pub remote: RemoteOptions,
    pub metadata: MetadataOptions,
    pub execute: ExecuteOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    pub include_subfolders: bool,
    pub max_files: usize,
    pub detect_duplicates: bool,
    pub read_metadata: bool,
    pub ignore_patterns: Vec<String>,
    /// Visit siblings in lexical order instead of filesystem order.
    pub stable_order: bool,
    pub metadata_timeout_secs: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            include_subfolders: true,
            max_files: 10_000,
            detect_duplicates: true,
            read_metadata: true,
            ignore_patterns: Vec::new(),
            stable_order: false,
            metadata_timeout_secs: 10,
        }
    }
}

impl ScanOptions {
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

/// How far embedded keywords are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    #[default]
    Trust,
    Verify,
    Ignore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyOptions {
    pub trust_level: TrustLevel,
    pub photo_mode: bool,
    /// Whether unresolved records are queued for the remote classifier.
    pub remote_fallback: bool,
    /// Replaces the built-in rule table when non-empty.
    pub rules: Vec<RuleSpec>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            trust_level: TrustLevel::Trust,
            photo_mode: false,
            remote_fallback: false,
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteOptions {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub preference: Option<String>,
    /// One of the numbered presets, used when `preference` is unset.
    pub preset: Option<u8>,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:1234".to_string(),
            model: "local-model".to_string(),
            batch_size: MAX_REMOTE_BATCH,
            timeout_secs: 60,
            temperature: 0.1,
            max_tokens: 4096,
            preference: None,
            preset: None,
        }
    }
}

impl RemoteOptions {
    pub fn batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_REMOTE_BATCH)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The free-text preference sent with every batch.
    pub fn effective_preference(&self) -> String {
        match (&self.preference, self.preset) {
            (Some(text), _) if !text.trim().is_empty() => text.clone(),
            (_, Some(number)) => preset(number)
                .map(|p| p.prompt.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataOptions {
    /// Explicit ExifTool binary. When unset, `exiftool` on PATH is probed.
    pub exiftool_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteOptions {
    /// Maximum number of error messages kept in an execution report.
    pub error_cap: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { error_cap: 20 }
    }
}

/// Load `Config.toml` (optional) overlaid with `SORTWISE__SECTION__KEY`
/// environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from("Config")
}

pub fn load_configuration_from(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("SORTWISE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

pub struct PreferencePreset {
    pub number: u8,
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const PRESETS: &[PreferencePreset] = &[
    PreferencePreset {
        number: 1,
        name: "General Cleanup",
        prompt: "Organize files by type and date:\n\
                 Documents (PDF, DOCX, TXT) -> Documents/YYYY/\n\
                 Images (JPG, PNG, GIF) -> Images/YYYY/\n\
                 Videos (MP4, MOV, AVI) -> Videos/YYYY/\n\
                 Audio (MP3, WAV, FLAC) -> Audio/YYYY/\n\
                 Archives (ZIP, RAR, 7Z) -> Archives/\n\
                 Code -> Code/[language]/\n\
                 Group recent files (30 days) in an \"Active\" folder.",
    },
    PreferencePreset {
        number: 2,
        name: "Photographer",
        prompt: "I'm a photographer. Organize by content:\n\
                 Wildlife (birds, bears, deer) -> Photos/Wildlife/[Species]/YYYY\n\
                 Weddings -> Photos/Weddings/YYYY-MM\n\
                 Sports/Racing -> Photos/Sports/[Type]/YYYY\n\
                 Portraits -> Photos/Portraits/YYYY\n\
                 Landscapes -> Photos/Landscapes/YYYY\n\
                 Pets -> Photos/Pets/YYYY\n\
                 Screenshots -> Photos/Screenshots/YYYY\n\
                 Use existing keywords when available.",
    },
    PreferencePreset {
        number: 3,
        name: "Developer",
        prompt: "Developer workflow organization:\n\
                 Python (.py) -> Code/Python/\n\
                 JavaScript (.js, .ts) -> Code/JavaScript/\n\
                 Web (.html, .css) -> Code/Web/\n\
                 Config (.env, .yaml, .json) -> Config/\n\
                 Documentation (.md, .rst) -> Docs/\n\
                 Data (.csv, .json, .sql) -> Data/\n\
                 Group by project when possible.",
    },
    PreferencePreset {
        number: 4,
        name: "Work/Personal",
        prompt: "Split files by context:\n\
                 Work files -> Work/[Category]/YYYY/ (contracts, invoices, reports, \
                 brand assets, meeting notes, presentations)\n\
                 Personal files -> Personal/[Category]/YYYY/ (photos, videos, music, \
                 personal documents, receipts, statements)\n\
                 Organize by type within each category.",
    },
    PreferencePreset {
        number: 5,
        name: "Custom",
        prompt: "",
    },
];

pub fn preset(number: u8) -> Option<&'static PreferencePreset> {
    PRESETS.iter().find(|p| p.number == number)
}
