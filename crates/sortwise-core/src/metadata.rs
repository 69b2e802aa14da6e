use crate::config::MetadataOptions;
use serde_json::Value;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("metadata read timed out after {0:?}")]
    Timeout(Duration),

    #[error("metadata tool exited with {0}")]
    ToolFailed(std::process::ExitStatus),

    #[error("unreadable metadata output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Keywords and description embedded in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub keywords: Vec<String>,
    pub description: String,
}

/// Source of embedded file metadata.
pub trait MetadataProvider: Send + Sync {
    fn read(&self, path: &Path, timeout: Duration) -> Result<FileMetadata, MetadataError>;

    fn name(&self) -> &'static str;
}

/// Used when metadata reading is disabled or no tool is available.
pub struct NoMetadata;

impl MetadataProvider for NoMetadata {
    fn read(&self, _path: &Path, _timeout: Duration) -> Result<FileMetadata, MetadataError> {
        Ok(FileMetadata::default())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Reads keywords through an external `exiftool` process.
pub struct ExifToolProvider {
    binary: PathBuf,
}

impl ExifToolProvider {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Returns the provider only if `binary -ver` runs successfully.
    pub fn probe(binary: PathBuf) -> Option<Self> {
        let expression = duct::cmd(binary.as_path(), ["-ver"])
            .stdout_capture()
            .stderr_null()
            .unchecked();
        match run_with_timeout(expression, PROBE_TIMEOUT) {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                debug!("Found exiftool {} at {}", version, binary.display());
                Some(Self::new(binary))
            }
            Ok(output) => {
                debug!("exiftool probe exited with {}", output.status);
                None
            }
            Err(e) => {
                debug!("exiftool probe failed: {}", e);
                None
            }
        }
    }
}

impl MetadataProvider for ExifToolProvider {
    fn read(&self, path: &Path, timeout: Duration) -> Result<FileMetadata, MetadataError> {
        let args: [&OsStr; 6] = [
            OsStr::new("-json"),
            OsStr::new("-Keywords"),
            OsStr::new("-Subject"),
            OsStr::new("-Description"),
            OsStr::new("-Caption-Abstract"),
            path.as_os_str(),
        ];
        let expression = duct::cmd(self.binary.as_path(), args)
            .stdout_capture()
            .stderr_null()
            .unchecked();

        let output = run_with_timeout(expression, timeout)?;
        if !output.status.success() {
            return Err(MetadataError::ToolFailed(output.status));
        }
        parse_exiftool_json(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &'static str {
        "exiftool"
    }
}

/// Pick the metadata capability once, before any scanning happens.
pub fn resolve_provider(read_metadata: bool, options: &MetadataOptions) -> Box<dyn MetadataProvider> {
    if !read_metadata {
        return Box::new(NoMetadata);
    }

    let binary = options
        .exiftool_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("exiftool"));

    match ExifToolProvider::probe(binary.clone()) {
        Some(provider) => {
            info!("Reading embedded metadata with {}", binary.display());
            Box::new(provider)
        }
        None => {
            warn!(
                "exiftool not available at '{}'; continuing without embedded metadata",
                binary.display()
            );
            Box::new(NoMetadata)
        }
    }
}

fn run_with_timeout(expression: duct::Expression, timeout: Duration) -> Result<Output, MetadataError> {
    let handle = expression.start()?;
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(output) = handle.try_wait()? {
            return Ok(output.clone());
        }
        if Instant::now() >= deadline {
            let _ = handle.kill();
            return Err(MetadataError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Parse `exiftool -json` output. `Keywords` and `Subject` may each be a
/// single value or a list; they are merged without repeats.
pub fn parse_exiftool_json(stdout: &str) -> Result<FileMetadata, MetadataError> {
    let items: Vec<Value> = serde_json::from_str(stdout)?;
    let Some(item) = items.first() else {
        return Ok(FileMetadata::default());
    };

    let mut keywords: Vec<String> = Vec::new();
    for field in ["Keywords", "Subject"] {
        for keyword in values_of(item.get(field)) {
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
    }

    let description = ["Description", "Caption-Abstract"]
        .iter()
        .filter_map(|field| item.get(*field))
        .flat_map(|v| values_of(Some(v)))
        .find(|s| !s.is_empty())
        .unwrap_or_default();

    Ok(FileMetadata {
        keywords,
        description,
    })
}

fn values_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        Some(other) => scalar_to_string(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
