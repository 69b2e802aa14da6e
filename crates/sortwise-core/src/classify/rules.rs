use crate::error::Error;
use crate::model::FileRecord;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub const YEAR_TOKEN: &str = "{year}";

/// What a rule's pattern is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTarget {
    /// The dotted, lower-case extension (`.pdf`).
    #[default]
    Extension,
    /// The lower-case file name.
    Filename,
}

/// One rule table entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub pattern: String,
    pub destination: String,
    pub name: String,
    #[serde(default)]
    pub target: MatchTarget,
}

impl RuleSpec {
    fn new(pattern: &str, destination: &str, name: &str, target: MatchTarget) -> Self {
        Self {
            pattern: pattern.to_string(),
            destination: destination.to_string(),
            name: name.to_string(),
            target,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    spec: RuleSpec,
}

/// A matched rule: the expanded destination and the rule's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub destination: String,
    pub rule: String,
}

/// Ordered rule list; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<CompiledRule>,
}

lazy_static::lazy_static! {
    static ref DEFAULT_TABLE: RuleTable = RuleTable::from_specs(&default_rules())
        .expect("built-in rule patterns are valid");
}

impl RuleTable {
    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, Error> {
        let rules = specs
            .iter()
            .map(|spec| {
                RegexBuilder::new(&spec.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|regex| CompiledRule {
                        regex,
                        spec: spec.clone(),
                    })
                    .map_err(|e| Error::InvalidRule {
                        name: spec.name.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        DEFAULT_TABLE.clone()
    }

    /// Custom rules replace the built-in table when present.
    pub fn from_config(custom: &[RuleSpec]) -> Result<Self, Error> {
        if custom.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::from_specs(custom)
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find(&self, record: &FileRecord) -> Option<RuleMatch> {
        let name = record.name.to_lowercase();
        let year = record.year();

        self.rules
            .iter()
            .find(|rule| {
                let text = match rule.spec.target {
                    MatchTarget::Extension => record.extension.as_str(),
                    MatchTarget::Filename => name.as_str(),
                };
                rule.regex.is_match(text)
            })
            .map(|rule| RuleMatch {
                destination: rule.spec.destination.replace(YEAR_TOKEN, &year),
                rule: rule.spec.name.clone(),
            })
    }
}

pub fn default_rules() -> Vec<RuleSpec> {
    use MatchTarget::{Extension, Filename};

    vec![
        RuleSpec::new(r"\.(dmg|iso|img)$", "Archives/Disk Images/{year}", "Disk Images", Extension),
        RuleSpec::new(r"\.(zip|rar|7z|tar|gz)$", "Archives/Compressed/{year}", "Compressed", Extension),
        RuleSpec::new(r"\.(pdf)$", "Documents/PDF/{year}", "PDF", Extension),
        RuleSpec::new(r"\.(docx?|rtf)$", "Documents/Word/{year}", "Word Docs", Extension),
        RuleSpec::new(r"\.(xlsx?|csv)$", "Documents/Spreadsheets/{year}", "Spreadsheets", Extension),
        RuleSpec::new(r"\.(pptx?|key)$", "Documents/Presentations/{year}", "Presentations", Extension),
        RuleSpec::new(r"\.(txt|md|rst)$", "Documents/Text/{year}", "Text Files", Extension),
        RuleSpec::new(r"\.(py|pyw)$", "Code/Python", "Python", Extension),
        RuleSpec::new(r"\.(js|ts|jsx|tsx)$", "Code/JavaScript", "JavaScript", Extension),
        RuleSpec::new(r"\.(html|htm|css|scss)$", "Code/Web", "Web", Extension),
        RuleSpec::new(r"\.(java|kt)$", "Code/Java", "Java", Extension),
        RuleSpec::new(r"\.(c|cpp|h|hpp)$", "Code/C++", "C/C++", Extension),
        RuleSpec::new(r"\.(swift|m)$", "Code/Swift", "Swift", Extension),
        RuleSpec::new(r"\.(go)$", "Code/Go", "Go", Extension),
        RuleSpec::new(r"\.(rs)$", "Code/Rust", "Rust", Extension),
        RuleSpec::new(r"\.(sh|bash|zsh)$", "Code/Shell", "Shell", Extension),
        RuleSpec::new(r"\.(json|yaml|yml|toml|ini|cfg)$", "Config", "Config", Extension),
        RuleSpec::new(r"\.(mp4|mov|avi|mkv|wmv|flv|webm)$", "Videos/{year}", "Videos", Extension),
        RuleSpec::new(r"\.(mp3|wav|flac|aac|ogg|m4a)$", "Audio/{year}", "Audio", Extension),
        RuleSpec::new(r"\.(svg|ai|eps|psd)$", "Graphics/Design/{year}", "Design", Extension),
        RuleSpec::new(r"screenshot", "Images/Screenshots/{year}", "Screenshots", Filename),
        RuleSpec::new(r"\.(app|exe|msi|pkg)$", "Applications/{year}", "Applications", Extension),
        RuleSpec::new(r"\.(ttf|otf|woff|woff2)$", "Fonts", "Fonts", Extension),
    ]
}
