use crate::model::FileRecord;
use serde::{Deserialize, Serialize};

const SYSTEM_INSTRUCTIONS: &str = "You are a file organization assistant. \
You receive a JSON array describing files and decide which folder each file belongs in.

Respond with ONLY a JSON array, no other text. Each element must be an object with exactly these fields:
  \"filename\":    the file name exactly as given
  \"destination\": a relative folder path using forward slashes, for example \"Photos/Wildlife/2023\"
  \"confidence\":  one of \"high\", \"medium\", \"low\"
  \"reasoning\":   one short sentence explaining the choice

Never use absolute paths or \"..\" in a destination. Include every file you can classify; omit files you cannot.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// OpenAI-compatible chat completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// What the service learns about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub size_bytes: u64,
    pub modified: String,
    pub is_photo: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&FileRecord> for BatchItem {
    fn from(record: &FileRecord) -> Self {
        Self {
            filename: record.name.clone(),
            extension: (!record.extension.is_empty()).then(|| record.extension.clone()),
            size_bytes: record.size,
            modified: record.modified.format("%Y-%m-%d").to_string(),
            is_photo: record.is_photo,
            keywords: record.keywords.clone(),
            description: (!record.description.is_empty()).then(|| record.description.clone()),
        }
    }
}

pub fn system_prompt(preference: &str) -> String {
    if preference.trim().is_empty() {
        SYSTEM_INSTRUCTIONS.to_string()
    } else {
        format!(
            "{}\n\nThe user's organization preferences:\n{}",
            SYSTEM_INSTRUCTIONS,
            preference.trim()
        )
    }
}

pub fn build_request(
    model: &str,
    preference: &str,
    items: &[BatchItem],
    temperature: f32,
    max_tokens: u32,
) -> Result<ChatRequest, serde_json::Error> {
    let payload = serde_json::to_string_pretty(items)?;
    Ok(ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(system_prompt(preference)),
            ChatMessage::user(payload),
        ],
        temperature,
        max_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;

    #[test]
    fn test_absent_fields_are_omitted() {
        let modified = Local.with_ymd_and_hms(2022, 11, 5, 10, 0, 0).unwrap();
        let record = FileRecord::new(PathBuf::from("/in/README"), 42, modified);
        let item = BatchItem::from(&record);

        let json = serde_json::to_value(&item).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["filename"], "README");
        assert_eq!(obj["modified"], "2022-11-05");
        assert!(!obj.contains_key("extension"));
        assert!(!obj.contains_key("keywords"));
        assert!(!obj.contains_key("description"));
    }

    #[test]
    fn test_request_carries_schema_and_preference() {
        let request = build_request("m", "Group invoices by client", &[], 0.2, 1000).unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("\"destination\""));
        assert!(request.messages[0].content.contains("Group invoices by client"));
        assert_eq!(request.messages[1].content, "[]");
    }
}
