use super::prompt::ChatRequest;
use super::RemoteError;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Suffixes users commonly paste along with the server address. Checked in
/// order; the first match is removed.
const ENDPOINT_SUFFIXES: &[&str] = &[
    "/v1/chat/completions",
    "/chat/completions",
    "/v1/completions",
    "/completions",
    "/v1",
    "/api",
];

const PROBE_PATHS: &[&str] = &["/v1/models", "/models", "/api/models"];

/// Statuses that mean "wrong path, try another" rather than "API found".
const PROBE_RETRY_STATUSES: &[u16] = &[400, 401, 403, 404, 405];

/// Sends one chat completion request and returns the assistant's text.
pub trait ClassificationService: Send + Sync {
    fn complete(&self, request: &ChatRequest) -> Result<String, RemoteError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion endpoint over HTTP.
pub struct HttpService {
    client: Client,
    url: String,
}

impl HttpService {
    /// `timeout` bounds each request, so one batch can never stall a run.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(timeout).build()?;
        let url = format!("{}/v1/chat/completions", normalize_endpoint(endpoint));
        debug!("Remote classification endpoint: {}", url);
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ClassificationService for HttpService {
    fn complete(&self, request: &ChatRequest) -> Result<String, RemoteError> {
        let response = self.client.post(&self.url).json(request).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let parsed: ChatResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(RemoteError::EmptyResponse)
    }
}

/// Strip whitespace, trailing slashes and a known API suffix, leaving the
/// server base address.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let base = ENDPOINT_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed);
    base.trim_end_matches('/').to_string()
}

/// Check that a classification server answers at `endpoint`. Returns the
/// first URL that answered with a usable status, or the base address when
/// the server only answered with retry statuses. `Unreachable` means no
/// request got an HTTP response at all.
pub fn probe(endpoint: &str, timeout: Duration) -> Result<String, RemoteError> {
    let base = normalize_endpoint(endpoint);
    let client = Client::builder().timeout(timeout).build()?;

    let candidates = PROBE_PATHS
        .iter()
        .map(|path| format!("{}{}", base, path))
        .chain(std::iter::once(base.clone()));

    let mut answered = false;
    for url in candidates {
        match client.get(&url).send() {
            Ok(response) if is_retry_status(response.status()) => {
                trace!("Probe {} answered {}, trying next", url, response.status());
                answered = true;
            }
            Ok(response) => {
                debug!("Probe {} answered {}", url, response.status());
                return Ok(url);
            }
            Err(e) => trace!("Probe {} failed: {}", url, e),
        }
    }

    if answered {
        debug!("Server at {} answered, but no API path was recognised", base);
        return Ok(base);
    }
    Err(RemoteError::Unreachable(base))
}

fn is_retry_status(status: StatusCode) -> bool {
    PROBE_RETRY_STATUSES.contains(&status.as_u16())
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
