//! LLM backend providers for the MindScript oracle, plus the `http`
//! native. Each backend splits into `preprocess` (request assembly) and
//! `postprocess` (reply extraction) around one blocking POST helper.

pub mod llamacpp;
pub mod network;
pub mod ollama;
pub mod openai;

use mindscript_core::backend::BackendError;
use std::time::Duration;

/// Consultation timeout, in seconds.
pub const TIMEOUT: Duration = Duration::from_secs(20);

pub(crate) fn classify(err: reqwest::Error, url: &str) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(url.to_string())
    } else if err.is_connect() {
        BackendError::Connection(url.to_string())
    } else {
        BackendError::Other(err.to_string())
    }
}

/// POST a JSON body and decode the JSON reply.
pub(crate) fn post_json(
    client: &reqwest::blocking::Client,
    url: &str,
    headers: &[(&str, String)],
    body: &serde_json::Value,
) -> Result<serde_json::Value, BackendError> {
    let mut request = client.post(url).timeout(TIMEOUT).json(body);
    for (name, value) in headers {
        request = request.header(*name, value);
    }
    let response = request.send().map_err(|e| classify(e, url))?;
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let text = response.text().map_err(|e| classify(e, url))?;
    serde_json::from_str(&text).map_err(|_| BackendError::Decode(text))
}
