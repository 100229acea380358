//! The oracle's backend boundary.
//!
//! A backend turns an assembled prompt into text that parses as a
//! MindScript (strict-JSON) expression. Implementations live outside the
//! core crate; the oracle runtime only sees this trait.

use thiserror::Error;

/// Failure modes a consultation can surface. Each is recoverable: the
/// oracle converts them into error-annotated null values.
#[derive(Debug, Error, Clone)]
pub enum BackendError {
    #[error("Error: JSON decode failure of {0}")]
    Decode(String),
    #[error("Error: Connection for {0}")]
    Connection(String),
    #[error("Error: Timeout for {0}")]
    Timeout(String),
    #[error("Error: HTTP status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("Error: Unexpected reply: {0}")]
    MissingKey(String),
    #[error("Error: {0}")]
    Other(String),
}

pub trait Backend {
    /// Consult the model with a fully assembled prompt. `output_grammar`
    /// and `output_schema` constrain decoders that support them.
    fn consult(
        &self,
        prompt: &str,
        output_grammar: Option<&str>,
        output_schema: Option<&serde_json::Value>,
    ) -> Result<String, BackendError>;
}
