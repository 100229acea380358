//! Ollama backend: schema-constrained generation endpoint.

use crate::post_json;
use mindscript_core::backend::{Backend, BackendError};
use serde_json::{json, Value};

const DEFAULT_URL: &str = "http://localhost:11434/api/generate";

pub struct Ollama {
    url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl Ollama {
    pub fn new(url: Option<&str>, model: Option<&str>) -> Result<Self, BackendError> {
        let model = model.ok_or_else(|| {
            BackendError::Other("The Ollama backend requires a model name.".to_string())
        })?;
        Ok(Self {
            url: url.unwrap_or(DEFAULT_URL).to_string(),
            model: model.to_string(),
            client: reqwest::blocking::Client::new(),
        })
    }

    fn preprocess(&self, prompt: &str, output_schema: Option<&Value>) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "format": output_schema,
        })
    }

    fn postprocess(reply: &Value) -> Result<String, BackendError> {
        reply["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::MissingKey(reply.to_string()))
    }
}

impl Backend for Ollama {
    fn consult(
        &self,
        prompt: &str,
        _output_grammar: Option<&str>,
        output_schema: Option<&Value>,
    ) -> Result<String, BackendError> {
        let body = self.preprocess(prompt, output_schema);
        let headers = [("Content-Type", "application/json".to_string())];
        let reply = post_json(&self.client, &self.url, &headers, &body)?;
        Self::postprocess(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_a_model_name() {
        assert!(Ollama::new(None, None).is_err());
        assert!(Ollama::new(None, Some("llama3")).is_ok());
    }

    #[test]
    fn preprocess_carries_the_output_schema_as_format() {
        let backend = match Ollama::new(None, Some("llama3")) {
            Ok(backend) => backend,
            Err(e) => panic!("construction failed: {}", e),
        };
        let schema = json!({"type": "object"});
        let body = backend.preprocess("PROMPT", Some(&schema));
        assert_eq!(body["model"], json!("llama3"));
        assert_eq!(body["stream"], json!(false));
        assert_eq!(body["format"], schema);
    }

    #[test]
    fn postprocess_extracts_the_response_field() {
        assert_eq!(
            Ollama::postprocess(&json!({"response": "null"})).ok(),
            Some("null".to_string())
        );
        assert!(Ollama::postprocess(&json!({})).is_err());
    }
}
