//! llama.cpp server backend: grammar-constrained completion endpoint.

use crate::post_json;
use mindscript_core::backend::{Backend, BackendError};
use serde_json::{json, Value};

const DEFAULT_URL: &str = "http://localhost:8080/completion";
const MAX_TOKENS: u32 = 1000;
const REPEAT_PENALTY: f64 = 1.5;

pub struct LlamaCpp {
    url: String,
    client: reqwest::blocking::Client,
}

impl LlamaCpp {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.unwrap_or(DEFAULT_URL).to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn preprocess(&self, prompt: &str, output_grammar: Option<&str>) -> Value {
        json!({
            "prompt": prompt,
            "grammar": output_grammar,
            "n_predict": MAX_TOKENS,
            "repeat_penalty": REPEAT_PENALTY,
        })
    }

    fn postprocess(reply: &Value) -> Result<String, BackendError> {
        reply["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::MissingKey(reply.to_string()))
    }
}

impl Backend for LlamaCpp {
    fn consult(
        &self,
        prompt: &str,
        output_grammar: Option<&str>,
        _output_schema: Option<&Value>,
    ) -> Result<String, BackendError> {
        let body = self.preprocess(prompt, output_grammar);
        let headers = [("Content-Type", "application/json".to_string())];
        let reply = post_json(&self.client, &self.url, &headers, &body)?;
        Self::postprocess(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_carries_prompt_and_grammar() {
        let backend = LlamaCpp::new(None);
        let body = backend.preprocess("PROMPT", Some("root ::= integer"));
        assert_eq!(body["prompt"], json!("PROMPT"));
        assert_eq!(body["grammar"], json!("root ::= integer"));
        assert_eq!(body["n_predict"], json!(1000));
    }

    #[test]
    fn default_url_points_at_the_local_server() {
        let backend = LlamaCpp::new(None);
        assert_eq!(backend.url, "http://localhost:8080/completion");
        let custom = LlamaCpp::new(Some("http://other/completion"));
        assert_eq!(custom.url, "http://other/completion");
    }

    #[test]
    fn postprocess_extracts_the_content_field() {
        let reply = json!({"content": "{\"result\": 1}"});
        assert_eq!(
            LlamaCpp::postprocess(&reply).ok(),
            Some("{\"result\": 1}".to_string())
        );
        assert!(matches!(
            LlamaCpp::postprocess(&json!({"oops": true})),
            Err(BackendError::MissingKey(_))
        ));
    }
}
