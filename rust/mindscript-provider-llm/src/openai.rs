//! OpenAI-compatible chat completions backend.

use crate::post_json;
use mindscript_core::backend::{Backend, BackendError};
use serde_json::{json, Value};

const DEFAULT_URL: &str = "https://api.openai.com/v1/chat/completions";
const TEMPERATURE: f64 = 0.7;

pub struct OpenAi {
    url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAi {
    pub fn new(url: Option<&str>, model: Option<&str>) -> Result<Self, BackendError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            BackendError::Other(
                "The environment variable 'OPENAI_API_KEY' is not set.".to_string(),
            )
        })?;
        let model = model.ok_or_else(|| {
            BackendError::Other("The OpenAI backend requires a model name.".to_string())
        })?;
        Ok(Self {
            url: url.unwrap_or(DEFAULT_URL).to_string(),
            model: model.to_string(),
            api_key,
            client: reqwest::blocking::Client::new(),
        })
    }

    fn preprocess(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
        })
    }

    fn postprocess(reply: &Value) -> Result<String, BackendError> {
        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::MissingKey(reply.to_string()))
    }
}

impl Backend for OpenAi {
    fn consult(
        &self,
        prompt: &str,
        _output_grammar: Option<&str>,
        _output_schema: Option<&Value>,
    ) -> Result<String, BackendError> {
        let body = self.preprocess(prompt);
        let headers = [
            ("Content-Type", "application/json".to_string()),
            ("Authorization", format!("Bearer {}", self.api_key)),
        ];
        let reply = post_json(&self.client, &self.url, &headers, &body)?;
        Self::postprocess(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postprocess_extracts_the_chat_reply() {
        let reply = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"result\": 3}"}}]
        });
        assert_eq!(
            OpenAi::postprocess(&reply).ok(),
            Some("{\"result\": 3}".to_string())
        );
        assert!(matches!(
            OpenAi::postprocess(&json!({"choices": []})),
            Err(BackendError::MissingKey(_))
        ));
    }
}
