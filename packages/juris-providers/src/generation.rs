use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use juris_config::{Dialect, GenerationProviderConfig};

use crate::{Error, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A fully rendered generation request, shared by every backend in the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
	pub system: String,
	pub user: String,
	pub max_tokens: u32,
	pub temperature: f32,
}

/// Sends `prompt` to one backend and returns the completion text.
///
/// The request shape is picked from the backend's dialect; blank completions surface as
/// [`Error::EmptyCompletion`].
pub async fn generate(cfg: &GenerationProviderConfig, prompt: &Prompt) -> Result<String> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base(), cfg.path());
	let dialect = cfg.backend.dialect();
	let (headers, body) = match dialect {
		Dialect::ChatCompletions => (
			crate::auth_headers(&cfg.api_key, &cfg.default_headers)?,
			chat_completions_body(&cfg.model, prompt),
		),
		Dialect::Messages => (messages_headers(cfg)?, messages_body(&cfg.model, prompt)),
	};
	let res = client.post(url).headers(headers).json(&body).send().await?;
	let json = crate::read_json(res).await?;
	let text = match dialect {
		Dialect::ChatCompletions => parse_chat_completion(&json)?,
		Dialect::Messages => parse_messages(&json)?,
	};

	if text.trim().is_empty() {
		return Err(Error::EmptyCompletion);
	}

	Ok(text)
}

fn chat_completions_body(model: &str, prompt: &Prompt) -> Value {
	serde_json::json!({
		"model": model,
		"temperature": prompt.temperature,
		"max_tokens": prompt.max_tokens,
		"messages": [
			{ "role": "system", "content": prompt.system },
			{ "role": "user", "content": prompt.user },
		],
	})
}

fn messages_body(model: &str, prompt: &Prompt) -> Value {
	serde_json::json!({
		"model": model,
		"temperature": prompt.temperature,
		"max_tokens": prompt.max_tokens,
		"system": prompt.system,
		"messages": [
			{ "role": "user", "content": prompt.user },
		],
	})
}

fn messages_headers(cfg: &GenerationProviderConfig) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(HeaderName::from_static("x-api-key"), cfg.api_key.parse()?);
	headers.insert(
		HeaderName::from_static("anthropic-version"),
		HeaderValue::from_static(ANTHROPIC_VERSION),
	);
	headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

	crate::extend_headers(&mut headers, &cfg.default_headers)?;

	Ok(headers)
}

fn parse_chat_completion(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Chat completion response is missing choices[0].message.content."
				.to_string(),
		})
}

fn parse_messages(json: &Value) -> Result<String> {
	let blocks = json.get("content").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Messages response is missing content array.".to_string() }
	})?;
	let text = blocks
		.iter()
		.filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
		.filter_map(|block| block.get("text").and_then(|t| t.as_str()))
		.collect::<Vec<_>>()
		.join("");

	Ok(text)
}
