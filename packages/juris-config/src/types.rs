use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Built-in chain-of-thought template used when `response.prompt_template` is unset.
pub const DEFAULT_PROMPT_TEMPLATE: &str = include_str!("../templates/cot_prompt.txt");

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub generation: Generation,
	pub retrieval: Retrieval,
	pub response: Response,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Origins allowed by the CORS layer. Empty disables the layer.
	#[serde(default)]
	pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub api_key: Option<String>,
	pub collection: String,
	pub vector_dim: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: RerankProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	/// Sent as `input_type` when set, e.g. "query" for Voyage-style APIs.
	pub input_type: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct RerankProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub top_n: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Generation {
	pub max_tokens: u32,
	pub temperature: f32,
	#[serde(default = "default_system_prompt")]
	pub system_prompt: String,
	pub providers: Vec<GenerationProviderConfig>,
}

/// One generation backend in the failover chain.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationProviderConfig {
	pub name: String,
	pub backend: Backend,
	pub model: String,
	/// Lower values are tried first.
	#[serde(default = "default_priority")]
	pub priority: i32,
	pub api_base: Option<String>,
	pub api_key: String,
	pub path: Option<String>,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}
impl GenerationProviderConfig {
	pub fn api_base(&self) -> &str {
		self.api_base.as_deref().unwrap_or_else(|| self.backend.default_api_base())
	}

	pub fn path(&self) -> &str {
		self.path.as_deref().unwrap_or_else(|| self.backend.default_path())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Backend {
	#[serde(rename = "groq")]
	Groq,
	#[serde(rename = "together")]
	Together,
	#[serde(rename = "openai")]
	OpenAi,
	#[serde(rename = "anthropic")]
	Anthropic,
}
impl Backend {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Groq => "groq",
			Self::Together => "together",
			Self::OpenAi => "openai",
			Self::Anthropic => "anthropic",
		}
	}

	pub fn dialect(self) -> Dialect {
		match self {
			Self::Groq | Self::Together | Self::OpenAi => Dialect::ChatCompletions,
			Self::Anthropic => Dialect::Messages,
		}
	}

	pub fn default_api_base(self) -> &'static str {
		match self {
			Self::Groq => "https://api.groq.com/openai",
			Self::Together => "https://api.together.xyz",
			Self::OpenAi => "https://api.openai.com",
			Self::Anthropic => "https://api.anthropic.com",
		}
	}

	pub fn default_path(self) -> &'static str {
		match self.dialect() {
			Dialect::ChatCompletions => "/v1/chat/completions",
			Dialect::Messages => "/v1/messages",
		}
	}
}

/// Wire format spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
	ChatCompletions,
	Messages,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	pub top_k_candidates: u32,
}

#[derive(Debug, Deserialize)]
pub struct Response {
	pub max_citations: u32,
	/// Path to a template file, resolved relative to the config file.
	pub prompt_template: Option<PathBuf>,
	/// Loaded content of `prompt_template`.
	#[serde(skip)]
	pub prompt_template_text: Option<String>,
}
impl Response {
	pub fn template(&self) -> &str {
		self.prompt_template_text.as_deref().unwrap_or(DEFAULT_PROMPT_TEMPLATE)
	}
}

fn default_system_prompt() -> String {
	"You are a legal assistant specializing in case law analysis.".to_string()
}

fn default_priority() -> i32 {
	999
}
