mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Backend, Config, DEFAULT_PROMPT_TEMPLATE, Dialect, EmbeddingProviderConfig, Generation,
	GenerationProviderConfig, Providers, Qdrant, RerankProviderConfig, Response, Retrieval,
	Service, Storage,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	load_template(&mut cfg, path.parent().unwrap_or_else(|| Path::new(".")))?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.retrieval.top_k_candidates == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k_candidates must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.rerank.top_n == 0 {
		return Err(Error::Validation {
			message: "providers.rerank.top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.response.max_citations == 0 {
		return Err(Error::Validation {
			message: "response.max_citations must be greater than zero.".to_string(),
		});
	}
	if cfg.generation.max_tokens == 0 {
		return Err(Error::Validation {
			message: "generation.max_tokens must be greater than zero.".to_string(),
		});
	}
	if !cfg.generation.temperature.is_finite() {
		return Err(Error::Validation {
			message: "generation.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&cfg.generation.temperature) {
		return Err(Error::Validation {
			message: "generation.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if cfg.generation.providers.is_empty() {
		return Err(Error::Validation {
			message: "generation.providers must list at least one provider.".to_string(),
		});
	}

	let mut names = HashSet::new();

	for provider in &cfg.generation.providers {
		if provider.name.trim().is_empty() {
			return Err(Error::Validation {
				message: "generation.providers.name must be non-empty.".to_string(),
			});
		}
		if !names.insert(provider.name.as_str()) {
			return Err(Error::Validation {
				message: format!("generation.providers.name {:?} is duplicated.", provider.name),
			});
		}
		if provider.model.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("generation provider {} model must be non-empty.", provider.name),
			});
		}
		if provider.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!(
					"generation provider {} api_key must be non-empty.",
					provider.name
				),
			});
		}
		if provider.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!(
					"generation provider {} timeout_ms must be greater than zero.",
					provider.name
				),
			});
		}
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.rerank.timeout_ms", cfg.providers.rerank.timeout_ms),
		("storage.qdrant.timeout_ms", cfg.storage.qdrant.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	let template = cfg.response.template();

	for placeholder in ["{query}", "{documents}"] {
		if !template.contains(placeholder) {
			return Err(Error::Validation {
				message: format!("response prompt template must contain {placeholder}."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.storage.qdrant.api_key.as_deref().map(|key| key.trim().is_empty()).unwrap_or(false) {
		cfg.storage.qdrant.api_key = None;
	}
	if cfg.providers.embedding.input_type.as_deref().map(|v| v.trim().is_empty()).unwrap_or(false)
	{
		cfg.providers.embedding.input_type = None;
	}

	for provider in &mut cfg.generation.providers {
		if provider.api_base.as_deref().map(|base| base.trim().is_empty()).unwrap_or(false) {
			provider.api_base = None;
		}
		if provider.path.as_deref().map(|path| path.trim().is_empty()).unwrap_or(false) {
			provider.path = None;
		}
	}
}

fn load_template(cfg: &mut Config, base_dir: &Path) -> Result<()> {
	let Some(relative) = cfg.response.prompt_template.as_ref() else {
		return Ok(());
	};
	let path = base_dir.join(relative);
	let text = fs::read_to_string(&path)
		.map_err(|err| Error::ReadTemplate { path: path.clone(), source: err })?;

	cfg.response.prompt_template_text = Some(text);

	Ok(())
}
