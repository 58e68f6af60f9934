use std::time::{Duration, Instant};

use juris_config::EmbeddingProviderConfig;

use crate::{EmbeddingProvider, Error, Result};

/// Query embedding, owned by the single query that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);
impl EmbeddingVector {
	pub fn as_slice(&self) -> &[f32] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// Embeds one query text. Any provider error, timeout or malformed vector is reported as
/// [`Error::EmbeddingUnavailable`]; there is no retry.
pub async fn embed_query(
	provider: &dyn EmbeddingProvider,
	cfg: &EmbeddingProviderConfig,
	text: &str,
) -> Result<EmbeddingVector> {
	let started = Instant::now();
	let texts = [text.to_string()];
	let call = provider.embed(cfg, &texts);
	let vectors = match tokio::time::timeout(Duration::from_millis(cfg.timeout_ms), call).await {
		Ok(Ok(vectors)) => vectors,
		Ok(Err(err)) => {
			return Err(Error::EmbeddingUnavailable { message: err.to_string() });
		},
		Err(_) => {
			return Err(Error::EmbeddingUnavailable {
				message: format!("Embedding timed out after {} ms.", cfg.timeout_ms),
			});
		},
	};
	let Some(vector) = vectors.into_iter().next() else {
		return Err(Error::EmbeddingUnavailable {
			message: "Embedding provider returned no vectors.".to_string(),
		});
	};

	if vector.len() != cfg.dimensions as usize {
		return Err(Error::EmbeddingUnavailable {
			message: format!(
				"Embedding vector has {} dimensions; expected {}.",
				vector.len(),
				cfg.dimensions
			),
		});
	}
	if vector.iter().any(|value| !value.is_finite()) {
		return Err(Error::EmbeddingUnavailable {
			message: "Embedding vector contains non-finite values.".to_string(),
		});
	}

	tracing::debug!(
		provider_id = %cfg.provider_id,
		model = %cfg.model,
		dimensions = vector.len(),
		latency_ms = started.elapsed().as_millis() as u64,
		"Query embedded."
	);

	Ok(EmbeddingVector(vector))
}
