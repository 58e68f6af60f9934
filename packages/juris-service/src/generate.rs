use std::time::{Duration, Instant};

use crate::{
	AttemptFailure, Error, FailureKind, GenerationProvider, Prompt, ProviderSpec, Result,
};

/// Result of one provider attempt.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
	Success,
	Failure { kind: FailureKind },
}

/// One call to one provider, kept for logging and diagnostics within a single query.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationAttempt {
	pub provider: String,
	pub outcome: AttemptOutcome,
	pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Generation {
	pub text: String,
	pub provider: String,
}

/// Outcome of one pass over the chain. `attempts` is kept on both paths.
#[derive(Debug)]
pub struct ChainRun {
	pub result: Result<Generation>,
	pub attempts: Vec<GenerationAttempt>,
}

/// Orders the configured providers for one query: ascending priority, ties in config order.
///
/// A `model_override` restricts the chain to providers whose name or model matches it. When
/// nothing matches, the full chain is used and the mismatch is logged.
pub fn plan<'a>(providers: &'a [ProviderSpec], model_override: Option<&str>) -> Vec<&'a ProviderSpec> {
	let mut chain: Vec<&ProviderSpec> = providers.iter().collect();

	chain.sort_by_key(|spec| spec.priority);

	let Some(wanted) = model_override.map(str::trim).filter(|v| !v.is_empty()) else {
		return chain;
	};
	let matching: Vec<&ProviderSpec> = chain
		.iter()
		.copied()
		.filter(|spec| spec.name == wanted || spec.model == wanted)
		.collect();

	if matching.is_empty() {
		tracing::warn!(model_id = wanted, "Unknown model override; using the default provider chain.");

		return chain;
	}

	matching
}

/// Tries each provider in `chain` once, in order, and returns the first non-empty completion.
///
/// Every attempt is bounded by its provider's `timeout_ms`. A provider that fails is not
/// retried within the query; the next one is only called after the previous attempt has
/// finished.
pub async fn run_chain(
	provider: &dyn GenerationProvider,
	chain: &[&ProviderSpec],
	prompt: &Prompt,
) -> ChainRun {
	let mut attempts = Vec::with_capacity(chain.len());
	let mut failures = Vec::new();

	for spec in chain {
		let started = Instant::now();
		let result = attempt(provider, spec, prompt).await;
		let latency_ms = started.elapsed().as_millis() as u64;

		match result {
			Ok(text) => {
				tracing::info!(
					provider = %spec.name,
					backend = spec.backend.as_str(),
					model = %spec.model,
					latency_ms,
					answer_chars = text.chars().count(),
					"Generation succeeded."
				);
				attempts.push(GenerationAttempt {
					provider: spec.name.clone(),
					outcome: AttemptOutcome::Success,
					latency_ms,
				});

				let generation = Generation { text, provider: spec.name.clone() };

				return ChainRun { result: Ok(generation), attempts };
			},
			Err(Error::ProviderTransientFailure(failure) | Error::ProviderRejected(failure)) => {
				tracing::warn!(
					provider = %spec.name,
					backend = spec.backend.as_str(),
					model = %spec.model,
					latency_ms,
					failure_kind = failure.kind.as_str(),
					transient = failure.kind.is_transient(),
					error = %failure.message,
					"Generation attempt failed; advancing chain."
				);
				attempts.push(GenerationAttempt {
					provider: spec.name.clone(),
					outcome: AttemptOutcome::Failure { kind: failure.kind },
					latency_ms,
				});
				failures.push(failure);
			},
			Err(err) => return ChainRun { result: Err(err), attempts },
		}
	}

	ChainRun { result: Err(Error::AllProvidersExhausted { failures }), attempts }
}

async fn attempt(
	provider: &dyn GenerationProvider,
	spec: &ProviderSpec,
	prompt: &Prompt,
) -> Result<String> {
	let timeout = Duration::from_millis(spec.timeout_ms);
	let failure = |kind: FailureKind, message: String| {
		let failure = AttemptFailure { provider: spec.name.clone(), kind, message };

		if kind.is_transient() {
			Error::ProviderTransientFailure(failure)
		} else {
			Error::ProviderRejected(failure)
		}
	};

	match tokio::time::timeout(timeout, provider.generate(spec, prompt)).await {
		Ok(Ok(text)) if text.trim().is_empty() => Err(failure(
			FailureKind::EmptyCompletion,
			"Provider returned an empty completion.".to_string(),
		)),
		Ok(Ok(text)) => Ok(text),
		Ok(Err(err)) => Err(failure(FailureKind::classify(&err), err.to_string())),
		Err(_) => Err(failure(
			FailureKind::Timeout,
			format!("No completion within {} ms.", spec.timeout_ms),
		)),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;
	use juris_config::Backend;

	fn spec(name: &str, model: &str, priority: i32) -> ProviderSpec {
		ProviderSpec {
			name: name.to_string(),
			backend: Backend::Groq,
			model: model.to_string(),
			priority,
			api_base: None,
			api_key: "key".to_string(),
			path: None,
			timeout_ms: 1_000,
			default_headers: Map::new(),
		}
	}

	fn names(chain: &[&ProviderSpec]) -> Vec<String> {
		chain.iter().map(|spec| spec.name.clone()).collect()
	}

	#[test]
	fn plan_orders_by_ascending_priority() {
		let providers = vec![spec("c", "m3", 3), spec("a", "m1", 1), spec("b", "m2", 2)];

		assert_eq!(names(&plan(&providers, None)), vec!["a", "b", "c"]);
	}

	#[test]
	fn plan_keeps_config_order_for_equal_priority() {
		let providers = vec![spec("x", "m", 5), spec("y", "m", 5), spec("z", "m", 1)];

		assert_eq!(names(&plan(&providers, None)), vec!["z", "x", "y"]);
	}

	#[test]
	fn override_restricts_chain_by_name_or_model() {
		let providers = vec![spec("a", "llama", 1), spec("b", "mixtral", 2), spec("c", "llama", 3)];

		assert_eq!(names(&plan(&providers, Some("llama"))), vec!["a", "c"]);
		assert_eq!(names(&plan(&providers, Some("b"))), vec!["b"]);
	}

	#[test]
	fn unknown_or_blank_override_uses_full_chain() {
		let providers = vec![spec("b", "m2", 2), spec("a", "m1", 1)];

		assert_eq!(names(&plan(&providers, Some("missing"))), vec!["a", "b"]);
		assert_eq!(names(&plan(&providers, Some("  "))), vec!["a", "b"]);
	}
}
