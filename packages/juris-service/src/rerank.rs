use std::{
	cmp::Ordering,
	time::{Duration, Instant},
};

use juris_config::RerankProviderConfig;

use crate::{Candidate, Error, RerankProvider, Result};

/// A candidate with its rerank score. Lists of these are sorted by `rerank_score`, descending.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedCandidate {
	pub candidate: Candidate,
	pub rerank_score: f32,
}

#[derive(Debug, Clone)]
pub struct RerankOutcome {
	pub ranked: Vec<RankedCandidate>,
	/// Set when the relevance model was unavailable and retriever order was kept.
	pub fallback: bool,
}

/// Scores every candidate against the query, sorts by score and keeps the best `top_n`.
///
/// Ties keep retriever order. A NaN score ranks below every real score.
pub async fn rerank(
	provider: &dyn RerankProvider,
	cfg: &RerankProviderConfig,
	query: &str,
	candidates: &[Candidate],
) -> Result<Vec<RankedCandidate>> {
	if candidates.is_empty() {
		return Ok(Vec::new());
	}

	let docs: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
	let call = provider.rerank(cfg, query, &docs);
	let scores = match tokio::time::timeout(Duration::from_millis(cfg.timeout_ms), call).await {
		Ok(Ok(scores)) => scores,
		Ok(Err(err)) => return Err(Error::RerankUnavailable { message: err.to_string() }),
		Err(_) => {
			return Err(Error::RerankUnavailable {
				message: format!("Rerank timed out after {} ms.", cfg.timeout_ms),
			});
		},
	};

	if scores.len() != candidates.len() {
		return Err(Error::RerankUnavailable {
			message: format!(
				"Rerank returned {} scores for {} candidates.",
				scores.len(),
				candidates.len()
			),
		});
	}

	Ok(order_by_scores(candidates, &scores, cfg.top_n as usize))
}

/// Reranks, or degrades to retriever order truncated to `top_n` when the relevance model
/// fails. The fallback is logged and flagged on the outcome.
pub async fn rerank_or_fallback(
	provider: &dyn RerankProvider,
	cfg: &RerankProviderConfig,
	query: &str,
	candidates: Vec<Candidate>,
) -> RerankOutcome {
	let started = Instant::now();

	match rerank(provider, cfg, query, &candidates).await {
		Ok(ranked) => {
			tracing::debug!(
				provider_id = %cfg.provider_id,
				input = candidates.len(),
				kept = ranked.len(),
				latency_ms = started.elapsed().as_millis() as u64,
				"Candidates reranked."
			);

			RerankOutcome { ranked, fallback: false }
		},
		Err(err) => {
			tracing::warn!(
				error = %err,
				error_code = err.code(),
				provider_id = %cfg.provider_id,
				rerank_fallback = true,
				latency_ms = started.elapsed().as_millis() as u64,
				"Rerank failed; keeping retriever order."
			);

			RerankOutcome { ranked: fallback_order(candidates, cfg.top_n as usize), fallback: true }
		},
	}
}

/// Retriever order truncated to `top_n`, with the similarity score standing in for the
/// rerank score.
pub fn fallback_order(candidates: Vec<Candidate>, top_n: usize) -> Vec<RankedCandidate> {
	candidates
		.into_iter()
		.take(top_n)
		.map(|candidate| {
			let rerank_score = candidate.score;

			RankedCandidate { candidate, rerank_score }
		})
		.collect()
}

fn order_by_scores(candidates: &[Candidate], scores: &[f32], top_n: usize) -> Vec<RankedCandidate> {
	let mut ranked: Vec<RankedCandidate> = candidates
		.iter()
		.cloned()
		.zip(scores.iter().copied())
		.map(|(candidate, rerank_score)| RankedCandidate { candidate, rerank_score })
		.collect();

	// Stable sort keeps retriever order among equal scores.
	ranked.sort_by(|a, b| compare_desc(a.rerank_score, b.rerank_score));
	ranked.truncate(top_n);

	ranked
}

fn compare_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
