use std::time::{Duration, Instant};

use crate::{Candidate, EmbeddingVector, Error, Result, VectorIndex};

/// Searches the index for the `k` nearest passages.
///
/// Order is the index's own (descending similarity, index-stable ties). An empty result is a
/// valid answer; only index errors and timeouts become [`Error::RetrievalUnavailable`].
pub async fn search(
	index: &dyn VectorIndex,
	vector: &EmbeddingVector,
	k: u32,
	timeout: Duration,
) -> Result<Vec<Candidate>> {
	let started = Instant::now();
	let mut candidates = match tokio::time::timeout(timeout, index.search(vector.as_slice(), k))
		.await
	{
		Ok(Ok(candidates)) => candidates,
		Ok(Err(err)) => return Err(Error::RetrievalUnavailable { message: err.to_string() }),
		Err(_) => {
			return Err(Error::RetrievalUnavailable {
				message: format!("Vector search timed out after {} ms.", timeout.as_millis()),
			});
		},
	};

	candidates.truncate(k as usize);

	tracing::debug!(
		k,
		returned = candidates.len(),
		top_score = candidates.first().map(|c| c.score),
		latency_ms = started.elapsed().as_millis() as u64,
		"Vector search finished."
	);

	Ok(candidates)
}
