use std::time::{Duration, Instant};

use crate::{
	Citation, Error, GenerationAttempt, JurisService, citation, embed, generate, prompt, rerank,
	retrieve,
};

/// Returned on every fatal path. Never carries error details.
pub const APOLOGY_MESSAGE: &str =
	"I'm sorry, I couldn't answer your question right now. Please try again in a moment.";
/// Returned when the index holds no passage for the query.
pub const NO_RELEVANT_INFORMATION: &str =
	"I couldn't find any relevant case law for this question in the available documents.";
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a legal question.";

const QUERY_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueryRequest {
	pub query: String,
	/// Provider name or model to restrict the chain to; `None` uses the default chain.
	#[serde(default)]
	pub model_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
	Success,
	/// Answered, but the reranker fallback ordering was used.
	Degraded,
	Failed,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueryResponse {
	pub trace_id: uuid::Uuid,
	pub status: QueryStatus,
	pub answer: String,
	pub citations: Vec<Citation>,
	/// Name of the provider that produced the answer.
	pub provider: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
	Embedding,
	Retrieving,
	Reranking,
	Generating,
	Assembling,
	Done,
	Failed,
}
impl QueryStage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Embedding => "embedding",
			Self::Retrieving => "retrieving",
			Self::Reranking => "reranking",
			Self::Generating => "generating",
			Self::Assembling => "assembling",
			Self::Done => "done",
			Self::Failed => "failed",
		}
	}
}

/// Everything one query produced: the response plus the diagnostics behind it.
#[derive(Debug)]
pub struct QueryReport {
	pub response: QueryResponse,
	/// The error that ended the query, if any. Absorbed failures (rerank, single provider
	/// attempts) never appear here.
	pub error: Option<Error>,
	/// States visited, in order. Ends with `Done` or `Failed`.
	pub stages: Vec<QueryStage>,
	pub attempts: Vec<GenerationAttempt>,
	pub rerank_fallback: bool,
}

struct Progress {
	trace_id: uuid::Uuid,
	started: Instant,
	stages: Vec<QueryStage>,
	rerank_fallback: bool,
}
impl Progress {
	fn new() -> Self {
		Self {
			trace_id: uuid::Uuid::new_v4(),
			started: Instant::now(),
			stages: Vec::with_capacity(6),
			rerank_fallback: false,
		}
	}

	fn enter(&mut self, stage: QueryStage) {
		tracing::debug!(trace_id = %self.trace_id, stage = stage.as_str(), "Query stage entered.");

		self.stages.push(stage);
	}

	fn latency_ms(&self) -> u64 {
		self.started.elapsed().as_millis() as u64
	}

	fn fail(self, err: Error, answer: &str) -> QueryReport {
		self.fail_after(err, answer, Vec::new())
	}

	fn fail_after(
		mut self,
		err: Error,
		answer: &str,
		attempts: Vec<GenerationAttempt>,
	) -> QueryReport {
		let failed_stage = self.stages.last().copied();

		self.enter(QueryStage::Failed);

		tracing::warn!(
			trace_id = %self.trace_id,
			stage = failed_stage.map(QueryStage::as_str),
			error = %err,
			error_code = err.code(),
			attempts = attempts.len(),
			latency_ms = self.latency_ms(),
			"Query failed."
		);

		QueryReport {
			response: QueryResponse {
				trace_id: self.trace_id,
				status: QueryStatus::Failed,
				answer: answer.to_string(),
				citations: Vec::new(),
				provider: None,
			},
			error: Some(err),
			stages: self.stages,
			attempts,
			rerank_fallback: self.rerank_fallback,
		}
	}

	fn done(
		mut self,
		answer: String,
		citations: Vec<Citation>,
		provider: Option<String>,
		attempts: Vec<GenerationAttempt>,
	) -> QueryReport {
		self.enter(QueryStage::Done);

		let status =
			if self.rerank_fallback { QueryStatus::Degraded } else { QueryStatus::Success };

		tracing::info!(
			trace_id = %self.trace_id,
			status = ?status,
			provider = provider.as_deref(),
			citations = citations.len(),
			attempts = attempts.len(),
			latency_ms = self.latency_ms(),
			"Query finished."
		);

		QueryReport {
			response: QueryResponse { trace_id: self.trace_id, status, answer, citations, provider },
			error: None,
			stages: self.stages,
			attempts,
			rerank_fallback: self.rerank_fallback,
		}
	}
}

impl JurisService {
	/// Answers one query. Every outcome, including pipeline failure, is a well-formed response.
	pub async fn query(&self, req: QueryRequest) -> QueryResponse {
		self.run(req).await.response
	}

	/// Drives one query through embedding, retrieval, reranking, generation and citation
	/// assembly. Stages run sequentially; no state survives the call.
	pub async fn run(&self, req: QueryRequest) -> QueryReport {
		let mut progress = Progress::new();
		let query = req.query.trim();

		tracing::info!(
			trace_id = %progress.trace_id,
			query_preview = %preview(query),
			model_id = req.model_id.as_deref(),
			"Query received."
		);

		if query.is_empty() {
			return progress.fail(
				Error::InvalidRequest { message: EMPTY_QUERY_MESSAGE.to_string() },
				EMPTY_QUERY_MESSAGE,
			);
		}

		progress.enter(QueryStage::Embedding);

		let vector = match embed::embed_query(
			self.providers.embedding.as_ref(),
			&self.cfg.providers.embedding,
			query,
		)
		.await
		{
			Ok(vector) => vector,
			Err(err) => return progress.fail(err, APOLOGY_MESSAGE),
		};

		progress.enter(QueryStage::Retrieving);

		let candidates = match retrieve::search(
			self.index.as_ref(),
			&vector,
			self.cfg.retrieval.top_k_candidates,
			Duration::from_millis(self.cfg.storage.qdrant.timeout_ms),
		)
		.await
		{
			Ok(candidates) => candidates,
			Err(err) => return progress.fail(err, APOLOGY_MESSAGE),
		};

		if candidates.is_empty() {
			return progress.done(NO_RELEVANT_INFORMATION.to_string(), Vec::new(), None, Vec::new());
		}

		progress.enter(QueryStage::Reranking);

		let outcome = rerank::rerank_or_fallback(
			self.providers.rerank.as_ref(),
			&self.cfg.providers.rerank,
			query,
			candidates,
		)
		.await;

		progress.rerank_fallback = outcome.fallback;
		progress.enter(QueryStage::Generating);

		let prompt = prompt::build(&self.cfg, query, &outcome.ranked);
		let chain = generate::plan(&self.cfg.generation.providers, req.model_id.as_deref());
		let run = generate::run_chain(self.providers.generation.as_ref(), &chain, &prompt).await;
		let generation = match run.result {
			Ok(generation) => generation,
			Err(err) => return progress.fail_after(err, APOLOGY_MESSAGE, run.attempts),
		};

		progress.enter(QueryStage::Assembling);

		let citations = citation::extract(
			&generation.text,
			&outcome.ranked,
			self.cfg.response.max_citations as usize,
		);

		progress.done(generation.text, citations, Some(generation.provider), run.attempts)
	}
}

fn preview(query: &str) -> String {
	let mut chars = query.chars();
	let head: String = chars.by_ref().take(QUERY_PREVIEW_CHARS).collect();

	if chars.next().is_some() { format!("{head}...") } else { head }
}
