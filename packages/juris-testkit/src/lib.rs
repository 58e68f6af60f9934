//! Scriptable stand-ins for the external services a query touches, plus a ready-made
//! [`Config`]. Every fake records its calls so tests can assert on what was (not) invoked.

use std::{
	collections::HashMap,
	future,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use serde_json::Map;

use juris_config::{
	Backend, Config, EmbeddingProviderConfig, Generation, Providers as ProviderConfigs, Qdrant,
	RerankProviderConfig, Response, Retrieval, Service, Storage,
};
use juris_service::{
	BoxFuture, Candidate, EmbeddingProvider, GenerationProvider, JurisService, Prompt,
	ProviderSpec, Providers, RerankProvider, VectorIndex,
};

pub const VECTOR_DIM: u32 = 4;
/// Per-call timeout used by [`test_config`]; small enough that hanging fakes fail fast.
pub const TEST_TIMEOUT_MS: u64 = 200;

/// What a scripted call does.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// Succeeds with this text (generation only; other fakes ignore the payload).
	Text(String),
	/// Fails as if the service answered with this HTTP status.
	Status(u16),
	/// Never completes; the caller's timeout must fire.
	Hang,
	/// Succeeds with blank text.
	Empty,
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);
impl CallLog {
	pub fn record(&self, entry: impl Into<String>) {
		let mut calls = self.0.lock().unwrap_or_else(|err| err.into_inner());

		calls.push(entry.into());
	}

	pub fn entries(&self) -> Vec<String> {
		self.0.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn len(&self) -> usize {
		self.0.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

pub struct StubEmbedding {
	pub vector_dim: u32,
	pub outcome: Outcome,
	pub calls: Arc<AtomicUsize>,
}
impl StubEmbedding {
	pub fn ok() -> Self {
		Self::with_outcome(Outcome::Text(String::new()))
	}

	pub fn with_outcome(outcome: Outcome) -> Self {
		Self { vector_dim: VECTOR_DIM, outcome, calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, juris_providers::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let dim = self.vector_dim as usize;
		let vectors: Vec<Vec<f32>> = texts
			.iter()
			.map(|text| (0..dim).map(|i| ((text.len() + i) % 7) as f32 / 7.0).collect())
			.collect();

		scripted(&self.outcome, vectors)
	}
}

/// Returns `candidates` truncated to the search limit, or fails or hangs per `outcome`.
pub struct StubIndex {
	pub candidates: Vec<Candidate>,
	pub outcome: Outcome,
	pub calls: Arc<AtomicUsize>,
}
impl StubIndex {
	pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
		Self {
			candidates,
			outcome: Outcome::Text(String::new()),
			calls: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn failing() -> Self {
		Self::with_outcome(Outcome::Status(503))
	}

	pub fn hanging() -> Self {
		Self::with_outcome(Outcome::Hang)
	}

	fn with_outcome(outcome: Outcome) -> Self {
		Self { candidates: Vec::new(), outcome, calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl VectorIndex for StubIndex {
	fn search<'a>(
		&'a self,
		_vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, juris_storage::Result<Vec<Candidate>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let result: juris_storage::Result<Vec<Candidate>> = match self.outcome {
			Outcome::Hang => return Box::pin(future::pending()),
			Outcome::Status(_) => {
				Err(juris_storage::Error::InvalidPayload("Scripted index failure.".to_string()))
			},
			Outcome::Text(_) | Outcome::Empty => {
				Ok(self.candidates.iter().take(limit as usize).cloned().collect())
			},
		};

		Box::pin(async move { result })
	}
}

/// Scores documents with `scores` in input order, or fails with `outcome`.
pub struct StubRerank {
	pub scores: Vec<f32>,
	pub outcome: Outcome,
	pub calls: Arc<AtomicUsize>,
}
impl StubRerank {
	pub fn with_scores(scores: Vec<f32>) -> Self {
		Self {
			scores,
			outcome: Outcome::Text(String::new()),
			calls: Arc::new(AtomicUsize::new(0)),
		}
	}

	pub fn with_outcome(outcome: Outcome) -> Self {
		Self { scores: Vec::new(), outcome, calls: Arc::new(AtomicUsize::new(0)) }
	}
}
impl RerankProvider for StubRerank {
	fn rerank<'a>(
		&'a self,
		_cfg: &'a RerankProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, juris_providers::Result<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let scores: Vec<f32> =
			(0..docs.len()).map(|i| self.scores.get(i).copied().unwrap_or(0.0)).collect();

		scripted(&self.outcome, scores)
	}
}

/// Answers per provider name. Unscripted providers answer `"Answer from {name}."`.
#[derive(Default)]
pub struct ScriptedGeneration {
	pub outcomes: HashMap<String, Outcome>,
	pub calls: CallLog,
}
impl ScriptedGeneration {
	pub fn new<I, S>(outcomes: I) -> Self
	where
		I: IntoIterator<Item = (S, Outcome)>,
		S: Into<String>,
	{
		Self {
			outcomes: outcomes.into_iter().map(|(name, outcome)| (name.into(), outcome)).collect(),
			calls: CallLog::default(),
		}
	}
}
impl GenerationProvider for ScriptedGeneration {
	fn generate<'a>(
		&'a self,
		spec: &'a ProviderSpec,
		_prompt: &'a Prompt,
	) -> BoxFuture<'a, juris_providers::Result<String>> {
		self.calls.record(spec.name.clone());

		match self.outcomes.get(&spec.name) {
			Some(Outcome::Text(text)) => {
				let text = text.clone();

				Box::pin(async move { Ok(text) })
			},
			Some(Outcome::Empty) => Box::pin(async { Ok("   ".to_string()) }),
			Some(outcome) => scripted(outcome, String::new()),
			None => {
				let text = format!("Answer from {}.", spec.name);

				Box::pin(async move { Ok(text) })
			},
		}
	}
}

/// Fakes bundled with the service they were wired into, so tests keep handles to the call
/// counters after the service takes ownership.
pub struct Harness {
	pub service: JurisService,
	pub embedding: Arc<StubEmbedding>,
	pub index: Arc<StubIndex>,
	pub rerank: Arc<StubRerank>,
	pub generation: Arc<ScriptedGeneration>,
}
impl Harness {
	pub fn new(
		cfg: Config,
		embedding: StubEmbedding,
		index: StubIndex,
		rerank: StubRerank,
		generation: ScriptedGeneration,
	) -> Self {
		let embedding = Arc::new(embedding);
		let index = Arc::new(index);
		let rerank = Arc::new(rerank);
		let generation = Arc::new(generation);
		let providers = Providers::new(embedding.clone(), rerank.clone(), generation.clone());
		let service = JurisService::with_providers(cfg, index.clone(), providers);

		Self { service, embedding, index, rerank, generation }
	}
}

pub fn provider_spec(name: &str, priority: i32) -> ProviderSpec {
	ProviderSpec {
		name: name.to_string(),
		backend: Backend::Groq,
		model: format!("{name}-model"),
		priority,
		api_base: Some("http://127.0.0.1:1".to_string()),
		api_key: "test-key".to_string(),
		path: None,
		timeout_ms: TEST_TIMEOUT_MS,
		default_headers: Map::new(),
	}
}

/// `n` candidates with descending similarity: `case-1` (0.95), `case-2` (0.90), ...
pub fn candidates(n: usize) -> Vec<Candidate> {
	(1..=n)
		.map(|i| Candidate {
			id: format!("case-{i}"),
			text: format!("Passage {i} on contract formation and breach."),
			citation: format!("[2024] KEHC {i} (KLR)"),
			source: format!("https://kenyalaw.org/caselaw/cases/view/{i}"),
			score: 1.0 - i as f32 * 0.05,
		})
		.collect()
}

/// Config with `top_k_candidates = 5`, `top_n = 5`, `max_citations = 3`, short timeouts and
/// the given generation chain.
pub fn test_config(providers: Vec<ProviderSpec>) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			cors_origins: Vec::new(),
		},
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:1".to_string(),
				api_key: None,
				collection: "case_law_test".to_string(),
				vector_dim: VECTOR_DIM,
				timeout_ms: TEST_TIMEOUT_MS,
			},
		},
		providers: ProviderConfigs {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: VECTOR_DIM,
				input_type: Some("query".to_string()),
				timeout_ms: TEST_TIMEOUT_MS,
				default_headers: Map::new(),
			},
			rerank: RerankProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/rerank".to_string(),
				model: "test-rerank".to_string(),
				top_n: 5,
				timeout_ms: TEST_TIMEOUT_MS,
				default_headers: Map::new(),
			},
		},
		generation: Generation {
			max_tokens: 1024,
			temperature: 0.1,
			system_prompt: "You are a legal assistant specializing in case law analysis."
				.to_string(),
			providers,
		},
		retrieval: Retrieval { top_k_candidates: 5 },
		response: Response { max_citations: 3, prompt_template: None, prompt_template_text: None },
	}
}

fn scripted<'a, T>(outcome: &Outcome, value: T) -> BoxFuture<'a, juris_providers::Result<T>>
where
	T: Send + 'a,
{
	match outcome {
		Outcome::Status(status) => {
			let status = *status;

			Box::pin(async move {
				Err(juris_providers::Error::Status {
					status,
					body: "Scripted failure.".to_string(),
				})
			})
		},
		Outcome::Hang => Box::pin(future::pending()),
		Outcome::Text(_) | Outcome::Empty => Box::pin(async move { Ok(value) }),
	}
}
