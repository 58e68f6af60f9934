pub mod citation;
pub mod embed;
pub mod generate;
pub mod prompt;
pub mod query;
pub mod rerank;
pub mod retrieve;

mod error;

pub use citation::Citation;
pub use embed::EmbeddingVector;
pub use error::{AttemptFailure, Error, FailureKind, Result};
pub use generate::{AttemptOutcome, ChainRun, Generation, GenerationAttempt};
pub use juris_providers::generation::Prompt;
pub use juris_storage::models::Candidate;
pub use query::{QueryReport, QueryRequest, QueryResponse, QueryStage, QueryStatus};
pub use rerank::{RankedCandidate, RerankOutcome};

use std::{future::Future, pin::Pin, sync::Arc};

use juris_config::{Config, EmbeddingProviderConfig, GenerationProviderConfig, RerankProviderConfig};
use juris_providers::{embedding, generation, rerank as rerank_api};
use juris_storage::qdrant::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generation backend descriptor: name, backend, priority and endpoint settings.
pub type ProviderSpec = GenerationProviderConfig;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, juris_providers::Result<Vec<Vec<f32>>>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, juris_storage::Result<Vec<Candidate>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, juris_providers::Result<Vec<f32>>>;
}

/// Uniform invocation interface for every generation backend; dispatch on the backend's wire
/// dialect happens inside, keyed by [`ProviderSpec::backend`].
pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		spec: &'a ProviderSpec,
		prompt: &'a Prompt,
	) -> BoxFuture<'a, juris_providers::Result<String>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}

/// Query orchestrator. Holds only read-only configuration and stateless clients, so one
/// instance serves any number of concurrent queries.
pub struct JurisService {
	pub cfg: Config,
	pub index: Arc<dyn VectorIndex>,
	pub providers: Providers,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, juris_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a RerankProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, juris_providers::Result<Vec<f32>>> {
		Box::pin(rerank_api::rerank(cfg, query, docs))
	}
}

impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		spec: &'a ProviderSpec,
		prompt: &'a Prompt,
	) -> BoxFuture<'a, juris_providers::Result<String>> {
		Box::pin(generation::generate(spec, prompt))
	}
}

impl VectorIndex for QdrantStore {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, juris_storage::Result<Vec<Candidate>>> {
		Box::pin(QdrantStore::search(self, vector, limit))
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, rerank, generation }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);
		Self { embedding: provider.clone(), rerank: provider.clone(), generation: provider }
	}
}

impl JurisService {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		Self { cfg, index: Arc::new(qdrant), providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, index: Arc<dyn VectorIndex>, providers: Providers) -> Self {
		Self { cfg, index, providers }
	}
}
