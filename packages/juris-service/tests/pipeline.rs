use std::sync::atomic::Ordering;

use juris_service::{
	AttemptOutcome, Error, FailureKind, QueryRequest, QueryStage, QueryStatus,
	query::{APOLOGY_MESSAGE, EMPTY_QUERY_MESSAGE, NO_RELEVANT_INFORMATION},
};
use juris_testkit::{
	Harness, Outcome, ScriptedGeneration, StubEmbedding, StubIndex, StubRerank, TEST_TIMEOUT_MS,
	candidates, provider_spec, test_config,
};

fn request(query: &str) -> QueryRequest {
	QueryRequest { query: query.to_string(), model_id: None }
}

fn citation_strings(report: &juris_service::QueryReport) -> Vec<String> {
	report.response.citations.iter().map(|c| c.citation.clone()).collect()
}

#[tokio::test]
async fn breach_of_contract_fails_over_to_second_provider() {
	let mut cfg = test_config(vec![provider_spec("p2", 2), provider_spec("p1", 1)]);

	cfg.providers.rerank.top_n = 3;

	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.2, 0.9, 0.1, 0.8, 0.7]),
		ScriptedGeneration::new([
			("p1", Outcome::Hang),
			("p2", Outcome::Text("A breach requires a valid contract.".to_string())),
		]),
	);
	let report = harness.service.run(request("elements of breach of contract")).await;

	assert!(report.error.is_none());
	assert_eq!(report.response.status, QueryStatus::Success);
	assert_eq!(report.response.provider.as_deref(), Some("p2"));
	assert_eq!(report.response.answer, "A breach requires a valid contract.");
	assert_eq!(harness.generation.calls.entries(), vec!["p1", "p2"]);
	assert_eq!(
		citation_strings(&report),
		vec!["[2024] KEHC 2 (KLR)", "[2024] KEHC 4 (KLR)", "[2024] KEHC 5 (KLR)"]
	);
	assert_eq!(report.attempts.len(), 2);
	assert_eq!(report.attempts[0].outcome, AttemptOutcome::Failure { kind: FailureKind::Timeout });
	assert_eq!(report.attempts[1].outcome, AttemptOutcome::Success);
	assert_eq!(
		report.stages,
		vec![
			QueryStage::Embedding,
			QueryStage::Retrieving,
			QueryStage::Reranking,
			QueryStage::Generating,
			QueryStage::Assembling,
			QueryStage::Done,
		]
	);
}

#[tokio::test]
async fn chain_stops_at_first_success_in_priority_order() {
	let cfg = test_config(vec![
		provider_spec("p4", 4),
		provider_spec("p3", 3),
		provider_spec("p1", 1),
		provider_spec("p2", 2),
	]);
	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::new([("p1", Outcome::Status(503)), ("p2", Outcome::Status(400))]),
	);
	let report = harness.service.run(request("what is consideration")).await;

	assert_eq!(report.response.provider.as_deref(), Some("p3"));
	assert_eq!(report.response.answer, "Answer from p3.");
	assert_eq!(harness.generation.calls.entries(), vec!["p1", "p2", "p3"]);
	assert_eq!(
		report.attempts.iter().map(|a| a.outcome.clone()).collect::<Vec<_>>(),
		vec![
			AttemptOutcome::Failure { kind: FailureKind::Upstream },
			AttemptOutcome::Failure { kind: FailureKind::Rejected },
			AttemptOutcome::Success,
		]
	);
}

#[tokio::test]
async fn empty_completion_advances_chain() {
	let cfg = test_config(vec![provider_spec("p1", 1), provider_spec("p2", 2)]);
	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(2)),
		StubRerank::with_scores(vec![0.5, 0.4]),
		ScriptedGeneration::new([("p1", Outcome::Empty)]),
	);
	let report = harness.service.run(request("remedies for breach")).await;

	assert_eq!(report.response.provider.as_deref(), Some("p2"));
	assert_eq!(
		report.attempts[0].outcome,
		AttemptOutcome::Failure { kind: FailureKind::EmptyCompletion }
	);
}

#[tokio::test]
async fn exhausted_chain_returns_apology_without_citations() {
	let cfg = test_config(vec![provider_spec("p1", 1), provider_spec("p2", 2)]);
	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::new([("p1", Outcome::Status(429)), ("p2", Outcome::Status(500))]),
	);
	let report = harness.service.run(request("limitation period for contract claims")).await;
	let Some(Error::AllProvidersExhausted { failures }) = &report.error else {
		panic!("Expected provider exhaustion, got {:?}.", report.error);
	};

	assert_eq!(
		failures.iter().map(|f| (f.provider.as_str(), f.kind)).collect::<Vec<_>>(),
		vec![("p1", FailureKind::RateLimited), ("p2", FailureKind::Upstream)]
	);
	assert_eq!(report.response.status, QueryStatus::Failed);
	assert_eq!(report.response.answer, APOLOGY_MESSAGE);
	assert!(report.response.citations.is_empty());
	assert!(report.response.provider.is_none());
	assert_eq!(report.stages.last(), Some(&QueryStage::Failed));
}

#[tokio::test]
async fn exhausted_chain_keeps_every_attempt() {
	let cfg = test_config(vec![provider_spec("p1", 1), provider_spec("p2", 2)]);
	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(3)),
		StubRerank::with_scores(vec![0.5; 3]),
		ScriptedGeneration::new([("p1", Outcome::Status(500)), ("p2", Outcome::Hang)]),
	);
	let report = harness.service.run(request("vicarious liability of employers")).await;

	assert!(matches!(report.error, Some(Error::AllProvidersExhausted { .. })));
	assert_eq!(
		report.attempts.iter().map(|a| (a.provider.as_str(), a.outcome.clone())).collect::<Vec<_>>(),
		vec![
			("p1", AttemptOutcome::Failure { kind: FailureKind::Upstream }),
			("p2", AttemptOutcome::Failure { kind: FailureKind::Timeout }),
		]
	);
	assert!(report.attempts[1].latency_ms >= TEST_TIMEOUT_MS / 2);
	assert_eq!(report.response.answer, APOLOGY_MESSAGE);
}

#[tokio::test]
async fn empty_retrieval_skips_rerank_and_generation() {
	let cfg = test_config(vec![provider_spec("p1", 1)]);
	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(Vec::new()),
		StubRerank::with_scores(Vec::new()),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("adverse possession in marine law")).await;

	assert!(report.error.is_none());
	assert_eq!(report.response.status, QueryStatus::Success);
	assert_eq!(report.response.answer, NO_RELEVANT_INFORMATION);
	assert!(report.response.citations.is_empty());
	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 0);
	assert!(harness.generation.calls.is_empty());
	assert_eq!(
		report.stages,
		vec![QueryStage::Embedding, QueryStage::Retrieving, QueryStage::Done]
	);
}

#[tokio::test]
async fn rerank_failure_falls_back_to_retriever_order() {
	let mut cfg = test_config(vec![provider_spec("p1", 1)]);

	cfg.providers.rerank.top_n = 3;

	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_outcome(Outcome::Status(503)),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("duty of care")).await;

	assert!(report.error.is_none());
	assert!(report.rerank_fallback);
	assert_eq!(report.response.status, QueryStatus::Degraded);
	assert_eq!(
		citation_strings(&report),
		vec!["[2024] KEHC 1 (KLR)", "[2024] KEHC 2 (KLR)", "[2024] KEHC 3 (KLR)"]
	);
}

#[tokio::test]
async fn rerank_timeout_falls_back_to_retriever_order() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(2)),
		StubRerank::with_outcome(Outcome::Hang),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("duty of care")).await;

	assert!(report.rerank_fallback);
	assert_eq!(report.response.provider.as_deref(), Some("p1"));
	assert_eq!(citation_strings(&report), vec!["[2024] KEHC 1 (KLR)", "[2024] KEHC 2 (KLR)"]);
}

#[tokio::test]
async fn embedding_failure_is_fatal() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::with_outcome(Outcome::Status(503)),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("implied terms")).await;

	assert!(matches!(report.error, Some(Error::EmbeddingUnavailable { .. })));
	assert_eq!(report.response.answer, APOLOGY_MESSAGE);
	assert!(report.response.citations.is_empty());
	assert_eq!(harness.index.calls.load(Ordering::SeqCst), 0);
	assert!(harness.generation.calls.is_empty());
	assert_eq!(report.stages, vec![QueryStage::Embedding, QueryStage::Failed]);
}

#[tokio::test]
async fn embedding_timeout_is_fatal() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::with_outcome(Outcome::Hang),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("implied terms")).await;

	assert!(matches!(report.error, Some(Error::EmbeddingUnavailable { .. })));
	assert_eq!(report.response.status, QueryStatus::Failed);
}

#[tokio::test]
async fn retrieval_failure_is_fatal() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::ok(),
		StubIndex::failing(),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("frustration of contract")).await;

	assert!(matches!(report.error, Some(Error::RetrievalUnavailable { .. })));
	assert_eq!(report.response.answer, APOLOGY_MESSAGE);
	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 0);
	assert!(harness.generation.calls.is_empty());
}

#[tokio::test]
async fn retrieval_timeout_is_fatal() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::ok(),
		StubIndex::hanging(),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("frustration of contract")).await;
	let Some(Error::RetrievalUnavailable { message }) = &report.error else {
		panic!("Expected retrieval failure, got {:?}.", report.error);
	};

	assert!(message.contains("timed out"));
	assert_eq!(report.response.status, QueryStatus::Failed);
	assert_eq!(report.response.answer, APOLOGY_MESSAGE);
	assert!(report.response.citations.is_empty());
	assert_eq!(harness.index.calls.load(Ordering::SeqCst), 1);
	assert_eq!(harness.rerank.calls.load(Ordering::SeqCst), 0);
	assert!(harness.generation.calls.is_empty());
	assert_eq!(
		report.stages,
		vec![QueryStage::Embedding, QueryStage::Retrieving, QueryStage::Failed]
	);
}

#[tokio::test]
async fn blank_query_is_rejected_before_embedding() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.5; 5]),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("   ")).await;

	assert!(matches!(report.error, Some(Error::InvalidRequest { .. })));
	assert_eq!(report.response.answer, EMPTY_QUERY_MESSAGE);
	assert_eq!(report.response.status, QueryStatus::Failed);
	assert_eq!(harness.embedding.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn citations_bounded_by_context_size() {
	let mut cfg = test_config(vec![provider_spec("p1", 1)]);

	cfg.providers.rerank.top_n = 2;

	let harness = Harness::new(
		cfg,
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(5)),
		StubRerank::with_scores(vec![0.1, 0.2, 0.3, 0.4, 0.5]),
		ScriptedGeneration::default(),
	);
	let report = harness.service.run(request("misrepresentation")).await;

	assert_eq!(citation_strings(&report), vec!["[2024] KEHC 5 (KLR)", "[2024] KEHC 4 (KLR)"]);
}

#[tokio::test]
async fn same_inputs_yield_same_citations() {
	let build = || {
		Harness::new(
			test_config(vec![provider_spec("p1", 1), provider_spec("p2", 2)]),
			StubEmbedding::ok(),
			StubIndex::with_candidates(candidates(5)),
			StubRerank::with_scores(vec![0.3, 0.3, 0.9, 0.1, 0.3]),
			ScriptedGeneration::new([("p1", Outcome::Status(502))]),
		)
	};
	let first = build().service.run(request("privity of contract")).await;
	let second = build().service.run(request("privity of contract")).await;

	assert_eq!(first.response.citations, second.response.citations);
	assert_eq!(first.response.answer, second.response.answer);
	assert_eq!(
		citation_strings(&first),
		vec!["[2024] KEHC 3 (KLR)", "[2024] KEHC 1 (KLR)", "[2024] KEHC 2 (KLR)"]
	);
}

#[tokio::test]
async fn model_override_restricts_chain() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1), provider_spec("p2", 2)]),
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(3)),
		StubRerank::with_scores(vec![0.5; 3]),
		ScriptedGeneration::default(),
	);
	let report = harness
		.service
		.run(QueryRequest {
			query: "specific performance".to_string(),
			model_id: Some("p2-model".to_string()),
		})
		.await;

	assert_eq!(report.response.provider.as_deref(), Some("p2"));
	assert_eq!(harness.generation.calls.entries(), vec!["p2"]);
}

#[tokio::test]
async fn concurrent_queries_are_independent() {
	let harness = Harness::new(
		test_config(vec![provider_spec("p1", 1)]),
		StubEmbedding::ok(),
		StubIndex::with_candidates(candidates(3)),
		StubRerank::with_scores(vec![0.5; 3]),
		ScriptedGeneration::default(),
	);
	let (a, b) = tokio::join!(
		harness.service.query(request("offer and acceptance")),
		harness.service.query(request("offer and acceptance"))
	);

	assert_ne!(a.trace_id, b.trace_id);
	assert_eq!(a.citations, b.citations);
	assert_eq!(harness.generation.calls.len(), 2);
}
