use juris_config::Config;

use crate::{Prompt, RankedCandidate};

const NO_DOCUMENTS: &str = "No documents available.";

/// Builds the generation prompt from the configured template and the ranked context.
pub fn build(cfg: &Config, query: &str, context: &[RankedCandidate]) -> Prompt {
	let documents = render_documents(context);
	let user = render(cfg.response.template(), query, &documents, cfg.response.max_citations);

	Prompt {
		system: cfg.generation.system_prompt.clone(),
		user,
		max_tokens: cfg.generation.max_tokens,
		temperature: cfg.generation.temperature,
	}
}

/// Renders each passage with its citation and source so the model can reference them.
pub fn render_documents(context: &[RankedCandidate]) -> String {
	if context.is_empty() {
		return NO_DOCUMENTS.to_string();
	}

	context
		.iter()
		.enumerate()
		.map(|(i, ranked)| {
			let candidate = &ranked.candidate;

			format!(
				"Document {}: {}\nCitation: {}\nSource: {}",
				i + 1,
				candidate.text.trim(),
				candidate.citation,
				candidate.source
			)
		})
		.collect::<Vec<_>>()
		.join("\n\n")
}

/// Substitutes `{query}`, `{documents}` and `{max_citations}` in a single pass, so text
/// inside the query or passages is never re-expanded.
pub fn render(template: &str, query: &str, documents: &str, max_citations: u32) -> String {
	let max_citations = max_citations.to_string();
	let mut out = String::with_capacity(template.len() + query.len() + documents.len());
	let mut rest = template;

	while let Some(start) = rest.find('{') {
		out.push_str(&rest[..start]);

		let tail = &rest[start..];
		let replacement = [
			("{query}", query),
			("{documents}", documents),
			("{max_citations}", max_citations.as_str()),
		]
		.into_iter()
		.find(|(placeholder, _)| tail.starts_with(placeholder));

		match replacement {
			Some((placeholder, value)) => {
				out.push_str(value);
				rest = &tail[placeholder.len()..];
			},
			None => {
				out.push('{');
				rest = &tail[1..];
			},
		}
	}

	out.push_str(rest);

	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Candidate;

	fn ranked(id: &str) -> RankedCandidate {
		RankedCandidate {
			candidate: Candidate {
				id: id.to_string(),
				text: format!(" Passage {id}. "),
				citation: format!("[2024] KEHC {id} (KLR)"),
				source: format!("https://example.test/{id}"),
				score: 0.5,
			},
			rerank_score: 0.5,
		}
	}

	#[test]
	fn renders_numbered_documents() {
		let rendered = render_documents(&[ranked("1"), ranked("2")]);

		assert_eq!(
			rendered,
			"Document 1: Passage 1.\nCitation: [2024] KEHC 1 (KLR)\nSource: https://example.test/1\n\n\
			 Document 2: Passage 2.\nCitation: [2024] KEHC 2 (KLR)\nSource: https://example.test/2"
		);
	}

	#[test]
	fn empty_context_has_placeholder_text() {
		assert_eq!(render_documents(&[]), NO_DOCUMENTS);
	}

	#[test]
	fn substitutes_all_placeholders() {
		let out = render("Q: {query}\nD: {documents}\nMax {max_citations}.", "duty", "docs", 3);

		assert_eq!(out, "Q: duty\nD: docs\nMax 3.");
	}

	#[test]
	fn does_not_expand_placeholders_inside_values() {
		let out = render("{query}|{documents}", "what is {documents}?", "d", 1);

		assert_eq!(out, "what is {documents}?|d");
	}

	#[test]
	fn keeps_unknown_braces() {
		let out = render("{ok} {query} {", "q", "d", 1);

		assert_eq!(out, "{ok} q {");
	}
}
