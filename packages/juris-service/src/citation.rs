//! Citation extraction.
//!
//! Citations are chosen by membership in the generation context, not by matching the answer
//! text: a passage the model saw is cited whether or not the answer mentions it. Titles and
//! source labels come from a string heuristic because the index stores no structured title.
//! Chunks of one case share a (citation, source) pair and are cited once. Passages with no
//! provenance at all are told apart by id.

use std::collections::HashSet;

use juris_storage::qdrant::{MISSING_CITATION, MISSING_SOURCE};

use crate::{Candidate, RankedCandidate};

/// Title ends at the first of these, e.g. "[2025] KEHC 4273 (KLR)" -> "[2025] KEHC 4273".
const TITLE_DELIMITERS: [char; 3] = ['(', '|', ';'];
/// Source label ends at the first of these, dropping query strings and fragments from links.
const SOURCE_DELIMITERS: [char; 4] = ['|', ';', '?', '#'];
const UNKNOWN_LABEL: &str = "N/A";

#[derive(PartialEq, Eq, Hash)]
enum DedupKey<'a> {
	Provenance(&'a str, &'a str),
	Passage(&'a str),
}
impl<'a> DedupKey<'a> {
	fn of(candidate: &'a Candidate) -> Self {
		let unknown = |value: &str, placeholder: &str| {
			let value = value.trim();

			value.is_empty() || value == placeholder
		};

		let citation = candidate.citation.as_str();
		let source = candidate.source.as_str();

		if unknown(citation, MISSING_CITATION) && unknown(source, MISSING_SOURCE) {
			Self::Passage(candidate.id.as_str())
		} else {
			Self::Provenance(citation, source)
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Citation {
	/// 1-based position in this response's citation list.
	pub id: u32,
	pub title: String,
	pub source_label: String,
	pub citation: String,
	pub source: String,
}

/// Returns at most `max_citations` citations for the passages in `context`, in rank order,
/// skipping passages whose (citation, source) pair was already cited. Passages missing both
/// fields are only skipped when their id repeats. The answer text is not inspected.
pub fn extract(_answer: &str, context: &[RankedCandidate], max_citations: usize) -> Vec<Citation> {
	let mut seen = HashSet::new();
	let mut citations = Vec::with_capacity(max_citations.min(context.len()));

	for ranked in context {
		if citations.len() == max_citations {
			break;
		}

		let candidate = &ranked.candidate;

		if !seen.insert(DedupKey::of(candidate)) {
			continue;
		}

		citations.push(Citation {
			id: citations.len() as u32 + 1,
			title: leading_label(&candidate.citation, &TITLE_DELIMITERS),
			source_label: leading_label(&candidate.source, &SOURCE_DELIMITERS),
			citation: candidate.citation.clone(),
			source: candidate.source.clone(),
		});
	}

	citations
}

/// Text before the first delimiter, trimmed. Falls back to the whole trimmed string when that
/// prefix is empty, and to a placeholder when the string itself is blank.
pub fn leading_label(raw: &str, delimiters: &[char]) -> String {
	let head = raw.split(|c| delimiters.contains(&c)).next().unwrap_or_default().trim();

	if !head.is_empty() {
		return head.to_string();
	}

	let whole = raw.trim();

	if whole.is_empty() { UNKNOWN_LABEL.to_string() } else { whole.to_string() }
}
