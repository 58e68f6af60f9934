/// One retrieved passage with its provenance, in the order the index returned it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
	pub id: String,
	pub text: String,
	/// Case citation string, e.g. "[2025] KEHC 4273 (KLR)".
	pub citation: String,
	/// Source descriptor, usually a link to the judgment.
	pub source: String,
	/// Similarity reported by the index; higher is more relevant.
	pub score: f32,
}
