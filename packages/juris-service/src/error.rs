use std::fmt::{Display, Formatter};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Embedding unavailable: {message}")]
	EmbeddingUnavailable { message: String },
	#[error("Retrieval unavailable: {message}")]
	RetrievalUnavailable { message: String },
	#[error("Rerank unavailable: {message}")]
	RerankUnavailable { message: String },
	#[error("Provider transient failure: {0}")]
	ProviderTransientFailure(AttemptFailure),
	#[error("Provider rejected request: {0}")]
	ProviderRejected(AttemptFailure),
	#[error("All generation providers exhausted after {} attempt(s).", .failures.len())]
	AllProvidersExhausted { failures: Vec<AttemptFailure> },
}
impl Error {
	/// Stable machine-readable code, used in logs and API payloads.
	pub fn code(&self) -> &'static str {
		match self {
			Self::InvalidRequest { .. } => "INVALID_REQUEST",
			Self::EmbeddingUnavailable { .. } => "EMBEDDING_UNAVAILABLE",
			Self::RetrievalUnavailable { .. } => "RETRIEVAL_UNAVAILABLE",
			Self::RerankUnavailable { .. } => "RERANK_UNAVAILABLE",
			Self::ProviderTransientFailure(_) => "PROVIDER_TRANSIENT_FAILURE",
			Self::ProviderRejected(_) => "PROVIDER_REJECTED",
			Self::AllProvidersExhausted { .. } => "ALL_PROVIDERS_EXHAUSTED",
		}
	}
}

/// How a single provider attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	Timeout,
	RateLimited,
	Upstream,
	Transport,
	Rejected,
	EmptyCompletion,
	Malformed,
}
impl FailureKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Timeout => "timeout",
			Self::RateLimited => "rate_limited",
			Self::Upstream => "upstream",
			Self::Transport => "transport",
			Self::Rejected => "rejected",
			Self::EmptyCompletion => "empty_completion",
			Self::Malformed => "malformed",
		}
	}

	/// Infrastructure-side faults; the remaining kinds mean this backend refused or garbled
	/// the request itself.
	pub fn is_transient(self) -> bool {
		matches!(self, Self::Timeout | Self::RateLimited | Self::Upstream | Self::Transport)
	}

	pub fn classify(err: &juris_providers::Error) -> Self {
		use juris_providers::Error as ProviderError;

		match err {
			ProviderError::Reqwest(inner) => {
				if inner.is_timeout() {
					Self::Timeout
				} else if let Some(status) = inner.status() {
					Self::from_status(status.as_u16())
				} else if inner.is_decode() {
					Self::Malformed
				} else {
					Self::Transport
				}
			},
			ProviderError::Status { status, .. } => Self::from_status(*status),
			ProviderError::SerdeJson(_) | ProviderError::InvalidResponse { .. } => Self::Malformed,
			ProviderError::EmptyCompletion => Self::EmptyCompletion,
			ProviderError::InvalidHeaderName(_)
			| ProviderError::InvalidHeaderValue(_)
			| ProviderError::InvalidConfig { .. } => Self::Rejected,
		}
	}

	fn from_status(status: u16) -> Self {
		match status {
			408 => Self::Timeout,
			429 => Self::RateLimited,
			400..=499 => Self::Rejected,
			_ => Self::Upstream,
		}
	}
}
impl Display for FailureKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One failed provider attempt, kept in chain order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttemptFailure {
	pub provider: String,
	pub kind: FailureKind,
	pub message: String,
}
impl Display for AttemptFailure {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} ({}): {}", self.provider, self.kind, self.message)
	}
}
