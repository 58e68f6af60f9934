pub const TEXT_FIELD: &str = "text";
pub const CITATION_FIELD: &str = "citation";
pub const ID_FIELD: &str = "id";
/// Payload keys that may carry the source descriptor, in lookup order.
pub const SOURCE_FIELDS: [&str; 2] = ["link", "source"];
pub const MISSING_CITATION: &str = "N/A";
pub const MISSING_SOURCE: &str = "TBD";

use std::{collections::HashMap, time::Duration};

use qdrant_client::qdrant::{
	PointId, Query, QueryPointsBuilder, ScoredPoint, Value, point_id::PointIdOptions, value::Kind,
};

use crate::{Error, Result, models::Candidate};

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &juris_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url)
			.api_key(cfg.api_key.clone())
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Nearest-neighbor search returning at most `limit` candidates, best first.
	///
	/// Points whose payload cannot be decoded are skipped and logged; the remaining order is
	/// exactly the order Qdrant returned.
	pub async fn search(&self, vector: &[f32], limit: u32) -> Result<Vec<Candidate>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidPayload(format!(
				"Query vector has {} dimensions; collection expects {}.",
				vector.len(),
				self.vector_dim
			)));
		}

		let request = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.limit(limit as u64)
			.with_payload(true);
		let response = self.client.query(request).await?;
		let mut candidates = Vec::with_capacity(response.result.len());

		for point in response.result {
			match decode_point(point) {
				Ok(candidate) => candidates.push(candidate),
				Err(err) => {
					tracing::warn!(
						error = %err,
						collection = %self.collection,
						"Skipping undecodable point."
					);
				},
			}
		}

		candidates.truncate(limit as usize);

		Ok(candidates)
	}
}

pub fn decode_point(point: ScoredPoint) -> Result<Candidate> {
	let ScoredPoint { id, payload, score, .. } = point;
	let text = payload_string(&payload, TEXT_FIELD)
		.filter(|text| !text.trim().is_empty())
		.ok_or_else(|| Error::InvalidPayload("Point payload is missing text.".to_string()))?;
	let id = payload_string(&payload, ID_FIELD)
		.or_else(|| id.as_ref().and_then(point_id_string))
		.ok_or_else(|| Error::InvalidPayload("Point has no identifier.".to_string()))?;
	let citation = payload_string(&payload, CITATION_FIELD)
		.filter(|value| !value.trim().is_empty())
		.unwrap_or_else(|| MISSING_CITATION.to_string());
	let source = SOURCE_FIELDS
		.iter()
		.find_map(|field| {
			payload_string(&payload, field).filter(|value| !value.trim().is_empty())
		})
		.unwrap_or_else(|| MISSING_SOURCE.to_string());

	Ok(Candidate { id, text, citation, source, score })
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match payload.get(key)?.kind.as_ref()? {
		Kind::StringValue(value) => Some(value.clone()),
		Kind::IntegerValue(value) => Some(value.to_string()),
		_ => None,
	}
}

fn point_id_string(id: &PointId) -> Option<String> {
	match id.point_id_options.as_ref()? {
		PointIdOptions::Num(num) => Some(num.to_string()),
		PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
	}
}
