use std::sync::Arc;

use juris_service::JurisService;
use juris_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<JurisService>,
}
impl AppState {
	pub fn new(config: juris_config::Config) -> color_eyre::Result<Self> {
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		Ok(Self::from_service(JurisService::new(config, qdrant)))
	}

	pub fn from_service(service: JurisService) -> Self {
		Self { service: Arc::new(service) }
	}
}
