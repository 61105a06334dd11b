use std::sync::Arc;

use fchain_ingest::IngestService;

/// Shared handler state. Cloned per request; the service is built once at
/// startup.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IngestService>,
}

impl AppState {
    pub fn new(service: Arc<IngestService>) -> Self {
        Self { service }
    }
}
