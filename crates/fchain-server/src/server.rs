use std::sync::Arc;

use fchain_ingest::IngestService;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// fchain ingestion server.
pub struct FchainServer {
    config: ServerConfig,
}

impl FchainServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Open storage and restore the chain. Fails on a corrupt chain file.
    pub fn open_service(&self) -> ServerResult<Arc<IngestService>> {
        Ok(Arc::new(IngestService::open(self.config.ingest_config())?))
    }

    /// Build the router over an already opened service.
    pub fn router(&self, service: Arc<IngestService>) -> axum::Router {
        build_router(AppState::new(service), &self.config)
    }

    /// Start serving requests until ctrl-c.
    pub async fn serve(self) -> ServerResult<()> {
        let service = self.open_service()?;
        let app = self.router(service);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            storage = %self.config.storage_dir.display(),
            "fchain server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!("fchain server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = FchainServer::new(ServerConfig::default());
        assert_eq!(server.config().bind_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn corrupt_chain_blocks_startup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("chain.json"), b"not a chain").unwrap();
        let server = FchainServer::new(ServerConfig {
            storage_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        });

        let err = server.open_service().err().unwrap();
        assert!(matches!(
            err,
            ServerError::Ingest(fchain_ingest::IngestError::CorruptChain(_))
        ));
    }
}
