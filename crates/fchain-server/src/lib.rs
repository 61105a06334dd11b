//! HTTP server for fchain.
//!
//! Accepts multipart file uploads, records each one as a block in the
//! hash-linked ledger, and exposes the chain for inspection and
//! verification.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use router::build_router;
pub use server::FchainServer;
pub use state::AppState;
