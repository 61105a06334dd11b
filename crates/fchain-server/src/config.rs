use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fchain_ingest::{IngestConfig, DEFAULT_CHAIN_FILE, DEFAULT_MAX_UPLOAD_BYTES};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const ENV_STORAGE_DIR: &str = "STORAGE_DIR";
pub const ENV_CHAIN_FILE: &str = "CHAIN_FILE";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_MAX_UPLOAD_BYTES: &str = "MAX_UPLOAD_BYTES";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

/// Server settings. Layered as defaults, then an optional TOML file, then
/// environment, then command-line flags (applied by the binary).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub storage_dir: PathBuf,
    /// Defaults to `<storage_dir>/chain.json`.
    pub chain_file: Option<PathBuf>,
    pub max_upload_bytes: u64,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            storage_dir: PathBuf::from("/data"),
            chain_file: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout_secs: 300,
        }
    }
}

impl ServerConfig {
    /// Read a TOML file. Keys it leaves out keep their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Overlay the process environment.
    pub fn apply_env(&mut self) -> ServerResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; unset or empty keys are left alone.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_STORAGE_DIR) {
            self.storage_dir = PathBuf::from(dir);
        }
        if let Some(file) = get(ENV_CHAIN_FILE) {
            self.chain_file = Some(PathBuf::from(file));
        }
        if let Some(addr) = get(ENV_BIND_ADDR) {
            self.bind_addr = parse_env(ENV_BIND_ADDR, &addr)?;
        }
        if let Some(max) = get(ENV_MAX_UPLOAD_BYTES) {
            self.max_upload_bytes = parse_env(ENV_MAX_UPLOAD_BYTES, &max)?;
        }
        if let Some(secs) = get(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_env(ENV_REQUEST_TIMEOUT_SECS, &secs)?;
        }
        Ok(())
    }

    pub fn chain_path(&self) -> PathBuf {
        self.chain_file
            .clone()
            .unwrap_or_else(|| self.storage_dir.join(DEFAULT_CHAIN_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            storage_dir: self.storage_dir.clone(),
            chain_file: self.chain_path(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

fn parse_env<T>(key: &str, value: &str) -> ServerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.storage_dir, PathBuf::from("/data"));
        assert_eq!(c.chain_path(), PathBuf::from("/data/chain.json"));
        assert_eq!(c.max_upload_bytes, 1 << 30);
        assert_eq!(c.request_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml(
            r#"
            storage_dir = "/srv/ingest"
            max_upload_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(c.storage_dir, PathBuf::from("/srv/ingest"));
        assert_eq!(c.max_upload_bytes, 4096);
        assert_eq!(c.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(c.chain_path(), PathBuf::from("/srv/ingest/chain.json"));
    }

    #[test]
    fn unknown_toml_value_type_is_config_error() {
        let err = ServerConfig::from_toml("max_upload_bytes = \"lots\"").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fchain.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:9000\"\n").unwrap();

        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert!(ServerConfig::load(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut c = ServerConfig::from_toml("storage_dir = \"/from/file\"").unwrap();
        c.apply_env_from(env(&[
            (ENV_STORAGE_DIR, "/from/env"),
            (ENV_CHAIN_FILE, "/ledger/chain.json"),
            (ENV_BIND_ADDR, "127.0.0.1:7070"),
            (ENV_MAX_UPLOAD_BYTES, "1024"),
            (ENV_REQUEST_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();

        assert_eq!(c.storage_dir, PathBuf::from("/from/env"));
        assert_eq!(c.chain_path(), PathBuf::from("/ledger/chain.json"));
        assert_eq!(c.bind_addr.port(), 7070);
        assert_eq!(c.max_upload_bytes, 1024);
        assert_eq!(c.request_timeout_secs, 5);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut c = ServerConfig::default();
        c.apply_env_from(env(&[(ENV_STORAGE_DIR, ""), (ENV_MAX_UPLOAD_BYTES, "  ")]))
            .unwrap();
        assert_eq!(c, ServerConfig::default());
    }

    #[test]
    fn malformed_env_value_names_the_key() {
        let mut c = ServerConfig::default();
        let err = c
            .apply_env_from(env(&[(ENV_MAX_UPLOAD_BYTES, "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_UPLOAD_BYTES));
    }

    #[test]
    fn ingest_config_follows_server_config() {
        let c = ServerConfig {
            storage_dir: "/srv".into(),
            max_upload_bytes: 10,
            ..ServerConfig::default()
        };
        let ingest = c.ingest_config();
        assert_eq!(ingest.storage_dir, PathBuf::from("/srv"));
        assert_eq!(ingest.chain_file, PathBuf::from("/srv/chain.json"));
        assert_eq!(ingest.max_upload_bytes, 10);
    }
}
