use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub metrics_port: Option<u16>,
    /// WAL appends between background compactions.
    pub compact_threshold: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("BOOKD_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()?;

        let data_dir = PathBuf::from(
            std::env::var("BOOKD_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
        );

        let metrics_port = std::env::var("BOOKD_METRICS_PORT")
            .ok()
            .and_then(|s| s.parse().ok());

        let compact_threshold = std::env::var("BOOKD_COMPACT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        Ok(Self {
            listen_addr,
            data_dir,
            metrics_port,
            compact_threshold,
        })
    }
}
