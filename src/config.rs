//! Configuration for cathedra
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

/// Cathedra - topic assignment service for academic course streams
///
/// "Ex cathedra" - from the chair
#[derive(Parser, Debug, Clone)]
#[command(name = "cathedra")]
#[command(about = "Topic assignment service for academic course streams")]
pub struct Args {
    /// Unique node identifier for this service instance
    #[arg(long, env = "CATHEDRA_NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "CATHEDRA_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Path to the registry snapshot file. When set, the registry loads it
    /// at startup and rewrites it after each committed mutation. When unset,
    /// the registry is memory-only.
    #[arg(long, env = "CATHEDRA_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// Enable development mode (seeds a demo specialty and stream at startup)
    #[arg(long, env = "CATHEDRA_DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CATHEDRA_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "CATHEDRA_MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_body_bytes == 0 {
            return Err("CATHEDRA_MAX_BODY_BYTES must be greater than zero".to_string());
        }

        if let Some(ref path) = self.data_path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.is_dir() {
                    return Err(format!(
                        "CATHEDRA_DATA_PATH parent directory does not exist: {}",
                        parent.display()
                    ));
                }
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(format!("Invalid CATHEDRA_LOG_LEVEL: {}", other)),
        }
    }
}
