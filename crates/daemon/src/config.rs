//! Daemon configuration: bind address from the environment, per-run
//! scheduling knobs from `RunConfig`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

const DEFAULT_BIND: &str = "127.0.0.1:8872";

/// Reads `OPTIMUSCTL_BIND`, defaulting to [`DEFAULT_BIND`].
pub fn bind_addr() -> anyhow::Result<SocketAddr> {
    let raw = std::env::var("OPTIMUSCTL_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    Ok(raw.parse()?)
}

fn default_chunk_size() -> usize {
    2000
}

fn default_mem_size() -> usize {
    optimus_core::MEMORY_SIZE
}

fn default_max_chunks_idle() -> usize {
    64
}

/// Per-run scheduling knobs. Not part of `optimus-core`'s contract — the
/// daemon's `ProcessDriver` loop reads these to decide chunk sizes and
/// when to give up on a process that never yields output or termination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_mem_size")]
    pub mem_size: usize,
    #[serde(default = "default_max_chunks_idle")]
    pub max_chunks_idle: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            mem_size: default_mem_size(),
            max_chunks_idle: default_max_chunks_idle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_defaults_match_spec() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.chunk_size, 2000);
        assert_eq!(cfg.mem_size, 65536);
    }

    #[test]
    fn run_config_deserializes_with_partial_fields() {
        let cfg: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.chunk_size, 2000);
        assert_eq!(cfg.max_chunks_idle, 64);
    }
}
