//! Codec Configuration
//!
//! Decode limits and codec behavior switches, loadable from a JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CodecError, CodecResult};
use crate::observability::{log_event_with_fields, Event};

/// Codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Upper bound on decoded array, map and side-table counts (default: 16M)
    #[serde(default = "default_max_collection_len")]
    pub max_collection_len: usize,

    /// Upper bound on decoded string and bytes lengths (default: 64 MiB)
    #[serde(default = "default_max_bytes_len")]
    pub max_bytes_len: usize,

    /// Deepest record nesting below the top-level record (default: 64)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Create decode targets by copying a cached prototype (default: true)
    #[serde(default = "default_true")]
    pub cache_prototypes: bool,

    /// Verify frame checksums when opening framed payloads (default: true)
    #[serde(default = "default_true")]
    pub verify_frames: bool,
}

fn default_max_collection_len() -> usize {
    1 << 24
}

fn default_max_bytes_len() -> usize {
    64 * 1024 * 1024
}

fn default_max_depth() -> usize {
    64
}

fn default_true() -> bool {
    true
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_collection_len: default_max_collection_len(),
            max_bytes_len: default_max_bytes_len(),
            max_depth: default_max_depth(),
            cache_prototypes: true,
            verify_frames: true,
        }
    }
}

impl CodecConfig {
    /// Loads and validates a configuration file
    pub fn load(path: &Path) -> CodecResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CodecError::io(format!("cannot read config {}", path.display()), e))?;
        let config: CodecConfig = serde_json::from_str(&content)
            .map_err(|e| CodecError::invalid_config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("path", &path.display().to_string()),
                ("max_collection_len", &config.max_collection_len.to_string()),
                ("max_bytes_len", &config.max_bytes_len.to_string()),
                ("max_depth", &config.max_depth.to_string()),
            ],
        );
        Ok(config)
    }

    /// Rejects limits that would make every non-trivial payload undecodable
    pub fn validate(&self) -> CodecResult<()> {
        if self.max_collection_len == 0 {
            return Err(CodecError::invalid_config("max_collection_len must be positive"));
        }
        if self.max_bytes_len == 0 {
            return Err(CodecError::invalid_config("max_bytes_len must be positive"));
        }
        if self.max_bytes_len > u32::MAX as usize {
            return Err(CodecError::invalid_config("max_bytes_len must fit in 32 bits"));
        }
        if self.max_depth == 0 {
            return Err(CodecError::invalid_config("max_depth must be positive"));
        }
        Ok(())
    }
}
