//! Adapter tuning knobs

use serde::{Deserialize, Serialize};

/// Fan-out and streaming limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterConfig {
    /// Maximum concurrent store operations per call (default: 16)
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Rows or chunks per stream page (default: 1024)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pages buffered between cursor and caller (default: 4)
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

fn default_max_in_flight() -> usize {
    16
}

fn default_page_size() -> usize {
    1024
}

fn default_stream_buffer() -> usize {
    4
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            page_size: default_page_size(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl AdapterConfig {
    /// One store operation at a time
    pub fn sequential() -> Self {
        Self {
            max_in_flight: 1,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_in_flight == 0 {
            return Err("adapter.max_in_flight must be > 0".to_string());
        }
        if self.page_size == 0 {
            return Err("adapter.page_size must be > 0".to_string());
        }
        if self.stream_buffer == 0 {
            return Err("adapter.stream_buffer must be > 0".to_string());
        }
        Ok(())
    }

    /// Cursor batch size hint, clamped to what the store accepts
    pub(crate) fn batch_size(&self) -> u32 {
        u32::try_from(self.page_size).unwrap_or(u32::MAX)
    }
}
