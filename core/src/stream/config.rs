use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compression::{CompressionCodec, resolve_level};
use crate::constants::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::stream::parallelism::{ParallelismProfile, default_inflight};
use crate::types::StreamError;

/// Explicit configuration for one compression run.
///
/// Every field has a default, so a JSON config file only needs to name the
/// fields it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bytes per segment.
    pub chunk_size: usize,
    /// Number of compression workers.
    pub parallelism: usize,
    /// Allocated-but-unflushed segment bound.
    pub inflight_segments: usize,
    pub codec: CompressionCodec,
    /// `None` selects the codec default.
    pub level: Option<i32>,
    /// Writer fails with `Stalled` when no unit arrives within this window.
    pub stall_timeout_ms: Option<u64>,
    /// Keep a partially written destination file after a failure.
    pub keep_partial_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let profile = ParallelismProfile::from_host();
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: profile.workers,
            inflight_segments: profile.inflight_segments,
            codec: CompressionCodec::default(),
            level: None,
            stall_timeout_ms: None,
            keep_partial_output: false,
        }
    }
}

impl PipelineConfig {
    /// Same defaults, with the parallelism fields taken from `profile`.
    pub fn with_profile(profile: ParallelismProfile) -> Self {
        Self {
            parallelism: profile.workers,
            inflight_segments: profile.inflight_segments,
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Sets the worker count and resizes the window to match.
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self.inflight_segments = default_inflight(workers.max(1));
        self
    }

    pub fn with_codec(mut self, codec: CompressionCodec, level: Option<i32>) -> Self {
        self.codec = codec;
        self.level = level;
        self
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout_ms.map(Duration::from_millis)
    }

    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, StreamError> {
        let raw = fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)
            .map_err(|e| StreamError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(StreamError::Config(format!(
                "chunk_size {} out of range [{MIN_CHUNK_SIZE}, {MAX_CHUNK_SIZE}]",
                self.chunk_size
            )));
        }
        if self.parallelism == 0 {
            return Err(StreamError::Config("parallelism must be at least 1".into()));
        }
        if self.inflight_segments == 0 {
            return Err(StreamError::Config("inflight_segments must be at least 1".into()));
        }
        if self.stall_timeout_ms == Some(0) {
            return Err(StreamError::Config("stall_timeout_ms must be positive".into()));
        }
        resolve_level(self.codec, self.level)?;
        Ok(())
    }
}
