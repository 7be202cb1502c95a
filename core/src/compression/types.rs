//! compression/types.rs
//! Codec identifiers, the codec traits, and codec errors.
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::constants::{GZIP_MAGIC, ZSTD_MAGIC};

/// Supported compression codecs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    #[default]
    Gzip,
    Zstd,
}

impl CompressionCodec {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionCodec::Gzip => "gzip",
            CompressionCodec::Zstd => "zstd",
        }
    }

    /// File extension conventionally used for this codec's output.
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionCodec::Gzip => crate::constants::GZIP_EXTENSION,
            CompressionCodec::Zstd => crate::constants::ZSTD_EXTENSION,
        }
    }

    /// Identify a codec from the first bytes of a compressed stream.
    pub fn from_magic(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(&GZIP_MAGIC) {
            Some(CompressionCodec::Gzip)
        } else if prefix.starts_with(&ZSTD_MAGIC) {
            Some(CompressionCodec::Zstd)
        } else {
            None
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionCodec {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(CompressionCodec::Gzip),
            "zstd" | "zst" => Ok(CompressionCodec::Zstd),
            other => Err(CompressionError::UnsupportedCodec { name: other.to_string() }),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("unsupported compression codec: {name}")]
    UnsupportedCodec { name: String },

    #[error("invalid level {level} for codec {codec}")]
    InvalidLevel { codec: &'static str, level: i32 },

    #[error("codec {codec} init failed: {msg}")]
    CodecInitFailed { codec: &'static str, msg: String },

    #[error("codec {codec} process failed: {msg}")]
    CodecProcessFailed { codec: &'static str, msg: String },

    #[error("unrecognized compressed stream (no gzip or zstd magic)")]
    UnknownFormat,

    #[error("compression state error: {0}")]
    StateError(String),
}

impl From<std::io::Error> for CompressionError {
    fn from(e: std::io::Error) -> Self {
        CompressionError::StateError(e.to_string())
    }
}

// Require Send so boxed compressors can move into worker threads.
pub trait Compressor: Send {
    /// Compress one segment into a self-contained unit appended to `out`.
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;

    fn codec_name(&self) -> &'static str;
}

pub trait Decompressor: Send {
    /// Decode every unit readable from `input`, writing the concatenation to `out`.
    /// Returns the number of decompressed bytes.
    fn decompress_all(&mut self, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<u64, CompressionError>;
}
