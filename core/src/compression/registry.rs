//! compression/registry.rs
//! Codec registry and factory functions.
use std::sync::Arc;

use crate::compression::codecs::{gzip, zstd};
use crate::compression::constants::*;
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

pub struct CodecInfo {
    pub name: &'static str,
    pub default_level: i32,
    pub levels: std::ops::RangeInclusive<i32>,
}

/// Builds one compressor per worker. Workers never share codec state.
pub type CompressorFactory =
    Arc<dyn Fn() -> Result<Box<dyn Compressor>, CompressionError> + Send + Sync>;

pub fn resolve(codec: CompressionCodec) -> CodecInfo {
    match codec {
        CompressionCodec::Gzip => CodecInfo {
            name: "gzip",
            default_level: DEFAULT_LEVEL_GZIP,
            levels: GZIP_LEVELS,
        },
        CompressionCodec::Zstd => CodecInfo {
            name: "zstd",
            default_level: DEFAULT_LEVEL_ZSTD,
            levels: ZSTD_LEVELS,
        },
    }
}

/// Resolve an optional level against the codec's default and accepted range.
pub fn resolve_level(codec: CompressionCodec, level: Option<i32>) -> Result<i32, CompressionError> {
    let info = resolve(codec);
    let level = level.unwrap_or(info.default_level);
    if !info.levels.contains(&level) {
        return Err(CompressionError::InvalidLevel { codec: info.name, level });
    }
    Ok(level)
}

pub fn create_compressor(codec: CompressionCodec, level: Option<i32>)
    -> Result<Box<dyn Compressor>, CompressionError>
{
    let level = resolve_level(codec, level)?;
    match codec {
        CompressionCodec::Gzip => gzip::GzipCompressor::new(level),
        CompressionCodec::Zstd => zstd::ZstdCompressor::new(level),
    }
}

pub fn create_decompressor(codec: CompressionCodec) -> Result<Box<dyn Decompressor>, CompressionError> {
    match codec {
        CompressionCodec::Gzip => gzip::GzipDecompressor::new(),
        CompressionCodec::Zstd => zstd::ZstdDecompressor::new(),
    }
}

/// Factory for the built-in codecs; the level is validated once, up front.
pub fn compressor_factory(codec: CompressionCodec, level: Option<i32>)
    -> Result<CompressorFactory, CompressionError>
{
    let level = resolve_level(codec, level)?;
    Ok(Arc::new(move || create_compressor(codec, Some(level))))
}
